//! Zero-shot NLI classifier behind a Hugging Face inference endpoint.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{BackendError, Result};
use crate::traits::classifier::{Classification, ClassificationRequest, Classifier};

const DEFAULT_URL: &str =
    "https://api-inference.huggingface.co/models/MoritzLaurer/DeBERTa-v3-large-mnli-fever-anli-ling-wanli";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the zero-shot classification task of an inference endpoint.
pub struct HfClassifier {
    client: Client,
    token: Option<SecretString>,
    url: String,
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a [String],
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    hypothesis_template: &'a str,
    multi_label: bool,
}

/// One scored premise; labels are ranked by score.
#[derive(Debug, Deserialize)]
struct ZeroShotOutput {
    labels: Vec<String>,
    scores: Vec<f64>,
}

impl HfClassifier {
    /// Create a client for the default public endpoint.
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token: token.map(SecretString::from),
            url: DEFAULT_URL.to_string(),
        }
    }

    /// Create from `HF_TOKEN` (optional) and `ARGMAP_CLASSIFIER_URL` (optional).
    pub fn from_env() -> Result<Self> {
        let classifier = Self::new(std::env::var("HF_TOKEN").ok());
        match std::env::var("ARGMAP_CLASSIFIER_URL") {
            Ok(url) => classifier.with_url(&url),
            Err(_) => Ok(classifier),
        }
    }

    /// Use a different endpoint (dedicated inference endpoint, local server).
    pub fn with_url(mut self, url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| BackendError::NotConfigured(format!("invalid classifier URL {url}: {e}")))?;
        self.url = parsed.to_string();
        Ok(self)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Align raw endpoint items with the request; items that do not parse or
/// lack a candidate label become `None`.
fn align(request: &ClassificationRequest, items: Vec<serde_json::Value>) -> Vec<Option<Classification>> {
    items
        .into_iter()
        .map(|item| {
            let output: ZeroShotOutput = serde_json::from_value(item)
                .map_err(|e| warn!(error = %e, "unparseable classification item"))
                .ok()?;
            Classification::from_ranked(&request.candidate_labels, &output.labels, &output.scores)
        })
        .collect()
}

#[async_trait]
impl Classifier for HfClassifier {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Vec<Option<Classification>>> {
        if request.premises.is_empty() {
            return Ok(Vec::new());
        }
        let body = ZeroShotRequest {
            inputs: &request.premises,
            parameters: ZeroShotParameters {
                candidate_labels: &request.candidate_labels,
                hypothesis_template: &request.hypothesis_template,
                multi_label: false,
            },
        };

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        let response = builder.send().await.map_err(BackendError::from)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited.into());
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let items: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        if items.len() != request.premises.len() {
            return Err(BackendError::InvalidResponse(format!(
                "expected {} classifications, got {}",
                request.premises.len(),
                items.len()
            ))
            .into());
        }
        debug!(premises = items.len(), "classified batch");
        Ok(align(request, items))
    }
}
