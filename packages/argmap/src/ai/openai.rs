//! OpenAI-compatible implementation of the `LanguageModel` trait.
//!
//! Works against the hosted OpenAI API as well as local inference servers
//! exposing `/chat/completions`. Regex and grammar constraints are sent as
//! the `guided_regex` / `guided_grammar` extension fields those servers
//! understand; JSON schemas use the standard `response_format`.
//!
//! # Example
//!
//! ```rust,ignore
//! use argmap::ai::OpenAiModel;
//!
//! let model = OpenAiModel::from_env()?.with_model("gpt-4o-mini");
//! let state = argmap::score(&model, &classifier, prompt, completion, &config).await?;
//! ```

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::traits::model::{normalize_label_probs, Constraint, GenerationRequest, LanguageModel, Message};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Number of alternatives requested per token when scoring labels.
const TOP_LOGPROBS: u8 = 20;

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiModel {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiModel {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: SecretString::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from `OPENAI_API_KEY`, with optional `ARGMAP_MODEL` and
    /// `ARGMAP_BASE_URL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| BackendError::NotConfigured("OPENAI_API_KEY not set".into()))?;
        let mut model = Self::new(api_key);
        if let Ok(name) = std::env::var("ARGMAP_MODEL") {
            model = model.with_model(name);
        }
        if let Ok(url) = std::env::var("ARGMAP_BASE_URL") {
            model = model.with_base_url(url);
        }
        Ok(model)
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (local inference server, proxy, ...).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, body: &ChatRequest<'_>) -> Result<ChatChoice> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(BackendError::from)?;

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

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        chat.choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("no choices in response".into()).into())
    }
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guided_regex: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guided_grammar: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logprobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_logprobs: Option<u8>,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages,
            temperature: 0.0,
            max_tokens: None,
            stop: &[],
            response_format: None,
            guided_regex: None,
            guided_grammar: None,
            logprobs: None,
            top_logprobs: None,
        }
    }

    fn from_generation(model: &'a str, request: &'a GenerationRequest) -> Self {
        let mut body = Self::new(model, &request.messages);
        body.temperature = request.temperature;
        body.max_tokens = request.max_tokens;
        body.stop = request.stop.as_slice();
        match &request.constraint {
            Some(Constraint::Regex(regex)) => body.guided_regex = Some(regex.as_str()),
            Some(Constraint::Grammar(grammar)) => body.guided_grammar = Some(grammar.as_str()),
            Some(Constraint::JsonSchema(schema)) => {
                body.response_format = Some(ResponseFormat {
                    format_type: "json_schema",
                    json_schema: JsonSchemaFormat {
                        name: "response",
                        strict: true,
                        schema: schema.clone(),
                    },
                })
            }
            None => {}
        }
        body
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    logprobs: Option<ChoiceLogprobs>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceLogprobs {
    #[serde(default)]
    content: Option<Vec<TokenLogprob>>,
}

#[derive(Deserialize)]
struct TokenLogprob {
    #[serde(default)]
    top_logprobs: Vec<TopLogprob>,
}

#[derive(Deserialize)]
struct TopLogprob {
    token: String,
    logprob: f64,
}

/// Probability mass per label from the first token's top alternatives.
fn label_mass(labels: &[String], top: &[TopLogprob]) -> IndexMap<String, f64> {
    labels
        .iter()
        .map(|label| {
            let mass = top
                .iter()
                .filter(|t| t.token.trim() == label)
                .map(|t| t.logprob.exp())
                .sum();
            (label.clone(), mass)
        })
        .collect()
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest::from_generation(&self.model, request);
        let choice = self.complete(&body).await?;
        let content = choice.message.content.unwrap_or_default();
        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }

    async fn label_probs(
        &self,
        messages: &[Message],
        labels: &[String],
    ) -> Result<IndexMap<String, f64>> {
        let mut body = ChatRequest::new(&self.model, messages);
        body.max_tokens = Some(1);
        body.logprobs = Some(true);
        body.top_logprobs = Some(TOP_LOGPROBS);

        let choice = self.complete(&body).await?;
        let top = choice
            .logprobs
            .and_then(|l| l.content)
            .and_then(|tokens| tokens.into_iter().next())
            .map(|t| t.top_logprobs)
            .ok_or_else(|| BackendError::InvalidResponse("no logprobs in response".into()))?;
        Ok(normalize_label_probs(labels, &label_mass(labels, &top)))
    }
}
