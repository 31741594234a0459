//! Shared handles passed to every stage.

use indexmap::IndexMap;

use super::prompts::SYSTEM_PROMPT;
use crate::error::Result;
use crate::relations::RelationEngine;
use crate::retry::with_retry;
use crate::traits::classifier::Classifier;
use crate::traits::model::{GenerationRequest, LanguageModel, Message};
use crate::types::config::{ReconstructionConfig, ScoreConfig};

/// Backends and configuration of one scoring run.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub model: &'a dyn LanguageModel,
    pub classifier: &'a dyn Classifier,
    pub config: &'a ScoreConfig,
}

impl<'a> StageContext<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        classifier: &'a dyn Classifier,
        config: &'a ScoreConfig,
    ) -> Self {
        Self {
            model,
            classifier,
            config,
        }
    }

    pub fn reconstruction(&self) -> &'a ReconstructionConfig {
        &self.config.reconstruction
    }

    /// System prompt followed by one user message.
    pub fn chat(prompt: impl Into<String>) -> Vec<Message> {
        vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]
    }

    /// Greedy request for a single user prompt, with the configured token limit.
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(Self::chat(prompt))
            .with_max_tokens(self.reconstruction().max_tokens)
    }

    /// Generate with the configured retry policy.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        with_retry(&self.config.retry, "generate", || self.model.generate(request)).await
    }

    /// Label probabilities with the configured retry policy.
    pub async fn label_probs(
        &self,
        messages: &[Message],
        labels: &[String],
    ) -> Result<IndexMap<String, f64>> {
        with_retry(&self.config.retry, "label_probs", || {
            self.model.label_probs(messages, labels)
        })
        .await
    }

    pub fn relations(&self) -> RelationEngine<'a> {
        RelationEngine::new(self.classifier, &self.config.relations, &self.config.retry)
    }
}

/// Output of a stage, with the non-fatal problems met while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Built<T> {
    pub value: T,
    pub warnings: Vec<String>,
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl<T> Built<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warn(message);
        self
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Built<U> {
        Built {
            value: f(self.value),
            warnings: self.warnings,
            metadata: self.metadata,
        }
    }
}
