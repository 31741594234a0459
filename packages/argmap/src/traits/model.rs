//! Generative model trait.
//!
//! The reconstruction stages need two capabilities from a backing LLM:
//! - Completion of a chat prompt, optionally constrained by a regex, a
//!   grammar or a JSON schema
//! - Probabilities of a fixed set of single-token answer labels (used for
//!   voting among alternatives)

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Output constraint for guided generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    Regex(String),
    Grammar(String),
    JsonSchema(serde_json::Value),
}

/// A generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stop: Vec<String>,
    pub constraint: Option<Constraint>,
}

impl GenerationRequest {
    /// Greedy request (temperature 0) for the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: 0.0,
            max_tokens: None,
            stop: Vec::new(),
            constraint: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Text of the last user message (used by mocks and logs).
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Backing generative model.
///
/// Implementations wrap specific providers (OpenAI-compatible servers,
/// local inference servers) and translate constraints into whatever the
/// provider supports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the chat prompt.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Probability of each label as the next answer token.
    ///
    /// The returned map has one entry per label, in label order, and sums
    /// to one.
    async fn label_probs(
        &self,
        messages: &[Message],
        labels: &[String],
    ) -> Result<IndexMap<String, f64>>;
}

/// Normalize raw label scores; uniform if there is no usable mass.
pub fn normalize_label_probs(labels: &[String], raw: &IndexMap<String, f64>) -> IndexMap<String, f64> {
    let total: f64 = labels
        .iter()
        .filter_map(|l| raw.get(l))
        .filter(|p| p.is_finite() && **p > 0.0)
        .sum();
    labels
        .iter()
        .map(|l| {
            let p = if total > 0.0 {
                raw.get(l)
                    .copied()
                    .filter(|p| p.is_finite() && *p > 0.0)
                    .unwrap_or(0.0)
                    / total
            } else {
                1.0 / labels.len() as f64
            };
            (l.clone(), p)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label_probs() {
        let labels: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let mut raw = IndexMap::new();
        raw.insert("B".to_string(), 0.3);
        raw.insert("A".to_string(), 0.1);
        raw.insert("Z".to_string(), 0.6);

        let probs = normalize_label_probs(&labels, &raw);
        assert_eq!(probs.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert!((probs["A"] - 0.25).abs() < 1e-12);
        assert!((probs["B"] - 0.75).abs() < 1e-12);
        assert_eq!(probs["C"], 0.0);

        let uniform = normalize_label_probs(&labels, &IndexMap::new());
        assert!((uniform["C"] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_last_user_message() {
        let request = GenerationRequest::new(vec![
            Message::system("sys"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ]);
        assert_eq!(request.last_user_message(), "second");
    }
}
