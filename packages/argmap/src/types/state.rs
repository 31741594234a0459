//! Result envelope of one analysis run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::argmap::{ArgumentMap, RelevanceNetwork};
use super::claim::{Claim, ProsConsList};

/// Input id of the prompt text.
pub const PROMPT: &str = "prompt";

/// Input id of the completion text.
pub const COMPLETION: &str = "completion";

/// Payload of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArtifactData {
    Text(String),
    Claims(Vec<Claim>),
    ProsCons(ProsConsList),
    RelevanceNetwork(RelevanceNetwork),
    ArgumentMap(ArgumentMap),
}

/// A named pipeline intermediate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub description: String,
    pub data: ArtifactData,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl Artifact {
    pub fn new(id: impl Into<String>, description: impl Into<String>, data: ArtifactData) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            data,
            metadata: IndexMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A named numeric metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: String,
    pub description: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Score {
    pub fn new(id: impl Into<String>, description: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            value,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A degraded or failed product, reported alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub product: String,
    pub message: String,
}

/// Inputs, artifacts, scores and warnings of one scoring invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugState {
    pub inputs: Vec<Artifact>,
    pub artifacts: Vec<Artifact>,
    pub scores: Vec<Score>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl DebugState {
    pub fn new(prompt: impl Into<String>, completion: impl Into<String>) -> Self {
        Self {
            inputs: vec![
                Artifact::new(PROMPT, "Prompt text", ArtifactData::Text(prompt.into())),
                Artifact::new(
                    COMPLETION,
                    "Completion text",
                    ArtifactData::Text(completion.into()),
                ),
            ],
            ..Default::default()
        }
    }

    fn input_text(&self, id: &str) -> &str {
        self.inputs
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| match &a.data {
                ArtifactData::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }

    pub fn prompt(&self) -> &str {
        self.input_text(PROMPT)
    }

    pub fn completion(&self) -> &str {
        self.input_text(COMPLETION)
    }

    pub fn artifact(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    pub fn score(&self, id: &str) -> Option<&Score> {
        self.scores.iter().find(|s| s.id == id)
    }

    /// Whether an artifact or score named `id` has been produced.
    pub fn has_product(&self, id: &str) -> bool {
        self.artifact(id).is_some() || self.score(id).is_some()
    }

    pub fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    pub fn push_score(&mut self, score: Score) {
        self.scores.push(score);
    }

    pub fn warn(&mut self, product: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning {
            product: product.into(),
            message: message.into(),
        });
    }

    pub fn warnings_for<'a>(&'a self, product: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings.iter().filter(move |w| w.product == product)
    }

    // =========================================================================
    // Typed artifact access
    // =========================================================================

    pub fn text(&self, id: &str) -> Option<&str> {
        match &self.artifact(id)?.data {
            ArtifactData::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn claims(&self, id: &str) -> Option<&[Claim]> {
        match &self.artifact(id)?.data {
            ArtifactData::Claims(c) => Some(c),
            _ => None,
        }
    }

    pub fn proscons(&self, id: &str) -> Option<&ProsConsList> {
        match &self.artifact(id)?.data {
            ArtifactData::ProsCons(p) => Some(p),
            _ => None,
        }
    }

    pub fn relevance_network(&self, id: &str) -> Option<&RelevanceNetwork> {
        match &self.artifact(id)?.data {
            ArtifactData::RelevanceNetwork(n) => Some(n),
            _ => None,
        }
    }

    pub fn argument_map(&self, id: &str) -> Option<&ArgumentMap> {
        match &self.artifact(id)?.data {
            ArtifactData::ArgumentMap(m) => Some(m),
            _ => None,
        }
    }
}
