//! Zero-shot NLI classifier trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A batch of premises scored against one set of verbalized hypotheses.
///
/// Each hypothesis is `hypothesis_template` with `{}` replaced by a
/// candidate label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub premises: Vec<String>,
    pub hypothesis_template: String,
    pub candidate_labels: Vec<String>,
}

impl ClassificationRequest {
    pub fn new(
        premises: Vec<String>,
        hypothesis_template: impl Into<String>,
        candidate_labels: Vec<String>,
    ) -> Self {
        Self {
            premises,
            hypothesis_template: hypothesis_template.into(),
            candidate_labels,
        }
    }

    /// Hypothesis for one candidate label.
    pub fn hypothesis(&self, label: &str) -> String {
        self.hypothesis_template.replacen("{}", label, 1)
    }
}

/// Scores for one premise, aligned with the request's candidate labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub scores: Vec<f64>,
}

impl Classification {
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }

    /// Reorder `(label, score)` pairs (as returned by ranking endpoints)
    /// into the order of `candidate_labels`. Returns `None` if a label is
    /// missing.
    pub fn from_ranked(candidate_labels: &[String], labels: &[String], scores: &[f64]) -> Option<Self> {
        if labels.len() != scores.len() {
            return None;
        }
        candidate_labels
            .iter()
            .map(|c| labels.iter().position(|l| l == c).map(|i| scores[i]))
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    pub fn is_valid_for(&self, request: &ClassificationRequest) -> bool {
        self.scores.len() == request.candidate_labels.len()
            && self.scores.iter().all(|s| s.is_finite())
    }
}

/// Backing classifier.
///
/// Returns one entry per premise, in premise order. `None` marks a premise
/// the backend could not score; callers substitute a neutral default.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Vec<Option<Classification>>>;
}
