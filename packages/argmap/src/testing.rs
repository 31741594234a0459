//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the reconstruction pipeline without
//! calling a real language model or classifier. Both mocks are fully
//! deterministic: unmatched requests get scores derived from a hash of the
//! request text.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

use crate::error::{BackendError, Result};
use crate::traits::{
    classifier::{Classification, ClassificationRequest, Classifier},
    model::{normalize_label_probs, GenerationRequest, LanguageModel, Message},
};

/// Deterministic value in `[0, 1)` for a piece of text.
fn hash_unit(text: &str) -> f64 {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
}

struct ResponseRule {
    key: String,
    responses: Vec<String>,
    served: usize,
}

/// A mock language model for testing.
///
/// `generate` answers with the first rule whose key occurs in the last user
/// message; unmatched prompts get an empty completion. `label_probs` uses
/// configured votes or hash-derived probabilities.
#[derive(Default)]
pub struct MockModel {
    /// Canned completions by prompt substring
    rules: Arc<RwLock<Vec<ResponseRule>>>,

    /// Canned votes by prompt substring
    votes: Arc<RwLock<Vec<(String, String)>>>,

    /// Number of upcoming calls that fail with a timeout
    failures: Arc<RwLock<usize>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone, PartialEq)]
pub enum MockModelCall {
    Generate { prompt: String, temperature: f32 },
    LabelProbs { prompt: String, labels: Vec<String> },
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `key` with `response`.
    pub fn with_response(self, key: impl Into<String>, response: impl Into<String>) -> Self {
        self.with_responses(key, vec![response.into()])
    }

    /// Answer successive prompts containing `key` with successive responses.
    ///
    /// The last response repeats once the list is exhausted.
    pub fn with_responses(self, key: impl Into<String>, responses: Vec<String>) -> Self {
        self.rules.write().unwrap().push(ResponseRule {
            key: key.into(),
            responses,
            served: 0,
        });
        self
    }

    /// Put all mass on `label` for label queries whose prompt contains `key`.
    pub fn with_vote(self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.votes.write().unwrap().push((key.into(), label.into()));
        self
    }

    /// Fail the next `n` calls with a transient timeout.
    pub fn with_failures(self, n: usize) -> Self {
        *self.failures.write().unwrap() = n;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of `generate` calls whose prompt contains `key`.
    pub fn generate_calls_containing(&self, key: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockModelCall::Generate { prompt, .. } if prompt.contains(key)))
            .count()
    }

    fn take_failure(&self) -> Result<()> {
        let mut failures = self.failures.write().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(BackendError::Timeout.into());
        }
        Ok(())
    }
}

fn last_user(messages: &[Message]) -> String {
    GenerationRequest::new(messages.to_vec())
        .last_user_message()
        .to_string()
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = request.last_user_message().to_string();
        self.calls.write().unwrap().push(MockModelCall::Generate {
            prompt: prompt.clone(),
            temperature: request.temperature,
        });
        self.take_failure()?;

        let mut rules = self.rules.write().unwrap();
        let response = rules
            .iter_mut()
            .find(|r| prompt.contains(&r.key))
            .and_then(|rule| {
                let idx = rule.served.min(rule.responses.len().saturating_sub(1));
                rule.served += 1;
                rule.responses.get(idx).cloned()
            });
        Ok(response.unwrap_or_default())
    }

    async fn label_probs(
        &self,
        messages: &[Message],
        labels: &[String],
    ) -> Result<IndexMap<String, f64>> {
        let prompt = last_user(messages);
        self.calls.write().unwrap().push(MockModelCall::LabelProbs {
            prompt: prompt.clone(),
            labels: labels.to_vec(),
        });
        self.take_failure()?;

        let vote = self
            .votes
            .read()
            .unwrap()
            .iter()
            .find(|(key, label)| prompt.contains(key.as_str()) && labels.contains(label))
            .map(|(_, label)| label.clone());

        let raw: IndexMap<String, f64> = labels
            .iter()
            .map(|l| {
                let p = match &vote {
                    Some(v) if v == l => 1.0,
                    Some(_) => 0.0,
                    None => hash_unit(&format!("{prompt}\u{0}{l}")),
                };
                (l.clone(), p)
            })
            .collect();
        Ok(normalize_label_probs(labels, &raw))
    }
}

/// A mock zero-shot classifier for testing.
///
/// Each `(premise, hypothesis)` pair gets the score of the first rule whose
/// substrings both match, else a hash-derived score below 0.3.
#[derive(Default)]
pub struct MockClassifier {
    /// `(premise substring, hypothesis substring, score)`
    rules: Arc<RwLock<Vec<(String, String, f64)>>>,

    /// Premise substrings that produce an invalid result
    invalid: Arc<RwLock<Vec<String>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<ClassificationRequest>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score hypotheses containing `hypothesis` for premises containing `premise`.
    pub fn with_score(
        self,
        premise: impl Into<String>,
        hypothesis: impl Into<String>,
        score: f64,
    ) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((premise.into(), hypothesis.into(), score));
        self
    }

    /// Return an invalid result for premises containing `premise`.
    pub fn with_invalid(self, premise: impl Into<String>) -> Self {
        self.invalid.write().unwrap().push(premise.into());
        self
    }

    /// Get all requests made to this mock.
    pub fn calls(&self) -> Vec<ClassificationRequest> {
        self.calls.read().unwrap().clone()
    }

    fn score(&self, premise: &str, hypothesis: &str) -> f64 {
        self.rules
            .read()
            .unwrap()
            .iter()
            .find(|(p, h, _)| premise.contains(p.as_str()) && hypothesis.contains(h.as_str()))
            .map(|(_, _, s)| *s)
            .unwrap_or_else(|| 0.3 * hash_unit(&format!("{premise}\u{0}{hypothesis}")))
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Vec<Option<Classification>>> {
        self.calls.write().unwrap().push(request.clone());
        let invalid = self.invalid.read().unwrap().clone();

        Ok(request
            .premises
            .iter()
            .map(|premise| {
                if invalid.iter().any(|p| premise.contains(p.as_str())) {
                    return None;
                }
                let scores = request
                    .candidate_labels
                    .iter()
                    .map(|label| self.score(premise, &request.hypothesis(label)))
                    .collect();
                Some(Classification::new(scores))
            })
            .collect())
    }
}
