//! Configuration types for scoring runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for one scoring invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Artifacts to include in the result (e.g. `"proscons"`, `"svg_argmap"`).
    pub artifacts: Vec<String>,

    /// Metrics to compute (e.g. `"argmap_size"`).
    pub metrics: Vec<String>,

    /// Settings for the LLM-driven reconstruction stages.
    pub reconstruction: ReconstructionConfig,

    /// Settings for the relation engine.
    pub relations: RelationConfig,

    /// Settings for the argument-map builder.
    pub argmap: ArgmapConfig,

    /// Retry policy for backend calls.
    pub retry: RetryPolicy,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            artifacts: vec!["proscons".to_string(), "fuzzy_argmap".to_string()],
            metrics: vec![
                "argmap_size".to_string(),
                "n_root_nodes".to_string(),
                "argmap_avg_katz_centrality".to_string(),
                "argmap_attack_ratio".to_string(),
            ],
            reconstruction: ReconstructionConfig::default(),
            relations: RelationConfig::default(),
            argmap: ArgmapConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScoreConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the requested artifacts.
    pub fn with_artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifacts = artifacts.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the requested metrics.
    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reconstruction(mut self, reconstruction: ReconstructionConfig) -> Self {
        self.reconstruction = reconstruction;
        self
    }

    pub fn with_relations(mut self, relations: RelationConfig) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_argmap(mut self, argmap: ArgmapConfig) -> Self {
        self.argmap = argmap;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// All requested keys, artifacts first.
    pub fn requested(&self) -> impl Iterator<Item = &str> {
        self.artifacts
            .iter()
            .chain(self.metrics.iter())
            .map(String::as_str)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.reconstruction;
        let positive = [
            ("n_drafts", r.n_drafts),
            ("max_reasons", r.max_reasons),
            ("max_roots", r.max_roots),
            ("max_len_issue", r.max_len_issue),
            ("max_len_title", r.max_len_title),
            ("max_len_gist", r.max_len_gist),
            ("max_claims_per_choice", self.relations.max_claims_per_choice),
            ("batch_size", self.relations.batch_size),
            ("max_concurrency", self.relations.max_concurrency),
            ("max_attempts", self.retry.max_attempts as usize),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be > 0")));
        }
        if let Some(t) = self.argmap.edge_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "edge_threshold must be within [0, 1], got {t}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&r.faithfulness_threshold) {
            return Err(ConfigError::Invalid(
                "faithfulness_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for issue drafting, reason mining and pros/cons organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Number of issue drafts to sample. Default: 3.
    pub n_drafts: usize,

    /// Sampling temperature for issue drafts. Default: 0.5.
    pub draft_temperature: f32,

    /// Maximum characters of the issue statement. Default: 80.
    pub max_len_issue: usize,

    /// Maximum mined reasons kept from one trace. Default: 50.
    pub max_reasons: usize,

    /// Maximum root claims in a pros/cons list. Default: 10.
    pub max_roots: usize,

    /// Maximum characters of a claim label. Default: 32.
    pub max_len_title: usize,

    /// Maximum characters of a reason's gist. Default: 180.
    pub max_len_gist: usize,

    /// Maximum characters of a root claim. Default: 128.
    pub max_len_root_claim: usize,

    /// Revision attempts while reasons remain unused. Default: 2.
    pub max_revisions: usize,

    /// Decompose compound reasons into atomic claims. Default: true.
    pub unpack_reasons: bool,

    /// Re-target reasons between roots using the classifier. Default: true.
    pub revise_logic: bool,

    /// Word-overlap below which a claim is flagged as possibly unfaithful.
    ///
    /// Flagged claims are reported, never removed. Default: 0.3.
    pub faithfulness_threshold: f64,

    /// Token limit for generation calls. Default: 2048.
    pub max_tokens: u32,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            n_drafts: 3,
            draft_temperature: 0.5,
            max_len_issue: 80,
            max_reasons: 50,
            max_roots: 10,
            max_len_title: 32,
            max_len_gist: 180,
            max_len_root_claim: 128,
            max_revisions: 2,
            unpack_reasons: true,
            revise_logic: true,
            faithfulness_threshold: 0.3,
            max_tokens: 2048,
        }
    }
}

impl ReconstructionConfig {
    pub fn with_unpack_reasons(mut self, unpack: bool) -> Self {
        self.unpack_reasons = unpack;
        self
    }

    pub fn with_revise_logic(mut self, revise: bool) -> Self {
        self.revise_logic = revise;
        self
    }

    pub fn with_max_revisions(mut self, n: usize) -> Self {
        self.max_revisions = n;
        self
    }

    pub fn with_n_drafts(mut self, n: usize) -> Self {
        self.n_drafts = n;
        self
    }
}

/// Settings for classifier-backed relation queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Drop the neutral label and renormalize over support/attack.
    pub two_way: bool,

    /// Fix reason-to-reason valences from the pros/cons structure.
    pub keep_pros_cons_valences: bool,

    /// Maximum source reasons related to each target reason. Default: 20.
    pub max_relations_per_target: usize,

    /// Maximum candidate claims in one multiple-choice query. Default: 10.
    pub max_claims_per_choice: usize,

    /// Premises per classifier request. Default: 64.
    pub batch_size: usize,

    /// Concurrent classifier requests. Default: 4.
    pub max_concurrency: usize,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            two_way: false,
            keep_pros_cons_valences: true,
            max_relations_per_target: 20,
            max_claims_per_choice: 10,
            batch_size: 64,
            max_concurrency: 4,
        }
    }
}

impl RelationConfig {
    pub fn with_two_way(mut self, two_way: bool) -> Self {
        self.two_way = two_way;
        self
    }

    pub fn with_keep_pros_cons_valences(mut self, keep: bool) -> Self {
        self.keep_pros_cons_valences = keep;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }
}

/// Settings for the argument-map builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgmapConfig {
    /// Retention threshold for edges outside the branching.
    ///
    /// `None` uses the median weight of the branching's edges of the
    /// same valence.
    pub edge_threshold: Option<f64>,

    /// Maximum outgoing edges per node after adding secondary edges. Default: 3.
    pub max_out_degree: usize,
}

impl Default for ArgmapConfig {
    fn default() -> Self {
        Self {
            edge_threshold: None,
            max_out_degree: 3,
        }
    }
}

impl ArgmapConfig {
    pub fn with_edge_threshold(mut self, threshold: f64) -> Self {
        self.edge_threshold = Some(threshold);
        self
    }

    pub fn with_max_out_degree(mut self, n: usize) -> Self {
        self.max_out_degree = n;
        self
    }
}

/// Bounded exponential backoff for transient backend failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first. Default: 3.
    pub max_attempts: u32,

    /// Delay before the first retry. Default: 500 ms.
    pub base_delay_ms: u64,

    /// Upper bound for a single delay. Default: 8 s.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps (for tests).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}
