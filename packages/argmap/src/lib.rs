//! Argument-Map Reconstruction for LLM Reasoning Traces
//!
//! Reconstructs the argument behind a model's answer as a map of claims and
//! support/attack relations, and scores how rich and balanced that argument is.
//!
//! # Design Philosophy
//!
//! **"Models draft, the library decides"**
//!
//! - Every model step is bounded (few drafts, few revisions, fixed label sets)
//! - Relations come from probabilities, never from free text
//! - Graph construction is deterministic given the network
//! - Degraded products are reported as warnings, not hidden
//!
//! # Usage
//!
//! ```rust,ignore
//! use argmap::{score, ScoreConfig};
//! use argmap::ai::{HfClassifier, OpenAiModel};
//!
//! let model = OpenAiModel::from_env()?;
//! let classifier = HfClassifier::from_env()?;
//! let config = ScoreConfig::default();
//!
//! let state = score(&model, &classifier, prompt, completion, &config).await?;
//! for s in &state.scores {
//!     println!("{}: {:.3}", s.id, s.value);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Backend abstractions (LanguageModel, Classifier)
//! - [`types`] - Claims, relations, maps, configuration and results
//! - [`pipeline`] - Reconstruction stages, registry and director
//! - [`relations`] - Pairwise relation queries
//! - [`graph`] - Maximum branching, centrality and balance
//! - [`parse`] - Model output parsing
//! - [`details`] - `<details>` embedding of reasoning and maps in responses
//! - [`ai`] - OpenAI-compatible and Hugging Face backends
//! - [`testing`] - Mock backends for testing

pub mod ai;
pub mod details;
pub mod error;
pub mod graph;
pub mod parse;
pub mod pipeline;
pub mod relations;
pub mod retry;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ArgmapError, BackendError, ConfigError, Result};
pub use traits::{
    classifier::{Classification, ClassificationRequest, Classifier},
    model::{Constraint, GenerationRequest, LanguageModel, Message},
};
pub use types::{
    argmap::{ArgMapEdge, ArgMapNode, ArgumentMap, NodeRole, RelevanceNetwork},
    claim::{Claim, ProsConsList, RootClaim, Valence},
    config::{ArgmapConfig, ReconstructionConfig, RelationConfig, RetryPolicy, ScoreConfig},
    relation::{DialecticRelation, RelationLabel},
    state::{Artifact, ArtifactData, DebugState, Score, Warning},
};

// Re-export the entry points
pub use details::{embed, extract, protocol, Embedded};
pub use pipeline::{score, score_with_cancel, Director, Metric, Registry};
