//! Data types for argument reconstruction.

pub mod argmap;
pub mod claim;
pub mod config;
pub mod relation;
pub mod state;

pub use argmap::{ArgMapEdge, ArgMapNode, ArgumentMap, NodeRole, RelevanceNetwork};
pub use claim::{Claim, ProsConsList, RootClaim, Valence};
pub use config::{ArgmapConfig, ReconstructionConfig, RelationConfig, RetryPolicy, ScoreConfig};
pub use relation::{DialecticRelation, MultipleChoiceResult, RelationDistribution, RelationLabel};
pub use state::{Artifact, ArtifactData, DebugState, Score, Warning};
