//! Reconstruction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Issue identification (drafts + rubric vote)
//! - Reason mining with a word-overlap faithfulness check
//! - Pros/cons organization with bounded revision and logic revision
//! - Claim unpacking
//! - Relevance network over all claims
//! - Argument map (maximum branching + strong secondary edges)
//! - Scores and graphviz exports
//! - Plan resolution and execution (registry, director)

pub mod argmap;
pub mod context;
pub mod director;
pub mod export;
pub mod grounding;
pub mod issue;
pub mod prompts;
pub mod proscons;
pub mod reasons;
pub mod relevance;
pub mod scores;
pub mod stage;
pub mod unpack;

pub use argmap::{build_argmap, EdgeThresholds};
pub use context::{Built, StageContext};
pub use director::{score, score_with_cancel, Director};
pub use export::{render_svg, render_svg_with, to_dot, DOT_PROGRAM};
pub use grounding::{ungrounded_claims, word_overlap, ClaimGrounding};
pub use issue::{build_issue, winning_draft, DraftVotes};
pub use proscons::{assign, build_proscons, revise_logic, Assignment};
pub use reasons::mine_reasons;
pub use relevance::{build_relevance_network, dialectically_equivalent, sample_sources};
pub use stage::{Metric, ProductKind, ProductSpec, Registry, Stage};
pub use unpack::{dedupe_by_text, unpack_proscons};
