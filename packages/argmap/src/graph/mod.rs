//! Graph algorithms used by the argument-map builder and scorers.

pub mod balance;
pub mod branching;
pub mod centrality;

pub use balance::{balance_scores, BalanceScores};
pub use branching::{maximum_arborescence, WeightedEdge};
pub use centrality::{katz_centrality, KatzParams};
