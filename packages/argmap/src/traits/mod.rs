//! Core trait abstractions for backing services.

pub mod classifier;
pub mod model;
