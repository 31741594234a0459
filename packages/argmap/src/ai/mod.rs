//! Backend implementations for the argmap library.
//!
//! This module provides reference implementations of the `LanguageModel`
//! and `Classifier` traits. Users can use these directly or implement their own.

mod rate_limited;

#[cfg(feature = "hf")]
mod hf_classifier;
#[cfg(feature = "openai")]
mod openai;

pub use rate_limited::{RateLimited, DEFAULT_REQUESTS_PER_SECOND};

#[cfg(feature = "hf")]
pub use hf_classifier::HfClassifier;
#[cfg(feature = "openai")]
pub use openai::OpenAiModel;
