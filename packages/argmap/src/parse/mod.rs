//! Parsing of semi-structured model output into typed records.

pub mod argdown;
pub mod claims;
pub mod labels;
pub mod text;

pub use argdown::{format_proscons, parse_proposition, parse_proscons};
pub use claims::{parse_claims, parse_options, ClaimLimits};
pub use labels::{ensure_unique_labels, ensure_unique_labels_in};
pub use text::{bounded_sentence, label_from_words, strip_tags, trunk_to_sentence, truncate_chars};
