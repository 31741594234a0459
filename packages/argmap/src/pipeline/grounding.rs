//! Post-hoc faithfulness check of extracted claims.
//!
//! A claim is grounded in its source text to the degree that its content
//! words occur there. This is a cheap lexical heuristic: paraphrases score
//! low, and copied words in a new arrangement score high. Flagged claims
//! are reported, never removed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::claim::Claim;

/// Words ignored when measuring overlap.
const STOPWORDS: [&str; 24] = [
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "has", "have", "was",
    "were", "will", "with", "this", "that", "from", "they", "their", "there", "its", "our",
];

/// Overlap of one claim with the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimGrounding {
    pub label: String,

    /// Share of the claim's content words found in the source, in [0, 1]
    pub overlap: f64,
}

fn content_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Share of `claim`'s content words that occur in `source`.
///
/// Claims without content words count as fully grounded.
pub fn word_overlap(claim: &str, source: &str) -> f64 {
    let words = content_words(claim);
    if words.is_empty() {
        return 1.0;
    }
    let source = content_words(source);
    words.iter().filter(|w| source.contains(*w)).count() as f64 / words.len() as f64
}

/// Claims whose overlap with `source` falls below `threshold`.
pub fn ungrounded_claims(claims: &[Claim], source: &str, threshold: f64) -> Vec<ClaimGrounding> {
    let source_words = content_words(source);
    claims
        .iter()
        .filter_map(|claim| {
            let words = content_words(&claim.text);
            if words.is_empty() {
                return None;
            }
            let overlap =
                words.iter().filter(|w| source_words.contains(*w)).count() as f64 / words.len() as f64;
            (overlap < threshold).then(|| ClaimGrounding {
                label: claim.label.clone(),
                overlap,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "Renting keeps me flexible, but buying builds equity over time.";

    #[test]
    fn test_overlap_ignores_case_and_stopwords() {
        assert_eq!(word_overlap("Buying builds EQUITY.", SOURCE), 1.0);
        assert_eq!(word_overlap("the and for", SOURCE), 1.0);
        assert!((word_overlap("Buying raises taxes.", SOURCE) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ungrounded_claims_are_flagged() {
        let claims = vec![
            Claim::new("Equity", "Buying builds equity."),
            Claim::new("Weather", "Winters are harsh in Oslo."),
        ];
        let flagged = ungrounded_claims(&claims, SOURCE, 0.3);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].label, "Weather");
        assert_eq!(flagged[0].overlap, 0.0);
    }
}
