//! Claim unpacking: split compound reasons into atomic claims.

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::context::{Built, StageContext};
use super::grounding::ungrounded_claims;
use super::prompts::format_unpack_prompt;
use crate::error::Result;
use crate::parse::claims::{parse_claims, ClaimLimits};
use crate::parse::labels::ensure_unique_labels_in;
use crate::parse::text::label_from_words;
use crate::types::claim::{Claim, ProsConsList, RootClaim};

/// Temperature of unpacking requests.
const UNPACK_TEMPERATURE: f32 = 0.4;

async fn unpack_reason(ctx: &StageContext<'_>, issue: &str, reason: &Claim) -> Result<Vec<Claim>> {
    let config = ctx.reconstruction();
    let request = ctx
        .request(format_unpack_prompt(issue, reason))
        .with_temperature(UNPACK_TEMPERATURE);
    let answer = ctx.generate(&request).await?;
    let limits = ClaimLimits {
        max_items: config.max_reasons,
        max_len_label: config.max_len_title,
        max_len_text: config.max_len_gist,
    };
    Ok(parse_claims(&answer, &limits)
        .into_iter()
        .map(|mut claim| {
            if claim.label.is_empty() {
                claim.label = label_from_words(&claim.text);
            }
            claim
        })
        .collect())
}

fn text_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop reasons whose text repeats an earlier reason anywhere in the list.
pub fn dedupe_by_text(list: &mut ProsConsList) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    let mut keep = |claim: &Claim| {
        if seen.insert(text_key(&claim.text)) {
            true
        } else {
            dropped.push(claim.label.clone());
            false
        }
    };
    for root in &mut list.roots {
        root.pros.retain(&mut keep);
        root.cons.retain(&mut keep);
    }
    dropped
}

/// Replace each compound reason by the claims it contains.
///
/// A reason is replaced only if the model finds more than one claim in it;
/// unpacked claims keep the parent's root and valence. A failed call leaves
/// its reason as is.
pub async fn unpack_proscons(
    ctx: &StageContext<'_>,
    issue: &str,
    list: &ProsConsList,
) -> Result<Built<ProsConsList>> {
    let config = ctx.reconstruction();
    if !config.unpack_reasons || list.reason_count() == 0 {
        return Ok(Built::new(list.clone()));
    }

    let reasons: Vec<&Claim> = list.reasons().map(|(_, _, claim)| claim).collect();
    let results: Vec<Result<Vec<Claim>>> = stream::iter(reasons.iter())
        .map(|reason| unpack_reason(ctx, issue, reason))
        .buffered(ctx.config.relations.max_concurrency.max(1))
        .collect()
        .await;

    let mut built = Built::new(ProsConsList::default());
    let mut taken: HashSet<String> = list
        .roots
        .iter()
        .map(|r| r.label.clone())
        .chain(reasons.iter().map(|c| c.label.clone()))
        .collect();
    let mut replacements: IndexMap<String, Vec<Claim>> = IndexMap::new();
    for (reason, result) in reasons.iter().zip(results) {
        match result {
            Ok(claims) if claims.len() > 1 => {
                let flagged = ungrounded_claims(&claims, &reason.text, config.faithfulness_threshold);
                if !flagged.is_empty() {
                    warn!(reason = %reason.label, "unpacked claims with little overlap with their reason");
                    built.warn(format!(
                        "possibly unfaithful claims unpacked from '{}'",
                        reason.label
                    ));
                }
                let claims = ensure_unique_labels_in(claims, &mut taken);
                debug!(reason = %reason.label, claims = claims.len(), "unpacked reason");
                replacements.insert(reason.label.clone(), claims);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(reason = %reason.label, error = %e, "unpacking failed, keeping reason");
                built.warn(format!("could not unpack '{}': {e}", reason.label));
            }
        }
    }

    let expand = |claims: &[Claim]| -> Vec<Claim> {
        claims
            .iter()
            .flat_map(|c| match replacements.get(&c.label) {
                Some(parts) => parts.clone(),
                None => vec![c.clone()],
            })
            .collect()
    };
    let mut unpacked = ProsConsList::new(
        list.roots
            .iter()
            .map(|root| RootClaim {
                label: root.label.clone(),
                text: root.text.clone(),
                pros: expand(&root.pros),
                cons: expand(&root.cons),
            })
            .collect(),
    )
    .with_options(list.options.clone());

    let dropped = dedupe_by_text(&mut unpacked);
    if !dropped.is_empty() {
        debug!(?dropped, "removed repeated claims");
    }

    if !replacements.is_empty() {
        let map: IndexMap<&String, Vec<&String>> = replacements
            .iter()
            .map(|(parent, parts)| (parent, parts.iter().map(|c| &c.label).collect()))
            .collect();
        built.set_metadata("unpacked", serde_json::json!(map));
    }
    info!(
        before = list.reason_count(),
        after = unpacked.reason_count(),
        "reasons unpacked"
    );
    built.value = unpacked;
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClassifier, MockModel, MockModelCall};
    use crate::types::config::{ReconstructionConfig, ScoreConfig};

    fn list() -> ProsConsList {
        ProsConsList::new(vec![RootClaim::new("Buy", "Buy a flat.")
            .with_pro(Claim::new(
                "Equity",
                "Buying builds equity and prices keep rising.",
            ))
            .with_con(Claim::new("Risk", "A mortgage is risky."))])
    }

    #[tokio::test]
    async fn test_compound_reason_is_replaced_in_place() {
        let model = MockModel::new().with_response(
            "[Equity]:",
            "claims:\n- title: Equity\n  claim: Buying builds equity.\n- claim: Prices keep rising.",
        );
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = unpack_proscons(&ctx, "Rent or buy?", &list()).await.unwrap();
        let root = &built.value.roots[0];
        let labels: Vec<_> = root.pros.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Equity-2", "Prices-keep-rising"]);
        assert_eq!(root.cons, vec![Claim::new("Risk", "A mortgage is risky.")]);
        assert!(built.metadata.contains_key("unpacked"));
    }

    #[tokio::test]
    async fn test_single_claim_keeps_reason() {
        let model = MockModel::new().with_response("[Risk]:", "claims:\n- title: R\n  claim: Risky.");
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = unpack_proscons(&ctx, "Rent or buy?", &list()).await.unwrap();
        assert_eq!(built.value, list());
        assert!(built.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_unpacking_samples_at_fixed_temperature() {
        let model = MockModel::new().with_response("Assignment: Unpack", "claims:\n- claim: Anything.");
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default();
        let ctx = StageContext::new(&model, &classifier, &config);

        unpack_proscons(&ctx, "Rent or buy?", &list()).await.unwrap();
        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        for call in calls {
            assert!(matches!(
                call,
                MockModelCall::Generate { temperature, .. } if temperature == UNPACK_TEMPERATURE
            ));
        }
    }

    #[tokio::test]
    async fn test_disabled_unpacking_makes_no_calls() {
        let model = MockModel::new();
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default()
            .with_reconstruction(ReconstructionConfig::default().with_unpack_reasons(false));
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = unpack_proscons(&ctx, "Rent or buy?", &list()).await.unwrap();
        assert_eq!(built.value, list());
        assert!(model.calls().is_empty());
    }

    #[test]
    fn test_dedupe_by_text_across_roots() {
        let mut list = ProsConsList::new(vec![
            RootClaim::new("R1", "One.").with_pro(Claim::new("A", "Same  text.")),
            RootClaim::new("R2", "Two.").with_con(Claim::new("B", "same text.")),
        ]);
        assert_eq!(dedupe_by_text(&mut list), vec!["B"]);
        assert!(list.roots[1].cons.is_empty());
    }
}
