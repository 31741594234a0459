//! Reason mining: every argument the text puts forward, in order.

use tracing::{debug, info, warn};

use super::context::{Built, StageContext};
use super::grounding::ungrounded_claims;
use super::prompts::format_mine_reasons_prompt;
use crate::error::Result;
use crate::parse::claims::{parse_claims, ClaimLimits};
use crate::parse::labels::ensure_unique_labels;
use crate::types::claim::Claim;

/// Extract the reasons `text` gives on `issue`.
///
/// An empty issue short-circuits to an empty list.
pub async fn mine_reasons(ctx: &StageContext<'_>, text: &str, issue: &str) -> Result<Built<Vec<Claim>>> {
    if issue.trim().is_empty() {
        return Ok(Built::new(Vec::new()).with_warning("no issue, skipping reason mining"));
    }

    let config = ctx.reconstruction();
    let request = ctx.request(format_mine_reasons_prompt(
        text,
        issue,
        config.max_len_title,
        config.max_len_gist,
    ));
    let answer = ctx.generate(&request).await?;

    let limits = ClaimLimits {
        max_items: config.max_reasons,
        max_len_label: config.max_len_title,
        max_len_text: config.max_len_gist,
    };
    let reasons = ensure_unique_labels(parse_claims(&answer, &limits));
    debug!(reasons = reasons.len(), "mined reasons");

    let mut built = Built::new(reasons);
    if built.value.is_empty() {
        warn!("no reasons found in model answer");
        built.warn("no reasons could be extracted");
        return Ok(built);
    }

    let flagged = ungrounded_claims(&built.value, text, config.faithfulness_threshold);
    if !flagged.is_empty() {
        let labels: Vec<&str> = flagged.iter().map(|g| g.label.as_str()).collect();
        warn!(?labels, "reasons with little overlap with the source text");
        built.warn(format!("possibly unfaithful reasons: {}", labels.join(", ")));
        built.set_metadata("ungrounded", serde_json::json!(flagged));
    }

    info!(reasons = built.value.len(), "reasons mined");
    Ok(built)
}
