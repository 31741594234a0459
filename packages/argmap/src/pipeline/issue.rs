//! Issue identification: sample drafts, then vote with a rubric.

use futures::future::try_join_all;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::context::{Built, StageContext};
use super::prompts::{format_issue_draft_prompt, format_issue_rating_prompt, DRAFT_LABELS, ISSUE_RUBRIC};
use crate::error::Result;
use crate::parse::text::{bounded_sentence, strip_tags};
use crate::traits::model::Constraint;

/// Tally of one draft across the rubric questions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DraftVotes {
    /// Questions for which this draft had the highest probability
    pub wins: usize,

    /// Summed probability over all questions
    pub mass: f64,
}

/// Index of the winning draft: most wins, then most mass, then earliest.
pub fn winning_draft(votes: &[DraftVotes]) -> usize {
    let mut best = 0;
    for (i, v) in votes.iter().enumerate().skip(1) {
        let b = &votes[best];
        if v.wins > b.wins || (v.wins == b.wins && v.mass > b.mass) {
            best = i;
        }
    }
    best
}

/// Add one question's label probabilities to the tally.
fn tally(votes: &mut [DraftVotes], labels: &[String], probs: &IndexMap<String, f64>) {
    let mut top: Option<(usize, f64)> = None;
    for (i, label) in labels.iter().enumerate() {
        let p = probs.get(label).copied().unwrap_or(0.0);
        votes[i].mass += p;
        if top.map_or(true, |(_, best)| p > best) {
            top = Some((i, p));
        }
    }
    if let Some((i, _)) = top {
        votes[i].wins += 1;
    }
}

async fn draft_issues(ctx: &StageContext<'_>, text: &str) -> Result<Vec<String>> {
    let config = ctx.reconstruction();
    let n = config.n_drafts.clamp(1, DRAFT_LABELS.len());
    let regex = format!("<ISSUE>[^\\n<]{{1,{}}}</ISSUE>", config.max_len_issue);
    let request = ctx
        .request(format_issue_draft_prompt(text, config.max_len_issue))
        .with_temperature(config.draft_temperature)
        .with_stop("</ISSUE>")
        .with_constraint(Constraint::Regex(regex));

    let raw = try_join_all((0..n).map(|_| ctx.generate(&request))).await?;
    Ok(raw
        .iter()
        .map(|r| bounded_sentence(strip_tags(r, "ISSUE"), config.max_len_issue))
        .filter(|d| !d.is_empty())
        .collect())
}

/// Identify the central issue of `text`.
///
/// Empty text yields an empty issue without any model call.
pub async fn build_issue(ctx: &StageContext<'_>, text: &str) -> Result<Built<String>> {
    if text.trim().is_empty() {
        return Ok(Built::new(String::new()).with_warning("empty completion, no issue identified"));
    }

    let drafts = draft_issues(ctx, text).await?;
    debug!(drafts = drafts.len(), "issue drafts");

    let mut built = match drafts.len() {
        0 => {
            return Ok(
                Built::new(String::new()).with_warning("model returned no usable issue draft")
            )
        }
        1 => Built::new(drafts[0].clone()),
        _ => {
            let labels: Vec<String> = DRAFT_LABELS[..drafts.len()]
                .iter()
                .map(|l| l.to_string())
                .collect();
            let mut votes = vec![DraftVotes::default(); drafts.len()];
            let mut degraded = None;
            for question in ISSUE_RUBRIC {
                let messages = StageContext::chat(format_issue_rating_prompt(text, &drafts, question));
                match ctx.label_probs(&messages, &labels).await {
                    Ok(probs) => tally(&mut votes, &labels, &probs),
                    Err(e) => {
                        warn!(error = %e, "issue rating failed, keeping first draft");
                        degraded = Some(format!("issue rating failed: {e}"));
                        break;
                    }
                }
            }
            match degraded {
                Some(message) => Built::new(drafts[0].clone()).with_warning(message),
                None => {
                    let winner = winning_draft(&votes);
                    debug!(winner = %labels[winner], ?votes, "issue vote");
                    let wins: Vec<usize> = votes.iter().map(|v| v.wins).collect();
                    let mut built = Built::new(drafts[winner].clone());
                    built.set_metadata("votes", serde_json::json!(wins));
                    built
                }
            }
        }
    };

    built.set_metadata("drafts", serde_json::json!(drafts));
    info!(issue = %built.value, "issue identified");
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClassifier, MockModel, MockModelCall};
    use crate::types::config::ScoreConfig;

    const DRAFT_KEY: &str = "Assignment: Identify the overarching issue";
    const RATING_KEY: &str = "Assignment: Evaluate alternative statements";

    #[test]
    fn test_winner_prefers_wins_then_mass_then_first() {
        let v = |wins, mass| DraftVotes { wins, mass };
        assert_eq!(winning_draft(&[v(1, 0.9), v(2, 0.5), v(0, 0.1)]), 1);
        assert_eq!(winning_draft(&[v(1, 0.4), v(1, 0.6)]), 1);
        assert_eq!(winning_draft(&[v(1, 0.5), v(1, 0.5)]), 0);
    }

    #[tokio::test]
    async fn test_vote_picks_favored_draft() {
        let model = MockModel::new()
            .with_responses(
                DRAFT_KEY,
                vec![
                    "<ISSUE>Should I rent?</ISSUE>".into(),
                    "<ISSUE>Rent or buy a flat?</ISSUE>".into(),
                    "<ISSUE>Housing.</ISSUE>".into(),
                ],
            )
            .with_vote(RATING_KEY, "B");
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = build_issue(&ctx, "I could rent, or buy a flat.").await.unwrap();
        assert_eq!(built.value, "Rent or buy a flat?");
        assert!(built.warnings.is_empty());

        let ratings = model
            .calls()
            .iter()
            .filter(|c| matches!(c, MockModelCall::LabelProbs { .. }))
            .count();
        assert_eq!(ratings, ISSUE_RUBRIC.len());
    }

    #[tokio::test]
    async fn test_empty_text_skips_model() {
        let model = MockModel::new();
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = build_issue(&ctx, "   ").await.unwrap();
        assert_eq!(built.value, "");
        assert_eq!(built.warnings.len(), 1);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_single_draft_needs_no_vote() {
        let model = MockModel::new().with_response(DRAFT_KEY, "<ISSUE>Go or stay?");
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default().with_reconstruction(
            crate::types::config::ReconstructionConfig::default().with_n_drafts(1),
        );
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = build_issue(&ctx, "Should I go?").await.unwrap();
        assert_eq!(built.value, "Go or stay?");
        assert_eq!(model.calls().len(), 1);
    }
}
