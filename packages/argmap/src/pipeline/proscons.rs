//! Pros/cons organization.
//!
//! The model is asked to sort the mined reasons under a few root claims.
//! Its answer is checked against the mined list: reason texts are restored
//! from the canonical list, invented and repeated labels are discarded, and
//! reasons it left out are fed back in a bounded revision loop. Remaining
//! unused reasons are dropped with a warning.
//!
//! With more than one root, a classifier pass may move reasons to the root
//! they bear on most strongly (the valence never changes).

use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::context::{Built, StageContext};
use super::prompts::{format_options_prompt, format_proscons_prompt, format_revise_prompt};
use crate::error::Result;
use crate::parse::argdown::parse_proscons;
use crate::parse::claims::parse_options;
use crate::parse::labels::ensure_unique_labels_in;
use crate::parse::text::truncate_chars;
use crate::traits::model::Constraint;
use crate::types::claim::{Claim, ProsConsList, RootClaim, Valence};

/// Temperature of revision attempts.
const REVISION_TEMPERATURE: f32 = 0.4;

/// A pros/cons list checked against the mined reasons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub list: ProsConsList,

    /// Mined reasons that appear nowhere in the list
    pub unused: Vec<String>,

    /// Labels in the answer that are not mined reasons
    pub hallucinated: Vec<String>,

    /// Labels the answer used more than once
    pub duplicates: Vec<String>,
}

impl Assignment {
    pub fn problem_count(&self) -> usize {
        self.unused.len() + self.hallucinated.len() + self.duplicates.len()
    }

    /// Feedback for a revision prompt, empty if there is nothing to fix.
    pub fn critique(&self) -> Vec<String> {
        let unused = self
            .unused
            .iter()
            .map(|l| format!("The reason with label '{l}' does not appear in your pros and cons list."));
        let hallucinated = self.hallucinated.iter().map(|l| {
            format!("The reason with label '{l}' in your pros and cons list is not drawn from the original reasons list.")
        });
        let duplicates = self
            .duplicates
            .iter()
            .map(|l| format!("A reason with label '{l}' appears multiple times in the pros and cons list."));
        unused.chain(hallucinated).chain(duplicates).collect()
    }
}

/// Check a parsed answer against the mined `reasons`.
///
/// Keeps at most `max_roots` roots and drops roots left without reasons.
/// Root labels are made unique among themselves and against reason labels.
pub fn assign(raw: &ProsConsList, reasons: &[Claim], max_roots: usize, max_len_root: usize) -> Assignment {
    let canonical: HashMap<&str, &Claim> = reasons.iter().map(|r| (r.label.as_str(), r)).collect();
    let mut used: HashSet<&str> = HashSet::new();
    let mut hallucinated = Vec::new();
    let mut duplicates: IndexSet<String> = IndexSet::new();

    let mut roots = Vec::new();
    for raw_root in raw.roots.iter().take(max_roots) {
        let mut root = RootClaim::new(
            raw_root.label.clone(),
            truncate_chars(raw_root.text.trim(), max_len_root).trim(),
        );
        for (valence, claim) in raw_root.reasons() {
            match canonical.get(claim.label.as_str()) {
                Some(reason) if used.insert(reason.label.as_str()) => match valence {
                    Valence::Support => root.pros.push((*reason).clone()),
                    Valence::Attack => root.cons.push((*reason).clone()),
                },
                Some(_) => {
                    debug!(label = %claim.label, "discarding repeated reason");
                    duplicates.insert(claim.label.clone());
                }
                None => {
                    debug!(label = %claim.label, "discarding invented reason");
                    hallucinated.push(claim.label.clone());
                }
            }
        }
        if root.is_empty() {
            debug!(root = %root.label, "dropping root without reasons");
            continue;
        }
        roots.push(root);
    }

    let mut taken: HashSet<String> = reasons.iter().map(|r| r.label.clone()).collect();
    let root_claims: Vec<Claim> = roots.iter().map(RootClaim::as_claim).collect();
    for (root, unique) in roots
        .iter_mut()
        .zip(ensure_unique_labels_in(root_claims, &mut taken))
    {
        root.label = unique.label;
    }

    Assignment {
        unused: reasons
            .iter()
            .filter(|r| !used.contains(r.label.as_str()))
            .map(|r| r.label.clone())
            .collect(),
        list: ProsConsList::new(roots).with_options(raw.options.clone()),
        hallucinated,
        duplicates: duplicates.into_iter().collect(),
    }
}

async fn describe_options(ctx: &StageContext<'_>, text: &str, issue: &str) -> Result<Vec<String>> {
    let schema = serde_json::to_value(schemars::schema_for!(Vec<String>))?;
    let request = ctx
        .request(format_options_prompt(text, issue))
        .with_constraint(Constraint::JsonSchema(schema));
    let answer = ctx.generate(&request).await?;
    let options = parse_options(&answer, ctx.reconstruction().max_roots);
    debug!(?options, "options");
    Ok(options)
}

/// Organize `reasons` on `issue` into a pros/cons list.
pub async fn build_proscons(
    ctx: &StageContext<'_>,
    text: &str,
    issue: &str,
    reasons: &[Claim],
) -> Result<Built<ProsConsList>> {
    if issue.trim().is_empty() || reasons.is_empty() {
        return Ok(Built::new(ProsConsList::default()).with_warning("no reasons to organize"));
    }
    let config = ctx.reconstruction();

    let options = describe_options(ctx, text, issue).await?;
    let request = ctx.request(format_proscons_prompt(
        issue,
        &options,
        reasons,
        config.max_roots,
        config.max_len_root_claim,
    ));
    let answer = ctx.generate(&request).await?;
    let mut best = assign(&parse_proscons(&answer), reasons, config.max_roots, config.max_len_root_claim);

    let mut revisions = 0;
    while best.problem_count() > 0 && revisions < config.max_revisions {
        revisions += 1;
        info!(
            attempt = revisions,
            unused = best.unused.len(),
            hallucinated = best.hallucinated.len(),
            duplicates = best.duplicates.len(),
            "revising pros and cons list"
        );
        let request = ctx
            .request(format_revise_prompt(issue, reasons, &best.list, &best.critique()))
            .with_temperature(REVISION_TEMPERATURE);
        let answer = ctx.generate(&request).await?;
        let candidate = assign(&parse_proscons(&answer), reasons, config.max_roots, config.max_len_root_claim);
        if candidate.problem_count() < best.problem_count() {
            best = candidate;
        }
    }

    let mut built = Built::new(best.list.with_options(options));
    built.set_metadata("revisions", serde_json::json!(revisions));
    if !best.unused.is_empty() {
        warn!(unused = ?best.unused, "dropping reasons missing from pros and cons list");
        built.warn(format!(
            "dropped {} unused reason(s): {}",
            best.unused.len(),
            best.unused.join(", ")
        ));
        built.set_metadata("unused_reasons", serde_json::json!(best.unused));
    }
    if built.value.is_empty() {
        built.warn("no root claims could be identified");
        return Ok(built);
    }

    if config.revise_logic && built.value.roots.len() > 1 {
        match revise_logic(ctx, &built.value).await {
            Ok((revised, moved)) => {
                if !moved.is_empty() {
                    built.set_metadata("moved_reasons", serde_json::json!(moved));
                }
                built.value = revised;
            }
            Err(e) => {
                warn!(error = %e, "logic revision failed, keeping pros and cons list");
                built.warn(format!("logic revision skipped: {e}"));
            }
        }
    }

    info!(
        roots = built.value.roots.len(),
        reasons = built.value.reason_count(),
        "pros and cons list built"
    );
    Ok(built)
}

struct Move {
    label: String,
    from: usize,
    to: usize,
    valence: Valence,
}

/// Move reasons to the root they confirm (pros) or disconfirm (cons) most.
///
/// A reason moves only if the new root's probability is at least twice
/// that of its current root and the opposite query does not favor the same
/// root. Returns the revised list and the labels of moved reasons.
pub async fn revise_logic(
    ctx: &StageContext<'_>,
    list: &ProsConsList,
) -> Result<(ProsConsList, Vec<String>)> {
    if list.roots.len() < 2 {
        return Ok((list.clone(), Vec::new()));
    }
    let roots: Vec<Claim> = list.roots.iter().map(RootClaim::as_claim).collect();
    let reasons: Vec<(usize, Valence, &Claim)> = list.reasons().collect();
    let queries: Vec<(&Claim, &[Claim])> = reasons
        .iter()
        .map(|(_, _, claim)| (*claim, roots.as_slice()))
        .collect();

    let engine = ctx.relations();
    let (confirmed, disconfirmed) = tokio::try_join!(
        engine.most_confirmed(&queries),
        engine.most_disconfirmed(&queries)
    )?;

    let mut moves = Vec::new();
    for (i, (from, valence, claim)) in reasons.iter().enumerate() {
        let (primary, opposite) = match valence {
            Valence::Support => (&confirmed[i], &disconfirmed[i]),
            Valence::Attack => (&disconfirmed[i], &confirmed[i]),
        };
        let (Some(primary), Some(opposite)) = (primary, opposite) else {
            continue;
        };
        let to = primary.idx_max;
        if to == *from || primary.max_prob() < 2.0 * primary.prob(&roots[*from].label) {
            continue;
        }
        let target = &roots[to].label;
        if opposite.idx_max == to || opposite.prob(target) > primary.prob(target) {
            continue;
        }
        moves.push(Move {
            label: claim.label.clone(),
            from: *from,
            to,
            valence: *valence,
        });
    }

    let mut revised = list.clone();
    for m in &moves {
        let source = match m.valence {
            Valence::Support => &mut revised.roots[m.from].pros,
            Valence::Attack => &mut revised.roots[m.from].cons,
        };
        let Some(pos) = source.iter().position(|c| c.label == m.label) else {
            continue;
        };
        let claim = source.remove(pos);
        debug!(reason = %m.label, from = m.from, to = m.to, "moving reason");
        match m.valence {
            Valence::Support => revised.roots[m.to].pros.push(claim),
            Valence::Attack => revised.roots[m.to].cons.push(claim),
        }
    }
    revised.roots.retain(|r| !r.is_empty());

    Ok((revised, moves.into_iter().map(|m| m.label).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClassifier, MockModel};
    use proptest::prelude::*;
    use crate::types::config::{ReconstructionConfig, ScoreConfig};

    const ORGANIZE_KEY: &str = "Assignment: Organize an unstructured set of reasons";
    const REVISE_KEY: &str = "Assignment: Revise a pros & cons list";

    fn reasons() -> Vec<Claim> {
        vec![
            Claim::new("A", "Buying builds equity."),
            Claim::new("B", "Prices keep rising."),
            Claim::new("C", "A mortgage is risky."),
        ]
    }

    fn config() -> ScoreConfig {
        ScoreConfig::default().with_reconstruction(ReconstructionConfig::default().with_revise_logic(false))
    }

    #[test]
    fn test_assign_restores_canonical_text_and_discards_noise() {
        let raw = parse_proscons(
            "[R]: Buy a flat.\n+ [A]: paraphrased.\n+ [X]: invented.\n- [A]: again.\n- [C]: risky.",
        );
        let a = assign(&raw, &reasons(), 10, 128);
        assert_eq!(a.list.roots[0].pros, vec![Claim::new("A", "Buying builds equity.")]);
        assert_eq!(a.list.roots[0].cons, vec![Claim::new("C", "A mortgage is risky.")]);
        assert_eq!(a.unused, vec!["B"]);
        assert_eq!(a.hallucinated, vec!["X"]);
        assert_eq!(a.duplicates, vec!["A"]);
        assert_eq!(a.critique().len(), 3);
    }

    #[test]
    fn test_label_repeated_across_roots_counts_once() {
        let raw = parse_proscons(
            "[R1]: One.\n+ [A]: a.\n[R2]: Two.\n+ [B]: b.\n[R3]: Three.\n- [A]: again.\n- [B]: again.\n+ [A]: thrice.\n- [C]: c.",
        );
        let a = assign(&raw, &reasons(), 10, 128);
        assert_eq!(a.duplicates, vec!["A", "B"]);
        assert!(a.unused.is_empty());
        assert_eq!(a.problem_count(), 2);
    }

    #[test]
    fn test_assign_drops_empty_roots_and_renames_clashing_roots() {
        let raw = parse_proscons("[Empty]: Nothing.\n[A]: Buy.\n+ [A]: x.\n+ [B]: y.\n- [C]: z.");
        let a = assign(&raw, &reasons(), 10, 128);
        assert_eq!(a.list.roots.len(), 1);
        assert_eq!(a.list.roots[0].label, "A-2");
        assert_eq!(a.problem_count(), 0);
    }

    #[test]
    fn test_assign_respects_max_roots() {
        let raw = parse_proscons("[R1]: One.\n+ [A]: x.\n[R2]: Two.\n+ [B]: y.\n- [C]: z.");
        let a = assign(&raw, &reasons(), 1, 128);
        assert_eq!(a.list.roots.len(), 1);
        assert_eq!(a.unused, vec!["B", "C"]);
    }

    /// One raw root: label index and a list of (is_pro, label index).
    fn raw_root() -> impl Strategy<Value = (usize, Vec<(bool, usize)>)> {
        (0..8usize, proptest::collection::vec((any::<bool>(), 0..10usize), 0..8))
    }

    /// Indices below the reason count name mined reasons, the rest are invented.
    fn label(i: usize, n: usize) -> String {
        if i < n {
            format!("R{i}")
        } else {
            format!("X{i}")
        }
    }

    proptest! {
        #[test]
        fn every_reason_is_used_once_or_reported_unused(
            n in 1..7usize,
            raw_roots in proptest::collection::vec(raw_root(), 0..5),
            max_roots in 1..5usize,
        ) {
            let mined: Vec<Claim> = (0..n).map(|i| Claim::new(format!("R{i}"), format!("Reason {i}."))).collect();
            let raw = ProsConsList::new(
                raw_roots
                    .iter()
                    .map(|(root, items)| {
                        items.iter().fold(
                            RootClaim::new(label(*root, n), "Option."),
                            |r, (is_pro, i)| {
                                let claim = Claim::new(label(*i, n), "paraphrase");
                                if *is_pro { r.with_pro(claim) } else { r.with_con(claim) }
                            },
                        )
                    })
                    .collect(),
            );

            let a = assign(&raw, &mined, max_roots, 128);
            let mined_labels: HashSet<String> = mined.iter().map(|c| c.label.clone()).collect();

            let placed: Vec<String> = a.list.reasons().map(|(_, _, c)| c.label.clone()).collect();
            let placed_set: HashSet<String> = placed.iter().cloned().collect();
            prop_assert_eq!(placed_set.len(), placed.len());
            prop_assert!(placed_set.is_subset(&mined_labels));

            let unused: HashSet<String> = a.unused.iter().cloned().collect();
            prop_assert!(placed_set.is_disjoint(&unused));
            prop_assert_eq!(&placed_set | &unused, mined_labels.clone());

            prop_assert!(a.list.roots.len() <= max_roots);
            let root_labels: HashSet<String> = a.list.roots.iter().map(|r| r.label.clone()).collect();
            prop_assert_eq!(root_labels.len(), a.list.roots.len());
            prop_assert!(root_labels.is_disjoint(&mined_labels));
            prop_assert!(a.hallucinated.iter().all(|l| !mined_labels.contains(l)));
            let duplicates: HashSet<&String> = a.duplicates.iter().collect();
            prop_assert_eq!(duplicates.len(), a.duplicates.len());
        }
    }

    #[tokio::test]
    async fn test_complete_answer_needs_no_revision() {
        let model = MockModel::new().with_response(
            ORGANIZE_KEY,
            "```argdown\n[R]: Buy a flat.\n// PROS\n+ [A]: a\n+ [B]: b\n// CONS\n- [C]: c\n```",
        );
        let classifier = MockClassifier::new();
        let config = config();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = build_proscons(&ctx, "text", "Rent or buy?", &reasons()).await.unwrap();
        let root = &built.value.roots[0];
        assert_eq!(root.label, "R");
        assert_eq!(root.pros.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(root.cons.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(), vec!["C"]);
        assert!(built.warnings.is_empty());
        assert_eq!(model.generate_calls_containing(REVISE_KEY), 0);
    }

    #[tokio::test]
    async fn test_revision_adds_unused_reasons() {
        let model = MockModel::new()
            .with_response(ORGANIZE_KEY, "[R]: Buy a flat.\n+ [A]: a\n- [C]: c")
            .with_response(REVISE_KEY, "[R]: Buy a flat.\n+ [A]: a\n+ [B]: b\n- [C]: c");
        let classifier = MockClassifier::new();
        let config = config();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = build_proscons(&ctx, "text", "Rent or buy?", &reasons()).await.unwrap();
        assert_eq!(built.value.reason_count(), 3);
        assert!(built.warnings.is_empty());
        assert_eq!(model.generate_calls_containing(REVISE_KEY), 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_drops_unused_with_warning() {
        let model = MockModel::new()
            .with_response(ORGANIZE_KEY, "[R]: Buy a flat.\n+ [A]: a")
            .with_response(REVISE_KEY, "[R]: Buy a flat.\n+ [A]: a");
        let classifier = MockClassifier::new();
        let config = config();
        let ctx = StageContext::new(&model, &classifier, &config);

        let built = build_proscons(&ctx, "text", "Rent or buy?", &reasons()).await.unwrap();
        assert_eq!(built.value.reason_count(), 1);
        assert_eq!(built.warnings.len(), 1);
        assert_eq!(built.metadata["unused_reasons"], serde_json::json!(["B", "C"]));
        assert_eq!(model.generate_calls_containing(REVISE_KEY), 2);
    }

    #[tokio::test]
    async fn test_logic_revision_moves_misplaced_pro() {
        // B is filed under Rent but clearly confirms Buy
        let list = ProsConsList::new(vec![
            RootClaim::new("Buy", "Buy a flat.").with_pro(Claim::new("A", "Buying builds equity.")),
            RootClaim::new("Rent", "Rent a flat.")
                .with_pro(Claim::new("B", "Prices keep rising."))
                .with_con(Claim::new("C", "Rent is wasted money.")),
        ]);
        let classifier = MockClassifier::new()
            .with_score("Reason: Prices keep rising", "claim [Buy] is most strongly confirmed", 0.9)
            .with_score("Reason: Prices keep rising", "claim [Rent] is most strongly confirmed", 0.1)
            .with_score("Reason: Prices keep rising", "claim [Rent] is most strongly disconfirmed", 0.8)
            .with_score("Reason: Prices keep rising", "claim [Buy] is most strongly disconfirmed", 0.2)
            .with_score("Reason: Buying builds equity", "most strongly", 0.5)
            .with_score("Reason: Rent is wasted money", "most strongly", 0.5);
        let model = MockModel::new();
        let config = ScoreConfig::default();
        let ctx = StageContext::new(&model, &classifier, &config);

        let (revised, moved) = revise_logic(&ctx, &list).await.unwrap();
        assert_eq!(moved, vec!["B"]);
        assert_eq!(revised.roots[0].pros.len(), 2);
        assert!(revised.roots[1].pros.is_empty());
        assert_eq!(revised.roots[1].cons.len(), 1);
    }
}
