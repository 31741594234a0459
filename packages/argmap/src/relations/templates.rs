//! Premise and hypothesis templates for NLI queries.

use crate::types::claim::Claim;
use crate::types::relation::RelationLabel;

/// Hypothesis for pairwise relations; `{}` takes a verbalized label.
pub const DIALECTIC_HYPOTHESIS: &str = "The claim is {} the given reason.";

pub const LABEL_SUPPORT: &str = "directly confirmed by";
pub const LABEL_ATTACK: &str = "directly disconfirmed by";
pub const LABEL_NEUTRAL: &str = "independent of";

/// Hypothesis for "most confirmed" multiple-choice queries.
pub const MOST_CONFIRMED_HYPOTHESIS: &str =
    "Of all claims listed, claim [{}] is most strongly confirmed by the given reason.";

/// Hypothesis for "most disconfirmed" multiple-choice queries.
pub const MOST_DISCONFIRMED_HYPOTHESIS: &str =
    "Of all claims listed, claim [{}] is most strongly disconfirmed by the given reason.";

pub fn verbalize(label: RelationLabel) -> &'static str {
    match label {
        RelationLabel::Support => LABEL_SUPPORT,
        RelationLabel::Attack => LABEL_ATTACK,
        RelationLabel::Neutral => LABEL_NEUTRAL,
    }
}

fn strip_period(text: &str) -> &str {
    text.trim().trim_end_matches('.')
}

/// Premise for a pairwise query: does `reason` bear on `claim`?
pub fn dialectic_premise(reason: &str, claim: &str) -> String {
    format!(
        "Claim: {}. Reason: {}.",
        strip_period(claim),
        strip_period(reason)
    )
}

/// Premise for a multiple-choice query listing candidate claims.
pub fn choice_premise(reason: &str, claims: &[Claim]) -> String {
    let mut premise = format!("Reason: {}.\nClaims:", strip_period(reason));
    for claim in claims {
        premise.push_str(&format!("\n[{}]: {}", claim.label, claim.text.trim()));
    }
    premise
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premises() {
        assert_eq!(
            dialectic_premise("It is cheap.", "Buy it."),
            "Claim: Buy it. Reason: It is cheap."
        );
        let claims = vec![Claim::new("P", "Go."), Claim::new("Q", "Stay.")];
        assert_eq!(
            choice_premise("Rain", &claims),
            "Reason: Rain.\nClaims:\n[P]: Go.\n[Q]: Stay."
        );
    }
}
