//! Dialectic relations and multiple-choice results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::claim::Valence;

/// Label of a pairwise dialectic relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationLabel {
    Support,
    Attack,
    Neutral,
}

impl RelationLabel {
    pub const ALL: [RelationLabel; 3] = [
        RelationLabel::Support,
        RelationLabel::Attack,
        RelationLabel::Neutral,
    ];

    pub fn valence(&self) -> Option<Valence> {
        match self {
            RelationLabel::Support => Some(Valence::Support),
            RelationLabel::Attack => Some(Valence::Attack),
            RelationLabel::Neutral => None,
        }
    }
}

impl From<Valence> for RelationLabel {
    fn from(v: Valence) -> Self {
        match v {
            Valence::Support => RelationLabel::Support,
            Valence::Attack => RelationLabel::Attack,
        }
    }
}

/// Probability distribution over relation labels.
///
/// Always normalized: constructors rescale the masses so they sum to one.
/// A distribution without mass falls back to `neutral = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationDistribution {
    pub support: f64,
    pub attack: f64,
    pub neutral: f64,
}

impl RelationDistribution {
    pub fn new(support: f64, attack: f64, neutral: f64) -> Self {
        let clamp = |x: f64| if x.is_finite() && x > 0.0 { x } else { 0.0 };
        let (support, attack, neutral) = (clamp(support), clamp(attack), clamp(neutral));
        let total = support + attack + neutral;
        if total <= 0.0 {
            return Self::neutral();
        }
        Self {
            support: support / total,
            attack: attack / total,
            neutral: neutral / total,
        }
    }

    /// Degenerate distribution used when the classifier result is unusable.
    pub fn neutral() -> Self {
        Self {
            support: 0.0,
            attack: 0.0,
            neutral: 1.0,
        }
    }

    /// Support/attack only, renormalized. Splits evenly when both are zero.
    pub fn two_way(&self) -> Self {
        let total = self.support + self.attack;
        if total <= 0.0 {
            return Self {
                support: 0.5,
                attack: 0.5,
                neutral: 0.0,
            };
        }
        Self {
            support: self.support / total,
            attack: self.attack / total,
            neutral: 0.0,
        }
    }

    pub fn prob(&self, label: RelationLabel) -> f64 {
        match label {
            RelationLabel::Support => self.support,
            RelationLabel::Attack => self.attack,
            RelationLabel::Neutral => self.neutral,
        }
    }

    /// Most probable label; earlier labels in `RelationLabel::ALL` win ties.
    pub fn argmax(&self) -> RelationLabel {
        let mut best = RelationLabel::Support;
        for label in RelationLabel::ALL {
            if self.prob(label) > self.prob(best) {
                best = label;
            }
        }
        best
    }

    /// Support if it outweighs attack, else attack.
    pub fn dominant_valence(&self) -> Valence {
        if self.support > self.attack {
            Valence::Support
        } else {
            Valence::Attack
        }
    }

    pub fn total(&self) -> f64 {
        self.support + self.attack + self.neutral
    }
}

/// A computed relation between two claims (by label).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialecticRelation {
    pub source: String,
    pub target: String,
    pub distribution: RelationDistribution,

    /// Label with maximum probability mass
    pub argmax: RelationLabel,

    /// Valence used in the network (fixed or dominant)
    pub valence: Valence,

    /// Probability mass on `valence`
    pub weight: f64,
}

impl DialecticRelation {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        distribution: RelationDistribution,
        valence: Option<Valence>,
    ) -> Self {
        let valence = valence.unwrap_or_else(|| distribution.dominant_valence());
        Self {
            source: source.into(),
            target: target.into(),
            argmax: distribution.argmax(),
            weight: distribution.prob(valence.into()),
            valence,
            distribution,
        }
    }
}

/// Result of a multiple-choice query over candidate claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceResult {
    /// Probability per choice label, in choice order
    pub probs: IndexMap<String, f64>,
    pub label_max: String,
    pub idx_max: usize,
}

impl MultipleChoiceResult {
    /// Build from raw scores; normalizes and falls back to uniform.
    ///
    /// Returns `None` for an empty choice set.
    pub fn from_scores(choices: &[String], scores: &[f64]) -> Option<Self> {
        if choices.is_empty() {
            return None;
        }
        let valid = scores.len() == choices.len()
            && scores.iter().all(|s| s.is_finite() && *s >= 0.0)
            && scores.iter().sum::<f64>() > 0.0;
        let total: f64 = if valid { scores.iter().sum() } else { 0.0 };
        let probs: IndexMap<String, f64> = choices
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let p = if valid {
                    scores[i] / total
                } else {
                    1.0 / choices.len() as f64
                };
                (c.clone(), p)
            })
            .collect();

        let mut idx_max = 0;
        for (i, p) in probs.values().enumerate() {
            if *p > probs[idx_max] {
                idx_max = i;
            }
        }
        Some(Self {
            label_max: choices[idx_max].clone(),
            idx_max,
            probs,
        })
    }

    /// Uniform distribution over `choices`.
    pub fn uniform(choices: &[String]) -> Option<Self> {
        Self::from_scores(choices, &[])
    }

    pub fn prob(&self, label: &str) -> f64 {
        self.probs.get(label).copied().unwrap_or(0.0)
    }

    pub fn max_prob(&self) -> f64 {
        self.probs.get_index(self.idx_max).map(|(_, p)| *p).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_mass_falls_back_to_neutral() {
        let d = RelationDistribution::new(0.0, f64::NAN, -1.0);
        assert_eq!(d, RelationDistribution::neutral());
        assert_eq!(d.argmax(), RelationLabel::Neutral);
    }

    #[test]
    fn test_relation_weight_is_mass_on_valence() {
        let d = RelationDistribution::new(0.2, 0.7, 0.1);
        let rel = DialecticRelation::new("a", "b", d, None);
        assert_eq!(rel.valence, Valence::Attack);
        assert!((rel.weight - 0.7).abs() < 1e-9);

        let fixed = DialecticRelation::new("a", "b", d, Some(Valence::Support));
        assert!((fixed.weight - 0.2).abs() < 1e-9);
        assert_eq!(fixed.argmax, RelationLabel::Attack);
    }

    #[test]
    fn test_single_choice_is_certain() {
        let r = MultipleChoiceResult::from_scores(&["A".to_string()], &[0.3]).unwrap();
        assert_eq!(r.label_max, "A");
        assert!((r.max_prob() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_scores_become_uniform() {
        let choices = vec!["A".to_string(), "B".to_string()];
        let r = MultipleChoiceResult::from_scores(&choices, &[1.0]).unwrap();
        assert!((r.prob("A") - 0.5).abs() < 1e-12);
        assert_eq!(r.idx_max, 0);
    }

    proptest! {
        #[test]
        fn distribution_sums_to_one(s in 0.0f64..10.0, a in 0.0f64..10.0, n in 0.0f64..10.0) {
            let d = RelationDistribution::new(s, a, n);
            prop_assert!((d.total() - 1.0).abs() < 1e-9);
            let two = d.two_way();
            prop_assert!((two.total() - 1.0).abs() < 1e-9);
        }
    }
}
