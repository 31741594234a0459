//! Claims, root claims and pros/cons lists.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single labelled assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Claim {
    /// Short identifier, unique within one analysis
    pub label: String,

    /// Natural-language statement
    pub text: String,
}

impl Claim {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Dialectic valence of a reason towards a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Valence {
    Support,
    Attack,
}

impl Valence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Valence::Support => "support",
            Valence::Attack => "attack",
        }
    }
}

/// One candidate answer together with the reasons bearing on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootClaim {
    pub label: String,
    pub text: String,
    #[serde(default)]
    pub pros: Vec<Claim>,
    #[serde(default)]
    pub cons: Vec<Claim>,
}

impl RootClaim {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            pros: Vec::new(),
            cons: Vec::new(),
        }
    }

    pub fn with_pro(mut self, claim: Claim) -> Self {
        self.pros.push(claim);
        self
    }

    pub fn with_con(mut self, claim: Claim) -> Self {
        self.cons.push(claim);
        self
    }

    /// The root as a plain claim.
    pub fn as_claim(&self) -> Claim {
        Claim::new(self.label.clone(), self.text.clone())
    }

    /// Pros followed by cons, with their valence.
    pub fn reasons(&self) -> impl Iterator<Item = (Valence, &Claim)> {
        self.pros
            .iter()
            .map(|c| (Valence::Support, c))
            .chain(self.cons.iter().map(|c| (Valence::Attack, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.pros.is_empty() && self.cons.is_empty()
    }
}

/// A forest of root claims with attached pros and cons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProsConsList {
    pub roots: Vec<RootClaim>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl ProsConsList {
    pub fn new(roots: Vec<RootClaim>) -> Self {
        Self {
            roots,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// All reasons as `(root index, valence, claim)` in list order.
    pub fn reasons(&self) -> impl Iterator<Item = (usize, Valence, &Claim)> {
        self.roots
            .iter()
            .enumerate()
            .flat_map(|(i, root)| root.reasons().map(move |(v, c)| (i, v, c)))
    }

    /// Number of reason slots (a reason listed twice counts twice).
    pub fn reason_count(&self) -> usize {
        self.roots.iter().map(|r| r.pros.len() + r.cons.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `label` appears as a pro or con anywhere.
    pub fn contains_reason(&self, label: &str) -> bool {
        self.reasons().any(|(_, _, c)| c.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_iterate_pros_then_cons_per_root() {
        let list = ProsConsList::new(vec![
            RootClaim::new("R1", "Do it.")
                .with_pro(Claim::new("A", "a."))
                .with_con(Claim::new("B", "b.")),
            RootClaim::new("R2", "Don't.").with_pro(Claim::new("C", "c.")),
        ]);

        let seen: Vec<_> = list
            .reasons()
            .map(|(i, v, c)| (i, v, c.label.as_str()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (0, Valence::Support, "A"),
                (0, Valence::Attack, "B"),
                (1, Valence::Support, "C"),
            ]
        );
        assert_eq!(list.reason_count(), 3);
        assert!(list.contains_reason("C"));
        assert!(!list.contains_reason("R1"));
    }
}
