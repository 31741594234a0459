//! Label uniqueness enforcement.

use std::collections::HashSet;

use crate::types::claim::Claim;

/// Make claim labels pairwise unique, preserving order.
///
/// Empty labels become `Reason-{n}` (1-based position). A repeated label
/// gets the smallest `-{n}` suffix (n >= 2) not used yet.
pub fn ensure_unique_labels(claims: Vec<Claim>) -> Vec<Claim> {
    let mut taken = HashSet::with_capacity(claims.len());
    ensure_unique_labels_in(claims, &mut taken)
}

/// Like [`ensure_unique_labels`], but also avoids every label in `taken`.
///
/// New labels are added to `taken`.
pub fn ensure_unique_labels_in(claims: Vec<Claim>, taken: &mut HashSet<String>) -> Vec<Claim> {
    claims
        .into_iter()
        .enumerate()
        .map(|(i, mut claim)| {
            let base = match claim.label.trim() {
                "" => format!("Reason-{}", i + 1),
                label => label.to_string(),
            };
            let mut label = base.clone();
            let mut n = 2;
            while taken.contains(&label) {
                label = format!("{base}-{n}");
                n += 1;
            }
            taken.insert(label.clone());
            claim.label = label;
            claim
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_duplicates_get_suffixes() {
        let claims = vec![
            Claim::new("Cost", "a."),
            Claim::new("Cost", "b."),
            Claim::new("", "c."),
            Claim::new("Cost-2", "d."),
        ];
        let labels: Vec<_> = ensure_unique_labels(claims)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["Cost", "Cost-2", "Reason-3", "Cost-2-2"]);
    }

    #[test]
    fn test_taken_labels_are_avoided() {
        let mut taken: HashSet<String> = ["Root".to_string()].into_iter().collect();
        let out = ensure_unique_labels_in(vec![Claim::new("Root", "r.")], &mut taken);
        assert_eq!(out[0].label, "Root-2");
        assert!(taken.contains("Root-2"));
    }

    proptest! {
        #[test]
        fn labels_are_pairwise_unique(raw in proptest::collection::vec("[ab]{0,2}(-2)?", 0..30)) {
            let claims: Vec<Claim> = raw.iter().map(|l| Claim::new(l.clone(), "t")).collect();
            let out = ensure_unique_labels(claims);
            prop_assert_eq!(out.len(), raw.len());
            let unique: HashSet<_> = out.iter().map(|c| c.label.clone()).collect();
            prop_assert_eq!(unique.len(), out.len());
        }
    }
}
