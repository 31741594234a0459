//! Dialectic relation engine.
//!
//! Computes support/attack/neutral distributions between claims and
//! multiple-choice "most (dis)confirmed" queries with a zero-shot NLI
//! classifier. Premises are sent in batches with bounded concurrency; results
//! are reassembled in input order.

pub mod templates;

use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{ArgmapError, BackendError, Result};
use crate::retry::with_retry;
use crate::traits::classifier::{Classification, ClassificationRequest, Classifier};
use crate::types::claim::Claim;
use crate::types::config::{RelationConfig, RetryPolicy};
use crate::types::relation::{MultipleChoiceResult, RelationDistribution, RelationLabel};

use templates::{
    choice_premise, dialectic_premise, verbalize, DIALECTIC_HYPOTHESIS,
    MOST_CONFIRMED_HYPOTHESIS, MOST_DISCONFIRMED_HYPOTHESIS,
};

/// Classifier-backed relation queries.
pub struct RelationEngine<'a> {
    classifier: &'a dyn Classifier,
    config: &'a RelationConfig,
    retry: &'a RetryPolicy,
}

impl<'a> RelationEngine<'a> {
    pub fn new(
        classifier: &'a dyn Classifier,
        config: &'a RelationConfig,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            classifier,
            config,
            retry,
        }
    }

    pub fn config(&self) -> &RelationConfig {
        self.config
    }

    /// Classify premises in order-preserving batches.
    ///
    /// Invalid per-premise results come back as `None`.
    async fn classify_all(
        &self,
        premises: Vec<String>,
        template: &str,
        labels: &[String],
    ) -> Result<Vec<Option<Classification>>> {
        if premises.is_empty() {
            return Ok(Vec::new());
        }
        let requests: Vec<ClassificationRequest> = premises
            .chunks(self.config.batch_size.max(1))
            .map(|chunk| ClassificationRequest::new(chunk.to_vec(), template, labels.to_vec()))
            .collect();

        debug!(
            premises = premises.len(),
            batches = requests.len(),
            template,
            "classifying"
        );

        let batches: Vec<Vec<Option<Classification>>> = stream::iter(requests.iter())
            .map(|request| async move {
                let results =
                    with_retry(self.retry, "classify", || self.classifier.classify(request)).await?;
                if results.len() != request.premises.len() {
                    return Err(BackendError::InvalidResponse(format!(
                        "expected {} classifications, got {}",
                        request.premises.len(),
                        results.len()
                    ))
                    .into());
                }
                Ok::<_, ArgmapError>(
                    results
                        .into_iter()
                        .map(|r| r.filter(|c| c.is_valid_for(request)))
                        .collect::<Vec<_>>(),
                )
            })
            .buffered(self.config.max_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    fn relation_labels(&self) -> Vec<RelationLabel> {
        if self.config.two_way {
            vec![RelationLabel::Support, RelationLabel::Attack]
        } else {
            RelationLabel::ALL.to_vec()
        }
    }

    /// Distributions for `(reason, claim)` text pairs, in input order.
    pub async fn dialectic_relations(&self, pairs: &[(&str, &str)]) -> Result<Vec<RelationDistribution>> {
        let labels = self.relation_labels();
        let verbalized: Vec<String> = labels.iter().map(|l| verbalize(*l).to_string()).collect();
        let premises = pairs
            .iter()
            .map(|(reason, claim)| dialectic_premise(reason, claim))
            .collect();

        let results = self
            .classify_all(premises, DIALECTIC_HYPOTHESIS, &verbalized)
            .await?;

        let distributions = results
            .into_iter()
            .map(|result| {
                let dist = match result {
                    Some(c) => {
                        let score = |label: RelationLabel| {
                            labels
                                .iter()
                                .position(|l| *l == label)
                                .map(|i| c.scores[i])
                                .unwrap_or(0.0)
                        };
                        RelationDistribution::new(
                            score(RelationLabel::Support),
                            score(RelationLabel::Attack),
                            score(RelationLabel::Neutral),
                        )
                    }
                    None => {
                        warn!("invalid classifier result, defaulting to neutral");
                        RelationDistribution::neutral()
                    }
                };
                if self.config.two_way {
                    dist.two_way()
                } else {
                    dist
                }
            })
            .collect();
        Ok(distributions)
    }

    /// Distribution for a single reason/claim pair.
    pub async fn relation(&self, reason: &Claim, claim: &Claim) -> Result<RelationDistribution> {
        let mut out = self
            .dialectic_relations(&[(reason.text.as_str(), claim.text.as_str())])
            .await?;
        Ok(out.pop().unwrap_or_else(RelationDistribution::neutral))
    }

    /// Per reason, which candidate claim it confirms most strongly.
    ///
    /// `None` for an empty candidate set.
    pub async fn most_confirmed(
        &self,
        queries: &[(&Claim, &[Claim])],
    ) -> Result<Vec<Option<MultipleChoiceResult>>> {
        self.most_relevant(queries, MOST_CONFIRMED_HYPOTHESIS).await
    }

    /// Per reason, which candidate claim it disconfirms most strongly.
    pub async fn most_disconfirmed(
        &self,
        queries: &[(&Claim, &[Claim])],
    ) -> Result<Vec<Option<MultipleChoiceResult>>> {
        self.most_relevant(queries, MOST_DISCONFIRMED_HYPOTHESIS).await
    }

    async fn most_relevant(
        &self,
        queries: &[(&Claim, &[Claim])],
        template: &str,
    ) -> Result<Vec<Option<MultipleChoiceResult>>> {
        let max_claims = self.config.max_claims_per_choice.max(1);
        let mut results: Vec<Option<MultipleChoiceResult>> = vec![None; queries.len()];

        // queries with identical candidate labels share one hypothesis set
        let mut groups: IndexMap<Vec<String>, Vec<usize>> = IndexMap::new();
        for (i, (_, claims)) in queries.iter().enumerate() {
            let claims = &claims[..claims.len().min(max_claims)];
            let labels: Vec<String> = claims.iter().map(|c| c.label.clone()).collect();
            match labels.len() {
                0 => {}
                1 => results[i] = MultipleChoiceResult::from_scores(&labels, &[1.0]),
                _ => groups.entry(labels).or_default().push(i),
            }
        }

        for (labels, indices) in groups {
            let premises = indices
                .iter()
                .map(|&i| {
                    let (reason, claims) = queries[i];
                    choice_premise(&reason.text, &claims[..labels.len()])
                })
                .collect();
            let classified = self.classify_all(premises, template, &labels).await?;
            for (&i, result) in indices.iter().zip(classified) {
                results[i] = match result {
                    Some(c) => MultipleChoiceResult::from_scores(&labels, &c.scores),
                    None => {
                        warn!(reason = %queries[i].0.label, "invalid classifier result, using uniform choice");
                        MultipleChoiceResult::uniform(&labels)
                    }
                };
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClassifier;

    fn engine<'a>(
        classifier: &'a MockClassifier,
        config: &'a RelationConfig,
        retry: &'a RetryPolicy,
    ) -> RelationEngine<'a> {
        RelationEngine::new(classifier, config, retry)
    }

    #[tokio::test]
    async fn test_most_confirmed_picks_favored_claim() {
        let classifier = MockClassifier::new()
            .with_score("", "claim [Q] is most strongly confirmed", 0.9)
            .with_score("", "claim [P] is most strongly confirmed", 0.1);
        let config = RelationConfig::default();
        let retry = RetryPolicy::immediate(1);

        let x = Claim::new("X", "Prices will rise.");
        let candidates = vec![Claim::new("P", "Buy now."), Claim::new("Q", "Sell now.")];
        let results = engine(&classifier, &config, &retry)
            .most_confirmed(&[(&x, candidates.as_slice())])
            .await
            .unwrap();

        let result = results[0].as_ref().unwrap();
        assert_eq!(result.label_max, "Q");
        assert!(result.max_prob() > 0.5);
    }

    #[tokio::test]
    async fn test_single_and_empty_choice_sets() {
        let classifier = MockClassifier::new();
        let config = RelationConfig::default();
        let retry = RetryPolicy::immediate(1);

        let x = Claim::new("X", "x.");
        let one = vec![Claim::new("P", "p.")];
        let none: Vec<Claim> = vec![];
        let results = engine(&classifier, &config, &retry)
            .most_disconfirmed(&[(&x, one.as_slice()), (&x, none.as_slice())])
            .await
            .unwrap();

        assert_eq!(results[0].as_ref().unwrap().prob("P"), 1.0);
        assert!(results[1].is_none());
        assert!(classifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batches_preserve_input_order() {
        let classifier = MockClassifier::new()
            .with_score("Reason: r0", "directly confirmed", 0.9)
            .with_score("Reason: r3", "directly disconfirmed", 0.9);
        let config = RelationConfig::default()
            .with_batch_size(2)
            .with_max_concurrency(3);
        let retry = RetryPolicy::immediate(1);

        let reasons: Vec<String> = (0..5).map(|i| format!("r{i}")).collect();
        let pairs: Vec<(&str, &str)> = reasons.iter().map(|r| (r.as_str(), "c")).collect();
        let dists = engine(&classifier, &config, &retry)
            .dialectic_relations(&pairs)
            .await
            .unwrap();

        assert_eq!(dists.len(), 5);
        assert_eq!(dists[0].argmax(), RelationLabel::Support);
        assert_eq!(dists[3].argmax(), RelationLabel::Attack);
        for d in &dists {
            assert!((d.total() - 1.0).abs() < 1e-9);
        }
        assert_eq!(classifier.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_results_default_to_neutral() {
        let classifier = MockClassifier::new().with_invalid("Reason: broken");
        let config = RelationConfig::default();
        let retry = RetryPolicy::immediate(1);

        let dists = engine(&classifier, &config, &retry)
            .dialectic_relations(&[("broken", "c")])
            .await
            .unwrap();
        assert_eq!(dists[0], RelationDistribution::neutral());

        let config = RelationConfig::default().with_two_way(true);
        let dists = engine(&classifier, &config, &retry)
            .dialectic_relations(&[("broken", "c")])
            .await
            .unwrap();
        assert_eq!(dists[0].neutral, 0.0);
        assert!((dists[0].support - 0.5).abs() < 1e-12);
    }
}
