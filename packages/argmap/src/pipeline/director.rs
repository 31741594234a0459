//! Runs a resolved plan against the backends and collects the results.
//!
//! Products are built in dependency order, each once. A stage whose backend
//! fails leaves a warning instead of a product; a later stage that needs the
//! missing product halts the run with [`ArgmapError::MissingArtifact`].

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::argmap::build_argmap;
use super::context::{Built, StageContext};
use super::export::{render_svg, to_dot};
use super::issue::build_issue;
use super::proscons::build_proscons;
use super::reasons::mine_reasons;
use super::relevance::build_relevance_network;
use super::stage::{
    ProductSpec, Registry, Stage, FUZZY_ARGMAP, ISSUE, PROSCONS, REASONS, RELEVANCE_NETWORK,
    UNPACKED_PROSCONS,
};
use super::unpack::unpack_proscons;
use crate::details::normalize_svg;
use crate::error::{ArgmapError, Result};
use crate::traits::classifier::Classifier;
use crate::traits::model::LanguageModel;
use crate::types::config::ScoreConfig;
use crate::types::state::{Artifact, ArtifactData, DebugState, Score, COMPLETION, PROMPT};

/// Analyze one prompt/completion pair.
pub async fn score(
    model: &dyn LanguageModel,
    classifier: &dyn Classifier,
    prompt: &str,
    completion: &str,
    config: &ScoreConfig,
) -> Result<DebugState> {
    score_with_cancel(
        model,
        classifier,
        prompt,
        completion,
        config,
        CancellationToken::new(),
    )
    .await
}

/// Analyze one prompt/completion pair, stopping when `cancel` fires.
pub async fn score_with_cancel(
    model: &dyn LanguageModel,
    classifier: &dyn Classifier,
    prompt: &str,
    completion: &str,
    config: &ScoreConfig,
    cancel: CancellationToken,
) -> Result<DebugState> {
    Director::new(StageContext::new(model, classifier, config))
        .run(prompt, completion, &cancel)
        .await
}

enum Product {
    Artifact(Artifact, Vec<String>),
    Score(Score),
}

/// The text the reconstruction stages read. Empty when the completion is.
fn source_text(state: &DebugState) -> String {
    let completion = state.completion().trim();
    if completion.is_empty() {
        return String::new();
    }
    let prompt = state.prompt().trim();
    if prompt.is_empty() {
        completion.to_string()
    } else {
        format!("{prompt}\n\n{completion}")
    }
}

fn require<T>(value: Option<T>, spec: &ProductSpec, required: &str) -> Result<T> {
    value.ok_or_else(|| ArgmapError::MissingArtifact {
        product: spec.key.clone(),
        required: required.to_string(),
    })
}

fn artifact(spec: &ProductSpec, built: Built<ArtifactData>) -> Product {
    let mut artifact = Artifact::new(&spec.key, &spec.description, built.value);
    artifact.metadata = built.metadata;
    Product::Artifact(artifact, built.warnings)
}

/// Executes stages of a [`Registry`] for one scoring run.
pub struct Director<'a> {
    ctx: StageContext<'a>,
    registry: Registry,
}

impl<'a> Director<'a> {
    pub fn new(ctx: StageContext<'a>) -> Self {
        Self {
            ctx,
            registry: Registry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Keys that a run with the current config builds, in order.
    pub fn plan(&self) -> Result<Vec<&ProductSpec>> {
        self.ctx.config.validate()?;
        let requested: Vec<&str> = self.ctx.config.requested().collect();
        Ok(self.registry.resolve(&requested, &[PROMPT, COMPLETION])?)
    }

    /// Build every planned product.
    ///
    /// Configuration errors are raised before any backend call. Cancellation
    /// is checked between stages and interrupts a running stage without
    /// committing its product.
    pub async fn run(
        &self,
        prompt: &str,
        completion: &str,
        cancel: &CancellationToken,
    ) -> Result<DebugState> {
        let plan = self.plan()?;
        info!(products = plan.len(), "starting analysis");

        let mut state = DebugState::new(prompt, completion);
        let mut completed: Vec<String> = Vec::new();
        for spec in plan {
            if cancel.is_cancelled() {
                warn!(completed = completed.len(), "analysis cancelled");
                return Err(ArgmapError::Cancelled { completed });
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(product = %spec.key, "analysis cancelled during stage");
                    return Err(ArgmapError::Cancelled { completed });
                }
                outcome = self.produce(spec, &state) => outcome,
            };

            match outcome {
                Ok(Product::Artifact(artifact, warnings)) => {
                    for message in warnings {
                        state.warn(&spec.key, message);
                    }
                    debug!(product = %spec.key, "artifact built");
                    state.push_artifact(artifact);
                }
                Ok(Product::Score(score)) => {
                    debug!(product = %spec.key, value = score.value, "score computed");
                    state.push_score(score);
                }
                Err(e @ ArgmapError::MissingArtifact { .. }) => return Err(e),
                Err(e) => {
                    warn!(product = %spec.key, error = %e, "stage failed");
                    state.warn(&spec.key, e.to_string());
                    continue;
                }
            }
            completed.push(spec.key.clone());
        }

        info!(
            artifacts = state.artifacts.len(),
            scores = state.scores.len(),
            warnings = state.warnings.len(),
            "analysis finished"
        );
        Ok(state)
    }

    async fn produce(&self, spec: &ProductSpec, state: &DebugState) -> Result<Product> {
        let ctx = &self.ctx;
        match spec.stage {
            Stage::Issue => {
                let built = build_issue(ctx, &source_text(state)).await?;
                Ok(artifact(spec, built.map(ArtifactData::Text)))
            }
            Stage::Reasons => {
                let issue = require(state.text(ISSUE), spec, ISSUE)?;
                let built = mine_reasons(ctx, &source_text(state), issue).await?;
                Ok(artifact(spec, built.map(ArtifactData::Claims)))
            }
            Stage::ProsCons => {
                let issue = require(state.text(ISSUE), spec, ISSUE)?;
                let reasons = require(state.claims(REASONS), spec, REASONS)?;
                let built = build_proscons(ctx, &source_text(state), issue, reasons).await?;
                Ok(artifact(spec, built.map(ArtifactData::ProsCons)))
            }
            Stage::UnpackedProsCons => {
                let issue = require(state.text(ISSUE), spec, ISSUE)?;
                let list = require(state.proscons(PROSCONS), spec, PROSCONS)?;
                let built = unpack_proscons(ctx, issue, list).await?;
                Ok(artifact(spec, built.map(ArtifactData::ProsCons)))
            }
            Stage::RelevanceNetwork => {
                let list = require(state.proscons(UNPACKED_PROSCONS), spec, UNPACKED_PROSCONS)?;
                let built = build_relevance_network(ctx, list).await?;
                Ok(artifact(spec, built.map(ArtifactData::RelevanceNetwork)))
            }
            Stage::FuzzyArgmap => {
                let network =
                    require(state.relevance_network(RELEVANCE_NETWORK), spec, RELEVANCE_NETWORK)?;
                let built = build_argmap(network, &ctx.config.argmap);
                Ok(artifact(spec, built.map(ArtifactData::ArgumentMap)))
            }
            Stage::DotArgmap => {
                let map = require(state.argument_map(FUZZY_ARGMAP), spec, FUZZY_ARGMAP)?;
                Ok(artifact(spec, Built::new(ArtifactData::Text(to_dot(map)))))
            }
            Stage::SvgArgmap => {
                let map = require(state.argument_map(FUZZY_ARGMAP), spec, FUZZY_ARGMAP)?;
                let svg = normalize_svg(&render_svg(&to_dot(map)).await?);
                Ok(artifact(spec, Built::new(ArtifactData::Text(svg))))
            }
            Stage::Metric(metric) => {
                let map = require(state.argument_map(FUZZY_ARGMAP), spec, FUZZY_ARGMAP)?;
                let score = Score::new(&spec.key, &spec.description, metric.compute(map));
                Ok(Product::Score(if map.is_empty() {
                    score.with_comment("empty argument map")
                } else {
                    score
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::testing::{MockClassifier, MockModel};

    #[tokio::test]
    async fn test_config_errors_precede_backend_calls() {
        let model = MockModel::new();
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default().with_metrics(["no_such_metric"]);

        let err = score(&model, &classifier, "Q?", "A.", &config).await.unwrap_err();
        assert!(matches!(
            err,
            ArgmapError::Config(ConfigError::UnknownProduct(_))
        ));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cyclic_registry_is_rejected() {
        let model = MockModel::new();
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default()
            .with_artifacts(["a"])
            .with_metrics(Vec::<String>::new());
        let registry = Registry::new([
            ProductSpec::new("a", "A", Stage::Issue).requires(["b"]),
            ProductSpec::new("b", "B", Stage::Reasons).requires(["a"]),
        ]);
        let director =
            Director::new(StageContext::new(&model, &classifier, &config)).with_registry(registry);

        let err = director
            .run("Q?", "A.", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ArgmapError::Config(ConfigError::CyclicRequirements(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_prerequisite_halts_with_missing_artifact() {
        // every call times out, so the issue stage fails
        let model = MockModel::new().with_failures(usize::MAX);
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default()
            .with_artifacts(["proscons"])
            .with_metrics(Vec::<String>::new())
            .with_retry(crate::types::config::RetryPolicy::immediate(1));

        let err = score(&model, &classifier, "Rent or buy?", "Buying builds equity.", &config)
            .await
            .unwrap_err();
        match err {
            ArgmapError::MissingArtifact { product, required } => {
                assert_eq!(product, "reasons");
                assert_eq!(required, "issue");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let model = MockModel::new();
        let classifier = MockClassifier::new();
        let config = ScoreConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = score_with_cancel(&model, &classifier, "Q?", "A.", &config, cancel)
            .await
            .unwrap_err();
        match err {
            ArgmapError::Cancelled { completed } => assert!(completed.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(model.calls().is_empty());
    }

    #[test]
    fn test_source_text_is_empty_without_completion() {
        assert_eq!(source_text(&DebugState::new("Q?", "  ")), "");
        assert_eq!(source_text(&DebugState::new("Q?", "A.")), "Q?\n\nA.");
        assert_eq!(source_text(&DebugState::new("", "A.")), "A.");
    }
}
