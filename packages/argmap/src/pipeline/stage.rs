//! Product registry and plan resolution.
//!
//! Every artifact and score is produced by one [`Stage`], registered under a
//! stable key together with the keys it requires. Resolution orders the
//! requested products and all their upstream requirements topologically,
//! each exactly once.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::scores;
use crate::error::ConfigError;
use crate::types::argmap::ArgumentMap;

pub const ISSUE: &str = "issue";
pub const REASONS: &str = "reasons";
pub const PROSCONS: &str = "proscons";
pub const UNPACKED_PROSCONS: &str = "unpacked_proscons";
pub const RELEVANCE_NETWORK: &str = "relevance_network";
pub const FUZZY_ARGMAP: &str = "fuzzy_argmap";
pub const DOT_ARGMAP: &str = "dot_argmap";
pub const SVG_ARGMAP: &str = "svg_argmap";

/// Metrics computed from the argument map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ArgmapSize,
    ArgmapEdgeCount,
    RootNodes,
    AvgKatzCentrality,
    AttackRatio,
    MeanRootSupport,
    MeanAbsoluteRootSupport,
    GlobalBalance,
    MeanReasonStrength,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::ArgmapSize,
        Metric::ArgmapEdgeCount,
        Metric::RootNodes,
        Metric::AvgKatzCentrality,
        Metric::AttackRatio,
        Metric::MeanRootSupport,
        Metric::MeanAbsoluteRootSupport,
        Metric::GlobalBalance,
        Metric::MeanReasonStrength,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::ArgmapSize => "argmap_size",
            Metric::ArgmapEdgeCount => "argmap_edge_count",
            Metric::RootNodes => "n_root_nodes",
            Metric::AvgKatzCentrality => "argmap_avg_katz_centrality",
            Metric::AttackRatio => "argmap_attack_ratio",
            Metric::MeanRootSupport => "mean_root_support",
            Metric::MeanAbsoluteRootSupport => "mean_absolute_root_support",
            Metric::GlobalBalance => "global_balance",
            Metric::MeanReasonStrength => "mean_reason_strength",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::ArgmapSize => "Number of nodes in the argument map",
            Metric::ArgmapEdgeCount => "Number of edges in the argument map",
            Metric::RootNodes => "Number of root claims in the argument map",
            Metric::AvgKatzCentrality => "Average Katz centrality of all nodes",
            Metric::AttackRatio => "Fraction of attack edges",
            Metric::MeanRootSupport => "Mean support of the root claims",
            Metric::MeanAbsoluteRootSupport => "Mean absolute support of the root claims",
            Metric::GlobalBalance => "Global dialectical balance",
            Metric::MeanReasonStrength => "Mean weight of the argument map's edges",
        }
    }

    pub fn compute(&self, map: &ArgumentMap) -> f64 {
        let f: fn(&ArgumentMap) -> f64 = match self {
            Metric::ArgmapSize => scores::argmap_size,
            Metric::ArgmapEdgeCount => scores::argmap_edge_count,
            Metric::RootNodes => scores::n_root_nodes,
            Metric::AvgKatzCentrality => scores::argmap_avg_katz_centrality,
            Metric::AttackRatio => scores::argmap_attack_ratio,
            Metric::MeanRootSupport => scores::mean_root_support,
            Metric::MeanAbsoluteRootSupport => scores::mean_absolute_root_support,
            Metric::GlobalBalance => scores::global_balance,
            Metric::MeanReasonStrength => scores::mean_reason_strength,
        };
        f(map)
    }
}

/// The function that builds a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Issue,
    Reasons,
    ProsCons,
    UnpackedProsCons,
    RelevanceNetwork,
    FuzzyArgmap,
    DotArgmap,
    SvgArgmap,
    Metric(Metric),
}

/// Whether a product is an artifact or a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Artifact,
    Score,
}

impl Stage {
    pub fn kind(&self) -> ProductKind {
        match self {
            Stage::Metric(_) => ProductKind::Score,
            _ => ProductKind::Artifact,
        }
    }
}

/// A registered product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSpec {
    pub key: String,
    pub description: String,
    pub requires: Vec<String>,
    pub stage: Stage,
}

impl ProductSpec {
    pub fn new(key: impl Into<String>, description: impl Into<String>, stage: Stage) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            requires: Vec::new(),
            stage,
        }
    }

    pub fn requires<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> ProductKind {
        self.stage.kind()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Lookup table of products by key.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: IndexMap<String, ProductSpec>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    /// Registry from explicit specs. A later spec replaces an earlier one with the same key.
    pub fn new(specs: impl IntoIterator<Item = ProductSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.key.clone(), s)).collect(),
        }
    }

    /// All built-in stages and metrics.
    pub fn builtin() -> Self {
        let artifacts = [
            ProductSpec::new(ISSUE, "Central issue addressed by the text", Stage::Issue),
            ProductSpec::new(REASONS, "Reasons put forward in the text", Stage::Reasons)
                .requires([ISSUE]),
            ProductSpec::new(PROSCONS, "Pros and cons list", Stage::ProsCons)
                .requires([ISSUE, REASONS]),
            ProductSpec::new(
                UNPACKED_PROSCONS,
                "Pros and cons list with compound reasons unpacked",
                Stage::UnpackedProsCons,
            )
            .requires([ISSUE, PROSCONS]),
            ProductSpec::new(
                RELEVANCE_NETWORK,
                "Weighted relations between all claims",
                Stage::RelevanceNetwork,
            )
            .requires([ISSUE, UNPACKED_PROSCONS]),
            ProductSpec::new(FUZZY_ARGMAP, "Argument map", Stage::FuzzyArgmap)
                .requires([RELEVANCE_NETWORK]),
            ProductSpec::new(DOT_ARGMAP, "Argument map as graphviz DOT", Stage::DotArgmap)
                .requires([FUZZY_ARGMAP]),
            ProductSpec::new(SVG_ARGMAP, "Argument map as SVG", Stage::SvgArgmap)
                .requires([FUZZY_ARGMAP]),
        ];
        let metrics = Metric::ALL.into_iter().map(|m| {
            ProductSpec::new(m.key(), m.description(), Stage::Metric(m)).requires([FUZZY_ARGMAP])
        });
        Self::new(artifacts.into_iter().chain(metrics))
    }

    pub fn get(&self, key: &str) -> Option<&ProductSpec> {
        self.specs.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Products to build for `requested`, requirements first.
    ///
    /// Fails before anything runs on unknown keys, keys that name an input
    /// and cyclic requirements (reported with the cycle's path).
    pub fn resolve(&self, requested: &[&str], inputs: &[&str]) -> Result<Vec<&ProductSpec>, ConfigError> {
        let mut input_ids: HashSet<&str> = HashSet::new();
        for id in inputs {
            if !input_ids.insert(*id) {
                return Err(ConfigError::DuplicateInput(id.to_string()));
            }
        }
        for key in requested {
            if input_ids.contains(key) {
                return Err(ConfigError::InputCollision(key.to_string()));
            }
            if !self.specs.contains_key(*key) {
                return Err(ConfigError::UnknownProduct(key.to_string()));
            }
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();
        let mut order: Vec<&ProductSpec> = Vec::new();
        for key in requested {
            self.visit(key, &input_ids, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        key: &str,
        inputs: &HashSet<&str>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a ProductSpec>,
    ) -> Result<(), ConfigError> {
        match marks.get(key) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|k| *k == key).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|k| k.to_string()).collect();
                cycle.push(key.to_string());
                return Err(ConfigError::CyclicRequirements(cycle));
            }
            None => {}
        }
        let spec = self
            .specs
            .get(key)
            .ok_or_else(|| ConfigError::UnknownProduct(key.to_string()))?;
        if inputs.contains(spec.key.as_str()) {
            return Err(ConfigError::InputCollision(spec.key.clone()));
        }

        marks.insert(&spec.key, Mark::Visiting);
        path.push(&spec.key);
        for required in &spec.requires {
            if inputs.contains(required.as_str()) {
                continue;
            }
            self.visit(required, inputs, marks, path, order)?;
        }
        path.pop();
        marks.insert(&spec.key, Mark::Done);
        order.push(spec);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUTS: [&str; 2] = ["prompt", "completion"];

    fn keys(plan: &[&ProductSpec]) -> Vec<String> {
        plan.iter().map(|s| s.key.clone()).collect()
    }

    #[test]
    fn test_requirements_come_first_and_once() {
        let registry = Registry::builtin();
        let plan = registry
            .resolve(&["argmap_size", "proscons", "argmap_attack_ratio"], &INPUTS)
            .unwrap();
        assert_eq!(
            keys(&plan),
            vec![
                "issue",
                "reasons",
                "proscons",
                "unpacked_proscons",
                "relevance_network",
                "fuzzy_argmap",
                "argmap_size",
                "argmap_attack_ratio",
            ]
        );
        assert_eq!(plan[6].kind(), ProductKind::Score);
    }

    #[test]
    fn test_unknown_and_input_keys_are_rejected() {
        let registry = Registry::builtin();
        assert!(matches!(
            registry.resolve(&["no_such_metric"], &INPUTS),
            Err(ConfigError::UnknownProduct(k)) if k == "no_such_metric"
        ));
        assert!(matches!(
            registry.resolve(&["completion"], &INPUTS),
            Err(ConfigError::InputCollision(_))
        ));
        assert!(matches!(
            registry.resolve(&["issue"], &["prompt", "prompt"]),
            Err(ConfigError::DuplicateInput(_))
        ));
    }

    #[test]
    fn test_cycle_is_reported_with_path() {
        let registry = Registry::new([
            ProductSpec::new("a", "A", Stage::Issue).requires(["b"]),
            ProductSpec::new("b", "B", Stage::Reasons).requires(["c", "prompt"]),
            ProductSpec::new("c", "C", Stage::ProsCons).requires(["a"]),
        ]);
        let err = registry.resolve(&["a"], &INPUTS).unwrap_err();
        match err {
            ConfigError::CyclicRequirements(path) => assert_eq!(path, vec!["a", "b", "c", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_requirement_is_rejected() {
        let registry = Registry::new([ProductSpec::new("a", "A", Stage::Issue).requires(["missing"])]);
        assert!(matches!(
            registry.resolve(&["a"], &INPUTS),
            Err(ConfigError::UnknownProduct(k)) if k == "missing"
        ));
    }

    #[test]
    fn test_every_metric_is_registered() {
        let registry = Registry::builtin();
        for metric in Metric::ALL {
            let spec = registry.get(metric.key()).unwrap();
            assert_eq!(spec.requires, vec![FUZZY_ARGMAP]);
        }
    }
}
