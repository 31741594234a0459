//! Reduction of a relevance network to a sparse argument map.
//!
//! 1. Reverse all relations and add a pseudo super-root with weight-1 edges
//!    to every root claim and weight-0 edges to every reason.
//! 2. Take the maximum spanning arborescence from the super-root and drop
//!    the pseudo edges: every reason keeps its strongest chain to a root.
//! 3. Join trees that the branching left apart with their strongest relation,
//!    so the map stays weakly connected when the network is.
//! 4. Add the remaining relations whose weight exceeds the threshold of their
//!    valence, bounded by a maximum out-degree.

use std::collections::HashMap;
use tracing::{debug, info};

use super::context::Built;
use crate::graph::branching::{maximum_arborescence, WeightedEdge};
use crate::types::argmap::{ArgMapEdge, ArgMapNode, ArgumentMap, NodeRole, RelevanceNetwork};
use crate::types::claim::Valence;
use crate::types::config::ArgmapConfig;
use crate::types::relation::DialecticRelation;

const ROOT_PSEUDO_WEIGHT: f64 = 1.0;
const REASON_PSEUDO_WEIGHT: f64 = 0.0;

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns false if `a` and `b` were already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Retention thresholds for secondary edges, per valence.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EdgeThresholds {
    pub support: Option<f64>,
    pub attack: Option<f64>,
}

impl EdgeThresholds {
    /// A fixed threshold, or the median weight of the spanning edges of each
    /// valence (`None` where the spanning structure has no such edge).
    pub fn new(fixed: Option<f64>, spanning: &[ArgMapEdge]) -> Self {
        if let Some(t) = fixed {
            return Self {
                support: Some(t),
                attack: Some(t),
            };
        }
        let weights = |valence: Valence| -> Vec<f64> {
            spanning
                .iter()
                .filter(|e| e.valence == valence)
                .map(|e| e.weight)
                .collect()
        };
        Self {
            support: median(&mut weights(Valence::Support)),
            attack: median(&mut weights(Valence::Attack)),
        }
    }

    pub fn for_valence(&self, valence: Valence) -> Option<f64> {
        match valence {
            Valence::Support => self.support,
            Valence::Attack => self.attack,
        }
    }
}

fn edge_from(relation: &DialecticRelation, in_forest: bool) -> ArgMapEdge {
    ArgMapEdge::new(
        &relation.source,
        &relation.target,
        relation.valence,
        relation.weight,
    )
    .in_forest(in_forest)
}

/// Relations with both endpoints in `index`, no self-loops, finite weight.
fn usable<'a>(
    network: &'a RelevanceNetwork,
    index: &HashMap<&str, usize>,
) -> Vec<(usize, usize, &'a DialecticRelation)> {
    network
        .relations
        .iter()
        .filter(|r| r.weight.is_finite() && r.source != r.target)
        .filter_map(|r| {
            let s = *index.get(r.source.as_str())?;
            let t = *index.get(r.target.as_str())?;
            Some((s, t, r))
        })
        .collect()
}

/// Relation indices by descending weight, ties in network order.
fn by_weight(relations: &[(usize, usize, &DialecticRelation)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..relations.len()).collect();
    order.sort_by(|a, b| relations[*b].2.weight.total_cmp(&relations[*a].2.weight));
    order
}

/// Build the argument map of `network`.
pub fn build_argmap(network: &RelevanceNetwork, config: &ArgmapConfig) -> Built<ArgumentMap> {
    if network.is_empty() {
        return Built::new(ArgumentMap::default()).with_warning("empty relevance network");
    }

    let nodes: Vec<ArgMapNode> = network.nodes.clone();
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let relations = usable(network, &index);
    let n = nodes.len();
    let super_root = n;

    // reversed relations first so that real edges win ties against pseudo edges
    let mut candidates: Vec<WeightedEdge> = relations
        .iter()
        .map(|(s, t, r)| WeightedEdge::new(*t, *s, r.weight))
        .collect();
    candidates.extend(nodes.iter().enumerate().map(|(i, node)| {
        let weight = match node.role {
            NodeRole::Root => ROOT_PSEUDO_WEIGHT,
            NodeRole::Reason => REASON_PSEUDO_WEIGHT,
        };
        WeightedEdge::new(super_root, i, weight)
    }));

    let mut in_map = vec![false; relations.len()];
    let mut components = UnionFind::new(n);
    let mut edges: Vec<ArgMapEdge> = Vec::new();
    for i in maximum_arborescence(n + 1, super_root, &candidates) {
        if i >= relations.len() {
            continue;
        }
        let (s, t, relation) = relations[i];
        in_map[i] = true;
        components.union(s, t);
        edges.push(edge_from(relation, true));
    }
    let branching = edges.len();

    let order = by_weight(&relations);
    for &i in &order {
        let (s, t, relation) = relations[i];
        if !in_map[i] && components.union(s, t) {
            in_map[i] = true;
            edges.push(edge_from(relation, true));
        }
    }
    let connectors = edges.len() - branching;

    let thresholds = EdgeThresholds::new(config.edge_threshold, &edges);
    debug!(?thresholds, branching, connectors, "spanning structure");

    let mut map = ArgumentMap { nodes, edges };
    let mut extras = 0;
    for &i in &order {
        let (_, _, relation) = relations[i];
        if in_map[i] {
            continue;
        }
        let Some(threshold) = thresholds.for_valence(relation.valence) else {
            continue;
        };
        if relation.weight <= threshold
            || map.has_edge(&relation.source, &relation.target)
            || map.has_edge(&relation.target, &relation.source)
            || map.out_degree(&relation.source) >= config.max_out_degree
        {
            continue;
        }
        map.edges.push(edge_from(relation, false));
        extras += 1;
    }

    info!(
        nodes = map.nodes.len(),
        edges = map.edges.len(),
        extras,
        "argument map built"
    );
    let mut built = Built::new(map);
    built.set_metadata("thresholds", serde_json::json!(thresholds));
    built.set_metadata("edges_added", serde_json::json!(extras));
    built
}
