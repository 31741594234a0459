//! Relevance networks and argument maps.

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::claim::Valence;
use super::relation::DialecticRelation;

/// Role of a claim in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Root claim (candidate answer to the issue)
    Root,
    /// Pro or con reason
    Reason,
}

/// A claim as a graph node. `id` is the claim label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgMapNode {
    pub id: String,
    pub text: String,
    pub role: NodeRole,
}

impl ArgMapNode {
    pub fn new(id: impl Into<String>, text: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            role,
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == NodeRole::Root
    }
}

/// A weighted support/attack edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgMapEdge {
    pub source: String,
    pub target: String,
    pub valence: Valence,
    pub weight: f64,

    /// Part of the maximum branching
    #[serde(default)]
    pub in_forest: bool,
}

impl ArgMapEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        valence: Valence,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            valence,
            weight,
            in_forest: false,
        }
    }

    pub fn in_forest(mut self, in_forest: bool) -> Self {
        self.in_forest = in_forest;
        self
    }
}

/// Dense weighted relation graph over roots and reasons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceNetwork {
    pub nodes: Vec<ArgMapNode>,
    pub relations: Vec<DialecticRelation>,
}

impl RelevanceNetwork {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ArgMapNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Sparse argument map: maximum branching plus strong secondary edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentMap {
    pub nodes: Vec<ArgMapNode>,
    pub edges: Vec<ArgMapEdge>,
}

impl ArgumentMap {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ArgMapNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &ArgMapNode> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.edges.iter().filter(|e| e.source == id).count()
    }

    /// Convert into a petgraph `DiGraph`. Edges with unknown endpoints are skipped.
    pub fn to_graph(&self) -> (DiGraph<ArgMapNode, ArgMapEdge>, HashMap<String, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut index = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let ix = graph.add_node(node.clone());
            index.insert(node.id.clone(), ix);
        }
        for edge in &self.edges {
            if let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) {
                graph.add_edge(s, t, edge.clone());
            }
        }
        (graph, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_graph_skips_dangling_edges() {
        let map = ArgumentMap {
            nodes: vec![
                ArgMapNode::new("R", "root", NodeRole::Root),
                ArgMapNode::new("A", "a", NodeRole::Reason),
            ],
            edges: vec![
                ArgMapEdge::new("A", "R", Valence::Support, 0.9),
                ArgMapEdge::new("B", "R", Valence::Attack, 0.8),
            ],
        };
        let (graph, index) = map.to_graph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(index["A"], index["R"]));
        assert_eq!(map.out_degree("A"), 1);
    }
}
