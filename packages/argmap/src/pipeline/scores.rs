//! Metrics over the final argument map.
//!
//! Every metric is a pure function of the map and yields `0.0` for an empty map.

use crate::graph::{balance_scores, katz_centrality, KatzParams};
use crate::types::argmap::ArgumentMap;
use crate::types::claim::Valence;

/// Number of nodes.
pub fn argmap_size(map: &ArgumentMap) -> f64 {
    map.nodes.len() as f64
}

pub fn argmap_edge_count(map: &ArgumentMap) -> f64 {
    map.edges.len() as f64
}

pub fn n_root_nodes(map: &ArgumentMap) -> f64 {
    map.roots().count() as f64
}

/// Mean Katz centrality of all nodes. `0.0` if the iteration diverges.
pub fn argmap_avg_katz_centrality(map: &ArgumentMap) -> f64 {
    if map.is_empty() {
        return 0.0;
    }
    let (graph, _) = map.to_graph();
    match katz_centrality(&graph, &KatzParams::default()) {
        Some(values) if !values.is_empty() => values.iter().sum::<f64>() / values.len() as f64,
        _ => 0.0,
    }
}

/// Fraction of edges with attack valence.
pub fn argmap_attack_ratio(map: &ArgumentMap) -> f64 {
    if map.edges.is_empty() {
        return 0.0;
    }
    let attacks = map
        .edges
        .iter()
        .filter(|e| e.valence == Valence::Attack)
        .count();
    attacks as f64 / map.edges.len() as f64
}

pub fn mean_root_support(map: &ArgumentMap) -> f64 {
    balance_scores(map).mean_root_support
}

pub fn mean_absolute_root_support(map: &ArgumentMap) -> f64 {
    balance_scores(map).mean_absolute_root_support
}

pub fn global_balance(map: &ArgumentMap) -> f64 {
    balance_scores(map).global_balance
}

/// Mean edge weight.
pub fn mean_reason_strength(map: &ArgumentMap) -> f64 {
    if map.edges.is_empty() {
        return 0.0;
    }
    map.edges.iter().map(|e| e.weight).sum::<f64>() / map.edges.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::argmap::{ArgMapEdge, ArgMapNode, NodeRole};

    fn map() -> ArgumentMap {
        ArgumentMap {
            nodes: vec![
                ArgMapNode::new("R", "Buy a flat.", NodeRole::Root),
                ArgMapNode::new("A", "Equity.", NodeRole::Reason),
                ArgMapNode::new("B", "Prices rise.", NodeRole::Reason),
                ArgMapNode::new("C", "Risky.", NodeRole::Reason),
            ],
            edges: vec![
                ArgMapEdge::new("A", "R", Valence::Support, 0.9),
                ArgMapEdge::new("B", "R", Valence::Support, 0.7),
                ArgMapEdge::new("C", "R", Valence::Attack, 0.8),
            ],
        }
    }

    #[test]
    fn test_counts_and_ratios() {
        let map = map();
        assert_eq!(argmap_size(&map), 4.0);
        assert_eq!(argmap_edge_count(&map), 3.0);
        assert_eq!(n_root_nodes(&map), 1.0);
        assert!((argmap_attack_ratio(&map) - 1.0 / 3.0).abs() < 1e-12);
        assert!((mean_reason_strength(&map) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_centrality_and_balance() {
        let map = map();
        let katz = argmap_avg_katz_centrality(&map);
        assert!(katz > 0.0 && katz < 1.0);
        // (0.9 + 0.7 - 0.8) / 3
        assert!((mean_root_support(&map) - 0.8 / 3.0).abs() < 1e-12);
        assert!(global_balance(&map) >= 0.0);
    }

    #[test]
    fn test_empty_map_is_neutral() {
        let empty = ArgumentMap::default();
        for metric in [
            argmap_size,
            argmap_edge_count,
            n_root_nodes,
            argmap_avg_katz_centrality,
            argmap_attack_ratio,
            mean_root_support,
            mean_absolute_root_support,
            global_balance,
            mean_reason_strength,
        ] {
            assert_eq!(metric(&empty), 0.0);
        }
    }
}
