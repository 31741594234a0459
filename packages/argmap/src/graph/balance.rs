//! Dialectical balance of an argument map.
//!
//! The mean reason strength `MRS(n, t)` of node `n` for root `t` is the mean,
//! over all simple paths from `n` to `t`, of the product of signed edge
//! weights along the path (attack edges count negative).

use petgraph::algo::all_simple_paths;
use petgraph::graph::NodeIndex;

use crate::types::argmap::ArgumentMap;
use crate::types::claim::Valence;

/// Root-support and balance scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BalanceScores {
    /// Mean over roots of the mean MRS towards that root
    pub mean_root_support: f64,

    /// Same, with absolute per-root values
    pub mean_absolute_root_support: f64,

    /// Mean absolute per-root support after imputing missing MRS values
    pub global_balance: f64,
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// MRS table indexed `[root][reason]`, `None` where no path exists.
pub fn mean_reason_strengths(map: &ArgumentMap) -> (Vec<String>, Vec<String>, Vec<Vec<Option<f64>>>) {
    let (graph, index) = map.to_graph();
    let roots: Vec<&str> = map.roots().map(|n| n.id.as_str()).collect();
    let reasons: Vec<&str> = map
        .nodes
        .iter()
        .filter(|n| !n.is_root())
        .map(|n| n.id.as_str())
        .collect();

    let signed = |a: NodeIndex, b: NodeIndex| -> f64 {
        graph
            .find_edge(a, b)
            .map(|e| {
                let edge = &graph[e];
                match edge.valence {
                    Valence::Support => edge.weight,
                    Valence::Attack => -edge.weight,
                }
            })
            .unwrap_or(0.0)
    };

    let table = roots
        .iter()
        .map(|t| {
            reasons
                .iter()
                .map(|n| {
                    let products: Vec<f64> =
                        all_simple_paths::<Vec<NodeIndex>, _>(&graph, index[*n], index[*t], 0, None)
                            .map(|path| path.windows(2).map(|w| signed(w[0], w[1])).product())
                            .collect();
                    mean(&products)
                })
                .collect()
        })
        .collect();

    (
        roots.into_iter().map(str::to_string).collect(),
        reasons.into_iter().map(str::to_string).collect(),
        table,
    )
}

/// Balance scores; all zero for maps without roots or reasons.
pub fn balance_scores(map: &ArgumentMap) -> BalanceScores {
    let (roots, reasons, mrs) = mean_reason_strengths(map);
    if roots.is_empty() || reasons.is_empty() {
        return BalanceScores::default();
    }

    let root_support: Vec<f64> = mrs
        .iter()
        .filter_map(|row| mean(&row.iter().flatten().copied().collect::<Vec<_>>()))
        .collect();
    let mean_root_support = mean(&root_support).unwrap_or(0.0);
    let mean_absolute_root_support =
        mean(&root_support.iter().map(|v| v.abs()).collect::<Vec<_>>()).unwrap_or(0.0);

    // per reason: its MRS values at the roots it reaches
    let per_reason: Vec<Vec<f64>> = (0..reasons.len())
        .map(|n| mrs.iter().filter_map(|row| row[n]).collect())
        .collect();

    let per_root_balance: Vec<f64> = mrs
        .iter()
        .map(|row| {
            let imputed: Vec<f64> = row
                .iter()
                .enumerate()
                .map(|(n, value)| match value {
                    Some(v) => *v,
                    None => mean(&per_reason[n])
                        .map(|m| -m / per_reason[n].len() as f64)
                        .unwrap_or(0.0),
                })
                .collect();
            mean(&imputed).unwrap_or(0.0).abs()
        })
        .collect();

    BalanceScores {
        mean_root_support,
        mean_absolute_root_support,
        global_balance: mean(&per_root_balance).unwrap_or(0.0),
    }
}
