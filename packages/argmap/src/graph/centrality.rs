//! Katz centrality by power iteration.

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

/// Parameters of the Katz iteration.
#[derive(Debug, Clone, Copy)]
pub struct KatzParams {
    pub alpha: f64,
    pub beta: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for KatzParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            beta: 1.0,
            max_iter: 1000,
            tol: 1.0e-6,
        }
    }
}

/// Katz centrality of every node (unweighted, in-edges, L2-normalized).
///
/// Returns `None` if the iteration does not converge within `max_iter`.
pub fn katz_centrality<N, E>(graph: &DiGraph<N, E>, params: &KatzParams) -> Option<Vec<f64>> {
    let n = graph.node_count();
    if n == 0 {
        return Some(Vec::new());
    }

    let mut x = vec![0.0; n];
    for _ in 0..params.max_iter {
        let last = x.clone();
        let mut next = vec![0.0; n];
        for edge in graph.edge_references() {
            next[edge.target().index()] += last[edge.source().index()];
        }
        for v in next.iter_mut() {
            *v = params.alpha * *v + params.beta;
        }
        x = next;

        let err: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if err < n as f64 * params.tol {
            let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            let scale = if norm > 0.0 { 1.0 / norm } else { 1.0 };
            return Some(x.into_iter().map(|v| v * scale).collect());
        }
    }
    None
}
