//! Maximum spanning arborescence (Chu-Liu/Edmonds).

/// A weighted directed edge between node indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

impl WeightedEdge {
    pub fn new(source: usize, target: usize, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }
}

const UNSET: usize = usize::MAX;

/// Maximum-weight spanning arborescence rooted at `root`.
///
/// Returns indices into `edges`, sorted ascending. Nodes unreachable from
/// `root` stay without parent. Among equal-weight candidates the edge that
/// comes first in `edges` wins.
pub fn maximum_arborescence(node_count: usize, root: usize, edges: &[WeightedEdge]) -> Vec<usize> {
    if root >= node_count {
        return Vec::new();
    }
    let mut chosen = solve(node_count, root, edges);
    chosen.sort_unstable();
    chosen
}

fn solve(n: usize, root: usize, edges: &[WeightedEdge]) -> Vec<usize> {
    // best incoming edge per node
    let mut best: Vec<Option<usize>> = vec![None; n];
    for (i, e) in edges.iter().enumerate() {
        if e.target == root || e.source == e.target || e.target >= n || e.source >= n {
            continue;
        }
        match best[e.target] {
            Some(b) if edges[b].weight >= e.weight => {}
            _ => best[e.target] = Some(i),
        }
    }

    // find cycles among chosen parents
    let mut comp = vec![UNSET; n];
    let mut visit = vec![UNSET; n];
    let mut in_cycle = vec![false; n];
    let mut n_comp = 0;
    for start in 0..n {
        let mut v = start;
        let mut cycle_at = None;
        loop {
            if v == root || comp[v] != UNSET {
                break;
            }
            if visit[v] == start {
                cycle_at = Some(v);
                break;
            }
            if visit[v] != UNSET {
                break;
            }
            visit[v] = start;
            match best[v] {
                Some(e) => v = edges[e].source,
                None => break,
            }
        }
        if let Some(entry) = cycle_at {
            let mut u = entry;
            loop {
                comp[u] = n_comp;
                in_cycle[u] = true;
                u = match best[u] {
                    Some(e) => edges[e].source,
                    None => break,
                };
                if u == entry {
                    break;
                }
            }
            n_comp += 1;
        }
    }

    if n_comp == 0 {
        return best.into_iter().flatten().collect();
    }

    for c in comp.iter_mut() {
        if *c == UNSET {
            *c = n_comp;
            n_comp += 1;
        }
    }

    // contract cycles and solve the smaller instance
    let mut contracted = Vec::new();
    let mut origin = Vec::new();
    for (i, e) in edges.iter().enumerate() {
        if e.source >= n || e.target >= n {
            continue;
        }
        let (cu, cv) = (comp[e.source], comp[e.target]);
        if cu == cv {
            continue;
        }
        let weight = match best[e.target] {
            Some(b) if in_cycle[e.target] => e.weight - edges[b].weight,
            _ => e.weight,
        };
        contracted.push(WeightedEdge::new(cu, cv, weight));
        origin.push(i);
    }
    let sub = solve(n_comp, comp[root], &contracted);

    // expand: keep cycle edges except where the cycle is entered
    let mut result: Vec<usize> = sub.iter().map(|&c| origin[c]).collect();
    let mut entered = vec![false; n];
    for &i in &result {
        if in_cycle[edges[i].target] {
            entered[edges[i].target] = true;
        }
    }
    for v in 0..n {
        if !in_cycle[v] || entered[v] {
            continue;
        }
        if let Some(b) = best[v] {
            result.push(b);
        }
    }
    // a cycle nobody enters is unreachable: break it at its weakest edge
    for c in 0..n_comp {
        let members: Vec<usize> = (0..n).filter(|&v| in_cycle[v] && comp[v] == c).collect();
        if !members.is_empty() && !members.iter().any(|&v| entered[v]) {
            let weakest = members
                .iter()
                .filter_map(|&v| best[v])
                .min_by(|a, b| edges[*a].weight.total_cmp(&edges[*b].weight));
            if let Some(w) = weakest {
                result.retain(|&i| i != w);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(edges: &[WeightedEdge], chosen: &[usize]) -> f64 {
        chosen.iter().map(|&i| edges[i].weight).sum()
    }

    #[test]
    fn test_simple_tree() {
        let edges = vec![
            WeightedEdge::new(0, 1, 0.5),
            WeightedEdge::new(0, 2, 0.4),
            WeightedEdge::new(1, 2, 0.9),
        ];
        let chosen = maximum_arborescence(3, 0, &edges);
        assert_eq!(chosen, vec![0, 2]);
    }

    #[test]
    fn test_cycle_is_broken_optimally() {
        // 1 and 2 prefer each other; the root must enter the cycle somewhere
        let edges = vec![
            WeightedEdge::new(0, 1, 0.3),
            WeightedEdge::new(0, 2, 0.1),
            WeightedEdge::new(1, 2, 0.8),
            WeightedEdge::new(2, 1, 0.9),
        ];
        let chosen = maximum_arborescence(3, 0, &edges);
        // 0->1 (0.3) + 1->2 (0.8) = 1.1 beats 0->2 (0.1) + 2->1 (0.9) = 1.0
        assert_eq!(chosen, vec![0, 2]);
        assert!((total(&edges, &chosen) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_every_non_root_gets_one_parent() {
        let mut edges = Vec::new();
        for s in 0..5 {
            for t in 1..5 {
                if s != t {
                    edges.push(WeightedEdge::new(s, t, ((s * 7 + t * 3) % 10) as f64 / 10.0));
                }
            }
        }
        let chosen = maximum_arborescence(5, 0, &edges);
        assert_eq!(chosen.len(), 4);
        let mut parents = [0usize; 5];
        for &i in &chosen {
            parents[edges[i].target] += 1;
        }
        assert_eq!(parents, [0, 1, 1, 1, 1]);
    }

    #[test]
    fn test_ties_prefer_first_edge() {
        let edges = vec![WeightedEdge::new(0, 2, 0.5), WeightedEdge::new(1, 2, 0.5), WeightedEdge::new(0, 1, 0.5)];
        let chosen = maximum_arborescence(3, 0, &edges);
        assert_eq!(chosen, vec![0, 2]);
    }

    #[test]
    fn test_unreachable_nodes_stay_parentless() {
        let edges = vec![WeightedEdge::new(0, 1, 0.5), WeightedEdge::new(2, 3, 0.7), WeightedEdge::new(3, 2, 0.6)];
        let chosen = maximum_arborescence(4, 0, &edges);
        assert_eq!(chosen, vec![0, 1]);
    }
}
