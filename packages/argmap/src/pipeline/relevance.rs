//! Relevance network: weighted relations between all claims of a pros/cons list.
//!
//! Every reason is related to its root with the valence the pros/cons list
//! gives it. Reasons are also related to each other; for each target reason
//! at most `max_relations_per_target` sources are sampled in a fixed,
//! hash-derived order so that repeated runs query the same pairs.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::context::{Built, StageContext};
use crate::error::Result;
use crate::types::argmap::{ArgMapNode, NodeRole, RelevanceNetwork};
use crate::types::claim::{ProsConsList, Valence};
use crate::types::relation::DialecticRelation;

/// Root labels a reason bears on, with its valence towards each.
type Parents = Vec<(String, Valence)>;

/// Whether two reasons stand in the same dialectical position.
///
/// With common roots, they must bear on each with the same valence. Without,
/// they must never share a valence (one only supports, the other only
/// attacks), since root claims are mutually exclusive.
pub fn dialectically_equivalent(a: &[(String, Valence)], b: &[(String, Valence)]) -> bool {
    let common: Vec<(&Valence, &Valence)> = a
        .iter()
        .filter_map(|(root, va)| {
            b.iter()
                .find(|(other, _)| other == root)
                .map(|(_, vb)| (va, vb))
        })
        .collect();
    if !common.is_empty() {
        return common.iter().all(|(va, vb)| va == vb);
    }
    let valences_a: HashSet<Valence> = a.iter().map(|(_, v)| *v).collect();
    b.iter().all(|(_, v)| !valences_a.contains(v))
}

fn sampling_key(source: &str, target: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(target.as_bytes());
    hasher.finalize().into()
}

/// At most `max` of `sources` for `target`, chosen in hash order, returned
/// in their original order.
pub fn sample_sources<'a>(sources: &[&'a str], target: &str, max: usize) -> Vec<&'a str> {
    if sources.len() <= max {
        return sources.to_vec();
    }
    let mut keyed: Vec<(usize, [u8; 32])> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| (i, sampling_key(s, target)))
        .collect();
    keyed.sort_by(|a, b| a.1.cmp(&b.1));
    let mut picked: Vec<usize> = keyed.into_iter().take(max).map(|(i, _)| i).collect();
    picked.sort_unstable();
    picked.into_iter().map(|i| sources[i]).collect()
}

struct Pair {
    source: String,
    target: String,
    valence: Option<Valence>,
}

/// Build the relevance network of `list`.
pub async fn build_relevance_network(
    ctx: &StageContext<'_>,
    list: &ProsConsList,
) -> Result<Built<RelevanceNetwork>> {
    if list.reason_count() == 0 {
        return Ok(Built::new(RelevanceNetwork::default()).with_warning("no reasons to relate"));
    }
    let config = &ctx.config.relations;
    let mut built = Built::new(RelevanceNetwork::default());

    let mut nodes: Vec<ArgMapNode> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for root in &list.roots {
        if seen.insert(root.label.clone()) {
            nodes.push(ArgMapNode::new(&root.label, &root.text, NodeRole::Root));
        }
    }

    let mut parents: HashMap<String, Parents> = HashMap::new();
    let mut pairs: Vec<Pair> = Vec::new();
    for (i, valence, claim) in list.reasons() {
        let root = &list.roots[i];
        if seen.insert(claim.label.clone()) {
            nodes.push(ArgMapNode::new(&claim.label, &claim.text, NodeRole::Reason));
        } else if !parents.contains_key(&claim.label) {
            warn!(label = %claim.label, "reason label clashes with a root, skipping");
            built.warn(format!("skipped reason '{}' with clashing label", claim.label));
            continue;
        }
        parents
            .entry(claim.label.clone())
            .or_default()
            .push((root.label.clone(), valence));
        pairs.push(Pair {
            source: claim.label.clone(),
            target: root.label.clone(),
            valence: Some(valence),
        });
    }

    let reasons: Vec<&str> = nodes
        .iter()
        .filter(|n| n.role == NodeRole::Reason)
        .map(|n| n.id.as_str())
        .collect();
    let no_parents = Parents::new();
    let mut sampled_targets = 0;
    for target in &reasons {
        let candidates: Vec<&str> = reasons.iter().copied().filter(|s| s != target).collect();
        let sources = sample_sources(&candidates, target, config.max_relations_per_target);
        if sources.len() < candidates.len() {
            sampled_targets += 1;
        }
        for source in sources {
            let valence = config.keep_pros_cons_valences.then(|| {
                let a = parents.get(source).unwrap_or(&no_parents);
                let b = parents.get(*target).unwrap_or(&no_parents);
                if dialectically_equivalent(a, b) {
                    Valence::Support
                } else {
                    Valence::Attack
                }
            });
            pairs.push(Pair {
                source: source.to_string(),
                target: target.to_string(),
                valence,
            });
        }
    }

    let text: HashMap<&str, &str> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.text.as_str()))
        .collect();
    let queries: Vec<(&str, &str)> = pairs
        .iter()
        .map(|p| {
            (
                text.get(p.source.as_str()).copied().unwrap_or_default(),
                text.get(p.target.as_str()).copied().unwrap_or_default(),
            )
        })
        .collect();
    debug!(pairs = queries.len(), sampled_targets, "weighing relations");
    let distributions = ctx.relations().dialectic_relations(&queries).await?;

    let relations: Vec<DialecticRelation> = pairs
        .into_iter()
        .zip(distributions)
        .map(|(p, dist)| DialecticRelation::new(p.source, p.target, dist, p.valence))
        .collect();

    if sampled_targets > 0 {
        built.set_metadata("sampled_targets", serde_json::json!(sampled_targets));
    }
    info!(
        nodes = nodes.len(),
        relations = relations.len(),
        "relevance network built"
    );
    built.value = RelevanceNetwork { nodes, relations };
    Ok(built)
}
