use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::model::{Graph, NodeRole};

/// Longest-path layering over a node subset. Edges must already be in
/// ranking direction. Zero in-degree puts a node on layer 0; otherwise
/// it lands one past its highest-ranked predecessor. Residual cycles
/// (callers normally break them first) are seeded from the remaining
/// node earliest in insertion order, so the result is deterministic
/// either way.
pub(super) fn compute_ranks_subset(
    node_ids: &[String],
    edges: &[(String, String)],
    node_order: &HashMap<String, usize>,
) -> HashMap<String, usize> {
    let set: HashSet<String> = node_ids.iter().cloned().collect();
    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    let mut rev: HashMap<String, Vec<String>> = HashMap::new();

    for (from, to) in edges {
        if from == to || !set.contains(from) || !set.contains(to) {
            continue;
        }
        adj.entry(from.clone()).or_default().push(to.clone());
        rev.entry(to.clone()).or_default().push(from.clone());
    }

    let mut fallback_order: HashMap<&str, usize> = HashMap::new();
    for (idx, id) in node_ids.iter().enumerate() {
        fallback_order.insert(id.as_str(), idx);
    }
    let order_key = |id: &str| -> usize {
        node_order
            .get(id)
            .copied()
            .unwrap_or_else(|| fallback_order.get(id).copied().unwrap_or(usize::MAX))
    };

    let mut indeg: HashMap<String, usize> = HashMap::new();
    for id in &set {
        let count = rev.get(id).map(|v| v.len()).unwrap_or(0);
        indeg.insert(id.clone(), count);
    }

    let mut ready: BinaryHeap<Reverse<(usize, String)>> = BinaryHeap::new();
    for id in &set {
        if *indeg.get(id).unwrap_or(&0) == 0 {
            ready.push(Reverse((order_key(id.as_str()), id.clone())));
        }
    }

    let mut order = Vec::with_capacity(set.len());
    let mut processed: HashSet<String> = HashSet::new();
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if processed.contains(&id) {
                continue;
            }
            order.push(id.clone());
            processed.insert(id.clone());
            if let Some(nexts) = adj.get(&id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((order_key(next.as_str()), next.clone())));
                        }
                    }
                }
            }
        }

        if processed.len() >= set.len() {
            break;
        }

        // Cycle residue: pick the remaining node earliest in insertion
        // order as the next source, treating its incoming edges as
        // back-edges.
        let mut best: Option<(usize, String)> = None;
        for id in &set {
            if !processed.contains(id) {
                let key = order_key(id.as_str());
                if best.as_ref().is_none_or(|(bk, _)| key < *bk) {
                    best = Some((key, id.clone()));
                }
            }
        }
        if let Some((key, id)) = best {
            ready.push(Reverse((key, id)));
        } else {
            break;
        }
    }

    let order_index: HashMap<String, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.clone(), idx))
        .collect();

    let mut ranks: HashMap<String, usize> = HashMap::new();
    for node in &order {
        let rank = *ranks.get(node).unwrap_or(&0);
        ranks.entry(node.clone()).or_insert(rank);
        if let Some(nexts) = adj.get(node) {
            let from_idx = *order_index.get(node).unwrap_or(&0);
            for next in nexts {
                let to_idx = *order_index.get(next).unwrap_or(&from_idx);
                if to_idx <= from_idx {
                    continue;
                }
                let entry = ranks.entry(next.clone()).or_insert(0);
                *entry = (*entry).max(rank + 1);
            }
        }
    }

    ranks
}

/// Final layer per node. Role decides the band: category headers on
/// layer 0, subcategory headers on 1, leaves on 2 plus their
/// longest-path rank within their top-level cluster. Unclustered
/// leaves rank as one shared subset.
pub(super) fn assign_layers(graph: &Graph) -> HashMap<String, usize> {
    let node_order: HashMap<String, usize> = graph
        .nodes
        .values()
        .map(|node| (node.id.clone(), node.order))
        .collect();

    let mut subsets: Vec<(Option<String>, Vec<String>)> = Vec::new();
    for cluster in graph.clusters.iter().filter(|c| c.parent.is_none()) {
        subsets.push((Some(cluster.id.clone()), Vec::new()));
    }
    subsets.push((None, Vec::new()));

    for node in graph.nodes_in_order() {
        if node.role != NodeRole::Leaf {
            continue;
        }
        let top = graph.top_level_cluster(&node.id).map(str::to_string);
        if let Some((_, members)) = subsets.iter_mut().find(|(key, _)| *key == top) {
            members.push(node.id.clone());
        }
    }

    let mut layers: HashMap<String, usize> = HashMap::new();
    for node in graph.nodes.values() {
        match node.role {
            NodeRole::Category => {
                layers.insert(node.id.clone(), 0);
            }
            NodeRole::Subcategory => {
                layers.insert(node.id.clone(), 1);
            }
            NodeRole::Leaf => {}
        }
    }

    for (_, members) in &subsets {
        let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();
        let edges: Vec<(String, String)> = graph
            .ranking_edges()
            .filter_map(|edge| {
                let (from, to) = edge.ranking_endpoints();
                (member_set.contains(from) && member_set.contains(to))
                    .then(|| (from.to_string(), to.to_string()))
            })
            .collect();
        let ranks = compute_ranks_subset(members, &edges, &node_order);
        for id in members {
            let rank = ranks.get(id).copied().unwrap_or(0);
            layers.insert(id.clone(), 2 + rank);
        }
    }

    layers
}
