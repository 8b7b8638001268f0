use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::model::Graph;

use super::types::NodeLayout;

/// Barycenter sweep over the placed rows. Each pass runs a downward
/// sweep (rows ordered by predecessor centers) and an upward sweep
/// (successor centers). Neighbors outside the row contribute through
/// their global x, so cross-cluster edges still pull nodes toward
/// each other. Rows are re-placed left-to-right from their previous
/// left edge, honoring widths and the minimum gap; layers and y
/// positions never change.
pub(super) fn minimize_crossings(
    nodes: &mut BTreeMap<String, NodeLayout>,
    graph: &Graph,
    config: &LayoutConfig,
) {
    if config.ordering.passes == 0 {
        return;
    }

    let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();
    for edge in graph.ranking_edges() {
        let (from, to) = edge.ranking_endpoints();
        outgoing
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        incoming
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
    }

    // Rows keyed by (top-level cluster, layer); BTreeMap keeps the
    // sweep order deterministic. The unclustered trailing shelf is a
    // single input-ordered row, not a layered one, so it stays put.
    let mut rows: BTreeMap<(String, usize), Vec<String>> = BTreeMap::new();
    for node in nodes.values() {
        let Some(cluster) = graph.top_level_cluster(&node.id) else {
            continue;
        };
        rows.entry((cluster.to_string(), node.layer))
            .or_default()
            .push(node.id.clone());
    }
    for ids in rows.values_mut() {
        ids.sort_by(|a, b| {
            nodes[a]
                .x
                .partial_cmp(&nodes[b].x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
    }

    let order_of: HashMap<String, usize> = graph
        .nodes
        .values()
        .map(|node| (node.id.clone(), node.order))
        .collect();

    for _ in 0..config.ordering.passes {
        let mut down: Vec<(String, usize)> = rows.keys().cloned().collect();
        down.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let gap = config.spacing.node_spacing;
        for key in &down {
            let row = rows.get_mut(key).map(|v| v.as_mut_slice());
            reorder_row(row, nodes, &incoming, &order_of, gap);
        }
        for key in down.iter().rev() {
            let row = rows.get_mut(key).map(|v| v.as_mut_slice());
            reorder_row(row, nodes, &outgoing, &order_of, gap);
        }
    }
}

fn reorder_row(
    row: Option<&mut [String]>,
    nodes: &mut BTreeMap<String, NodeLayout>,
    neighbors: &HashMap<String, Vec<String>>,
    order_of: &HashMap<String, usize>,
    gap: f32,
) {
    let Some(row) = row else {
        return;
    };
    if row.len() <= 1 {
        return;
    }

    let current_positions: HashMap<String, usize> = row
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.clone(), idx))
        .collect();
    let score = |id: &str| -> f32 {
        let fallback = current_positions.get(id).copied().unwrap_or(0) as f32;
        let Some(list) = neighbors.get(id) else {
            return fallback;
        };
        let centers: Vec<f32> = list
            .iter()
            .filter_map(|other| nodes.get(other).map(|n| n.center().0))
            .collect();
        if centers.is_empty() {
            return fallback;
        }
        centers.iter().sum::<f32>() / centers.len() as f32
    };

    let scores: HashMap<String, f32> = row.iter().map(|id| (id.clone(), score(id))).collect();
    row.sort_by(|a, b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| current_positions[a.as_str()].cmp(&current_positions[b.as_str()]))
            .then_with(|| {
                order_of
                    .get(a)
                    .copied()
                    .unwrap_or(usize::MAX)
                    .cmp(&order_of.get(b).copied().unwrap_or(usize::MAX))
            })
    });

    replace_row(row, nodes, gap);
}

/// Re-places a reordered row from its previous left edge, widths and
/// minimum gap intact.
fn replace_row(row: &[String], nodes: &mut BTreeMap<String, NodeLayout>, gap: f32) {
    let left_edge = row
        .iter()
        .filter_map(|id| nodes.get(id).map(|n| n.x))
        .fold(f32::INFINITY, f32::min);
    if !left_edge.is_finite() {
        return;
    }
    let mut x_cursor = left_edge;
    for id in row {
        if let Some(node) = nodes.get_mut(id) {
            node.x = x_cursor;
            x_cursor += node.width + gap;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::cluster::layout_cluster;
    use crate::layout::ranking::assign_layers;
    use crate::model::parse_graph;
    use crate::text_metrics::CharMetricSizer;

    fn laid_out(json: &str) -> (BTreeMap<String, NodeLayout>, Graph, LayoutConfig) {
        let input = parse_graph(json).unwrap();
        let (graph, _) = Graph::from_input(&input);
        let layers = assign_layers(&graph);
        let config = LayoutConfig::default();
        let sizer = CharMetricSizer::new(&config.label);
        let mut nodes = BTreeMap::new();
        for cluster in graph.clusters.iter().filter(|c| c.parent.is_none()) {
            let cluster_box = layout_cluster(&graph, &cluster.id, &layers, &sizer, &config);
            for node in cluster_box.nodes {
                nodes.insert(node.id.clone(), node);
            }
        }
        (nodes, graph, config)
    }

    const CROSSING: &str = r#"{
        "nodes": [
            {"id": "a", "label": "a"},
            {"id": "b", "label": "b"},
            {"id": "x", "label": "x"},
            {"id": "y", "label": "y"}
        ],
        "edges": [
            {"source": "a", "target": "y"},
            {"source": "b", "target": "x"}
        ],
        "categories": [
            {"id": "cat", "label": "Cat", "members": ["a", "b", "x", "y"]}
        ]
    }"#;

    #[test]
    fn crossing_pair_gets_untangled() {
        let (mut nodes, graph, config) = laid_out(CROSSING);
        minimize_crossings(&mut nodes, &graph, &config);
        assert!(nodes["a"].x < nodes["b"].x);
        assert!(nodes["y"].x < nodes["x"].x);
    }

    #[test]
    fn layers_and_vertical_positions_are_preserved() {
        let (mut nodes, graph, config) = laid_out(CROSSING);
        let before: Vec<(String, usize, f32)> = nodes
            .values()
            .map(|n| (n.id.clone(), n.layer, n.y))
            .collect();
        minimize_crossings(&mut nodes, &graph, &config);
        for (id, layer, y) in before {
            assert_eq!(nodes[&id].layer, layer);
            assert_eq!(nodes[&id].y, y);
        }
    }

    #[test]
    fn reordered_rows_keep_nodes_apart() {
        let (mut nodes, graph, config) = laid_out(CROSSING);
        minimize_crossings(&mut nodes, &graph, &config);
        let mut row: Vec<&NodeLayout> = nodes
            .values()
            .filter(|n| n.layer == 3)
            .collect();
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
        for pair in row.windows(2) {
            assert!(pair[0].right() <= pair[1].x);
        }
    }

    #[test]
    fn zero_passes_disable_the_stage() {
        let (mut nodes, graph, mut config) = laid_out(CROSSING);
        config.ordering.passes = 0;
        let before: Vec<f32> = nodes.values().map(|n| n.x).collect();
        minimize_crossings(&mut nodes, &graph, &config);
        let after: Vec<f32> = nodes.values().map(|n| n.x).collect();
        assert_eq!(before, after);
    }
}
