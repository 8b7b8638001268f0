use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::model::Graph;

use super::types::NodeLayout;

/// Distances are clamped here so coincident nodes never divide by
/// zero.
const MIN_DISTANCE: f32 = 20.0;

/// Optional force-directed polish over the placed nodes. Pairwise
/// repulsion falls off with 1/d² and only acts inside the configured
/// radius; attraction along domain edges relaxes them toward the
/// ideal length. Forces are accumulated in sorted-id order and scaled
/// by a linearly decaying damping factor, with vertical displacement
/// damped further so the layer bands survive.
pub(super) fn refine(
    nodes: &mut BTreeMap<String, NodeLayout>,
    graph: &Graph,
    config: &LayoutConfig,
) {
    let iterations = config.refine.iterations;
    if iterations == 0 || nodes.len() < 2 {
        return;
    }
    let settings = &config.refine;

    let ids: Vec<String> = nodes.keys().cloned().collect();
    let index_of: BTreeMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();

    let attraction_pairs: Vec<(usize, usize)> = graph
        .ranking_edges()
        .filter_map(|edge| {
            let a = index_of.get(edge.source.as_str())?;
            let b = index_of.get(edge.target.as_str())?;
            (a != b).then_some((*a, *b))
        })
        .collect();

    for step in 0..iterations {
        let decay = 1.0 - step as f32 / iterations as f32;
        let scale = settings.damping * decay;

        let centers: Vec<(f32, f32)> = ids.iter().map(|id| nodes[id].center()).collect();
        let mut forces = vec![(0.0f32, 0.0f32); ids.len()];

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let dx = centers[i].0 - centers[j].0;
                let dy = centers[i].1 - centers[j].1;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > settings.repulsion_radius {
                    continue;
                }
                let dist = dist.max(MIN_DISTANCE);
                let force = settings.repulsion_strength / (dist * dist);
                let fx = force * dx / dist;
                let fy = force * dy / dist;
                forces[i].0 += fx;
                forces[i].1 += fy;
                forces[j].0 -= fx;
                forces[j].1 -= fy;
            }
        }

        for &(a, b) in &attraction_pairs {
            let dx = centers[b].0 - centers[a].0;
            let dy = centers[b].1 - centers[a].1;
            let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
            let force = settings.attraction_strength * (dist - settings.ideal_edge_length);
            let fx = force * dx / dist;
            let fy = force * dy / dist;
            forces[a].0 += fx;
            forces[a].1 += fy;
            forces[b].0 -= fx;
            forces[b].1 -= fy;
        }

        for (idx, id) in ids.iter().enumerate() {
            if let Some(node) = nodes.get_mut(id) {
                node.x += forces[idx].0 * scale;
                node.y += forces[idx].1 * scale * settings.vertical_damping;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_graph;

    fn two_nodes(ax: f32, ay: f32, bx: f32, by: f32) -> BTreeMap<String, NodeLayout> {
        let mut nodes = BTreeMap::new();
        for (id, x, y) in [("a", ax, ay), ("b", bx, by)] {
            nodes.insert(
                id.to_string(),
                NodeLayout {
                    id: id.to_string(),
                    label: id.to_string(),
                    role: crate::model::NodeRole::Leaf,
                    cluster_id: None,
                    file_path: None,
                    importance: None,
                    layer: 2,
                    x,
                    y,
                    width: 40.0,
                    height: 20.0,
                },
            );
        }
        nodes
    }

    fn graph_with_edge() -> Graph {
        let input = parse_graph(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "b", "label": "b"}
                ],
                "edges": [{"source": "a", "target": "b"}]
            }"#,
        )
        .unwrap();
        Graph::from_input(&input).0
    }

    fn config_with_iterations(iterations: usize) -> LayoutConfig {
        let mut config = LayoutConfig::default();
        config.refine.iterations = iterations;
        config
    }

    #[test]
    fn zero_iterations_leave_positions_untouched() {
        let graph = graph_with_edge();
        let mut nodes = two_nodes(0.0, 0.0, 30.0, 0.0);
        let before: Vec<(f32, f32)> = nodes.values().map(|n| (n.x, n.y)).collect();
        refine(&mut nodes, &graph, &config_with_iterations(0));
        let after: Vec<(f32, f32)> = nodes.values().map(|n| (n.x, n.y)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn close_nodes_are_pushed_apart() {
        let graph = Graph::from_input(
            &parse_graph(
                r#"{"nodes": [{"id": "a", "label": "a"}, {"id": "b", "label": "b"}]}"#,
            )
            .unwrap(),
        )
        .0;
        let mut nodes = two_nodes(0.0, 0.0, 30.0, 0.0);
        let gap_before = nodes["b"].x - nodes["a"].x;
        refine(&mut nodes, &graph, &config_with_iterations(10));
        let gap_after = nodes["b"].x - nodes["a"].x;
        assert!(gap_after > gap_before);
    }

    #[test]
    fn connected_distant_nodes_are_pulled_together() {
        let graph = graph_with_edge();
        let mut nodes = two_nodes(0.0, 0.0, 600.0, 0.0);
        let gap_before = nodes["b"].x - nodes["a"].x;
        refine(&mut nodes, &graph, &config_with_iterations(10));
        let gap_after = nodes["b"].x - nodes["a"].x;
        assert!(gap_after < gap_before);
    }

    #[test]
    fn vertical_motion_is_damped_harder_than_horizontal() {
        let graph = Graph::from_input(
            &parse_graph(
                r#"{"nodes": [{"id": "a", "label": "a"}, {"id": "b", "label": "b"}]}"#,
            )
            .unwrap(),
        )
        .0;
        let mut nodes = two_nodes(0.0, 0.0, 30.0, 30.0);
        refine(&mut nodes, &graph, &config_with_iterations(1));
        let dx = (nodes["b"].x - 30.0).abs();
        let dy = (nodes["b"].y - 30.0).abs();
        assert!(dy < dx);
    }

    #[test]
    fn coincident_nodes_never_produce_nan() {
        let graph = graph_with_edge();
        let mut nodes = two_nodes(50.0, 50.0, 50.0, 50.0);
        refine(&mut nodes, &graph, &config_with_iterations(5));
        for node in nodes.values() {
            assert!(node.x.is_finite());
            assert!(node.y.is_finite());
        }
    }

    #[test]
    fn refinement_is_deterministic() {
        let graph = graph_with_edge();
        let mut first = two_nodes(0.0, 0.0, 120.0, 40.0);
        let mut second = two_nodes(0.0, 0.0, 120.0, 40.0);
        refine(&mut first, &graph, &config_with_iterations(8));
        refine(&mut second, &graph, &config_with_iterations(8));
        let a: Vec<(f32, f32)> = first.values().map(|n| (n.x, n.y)).collect();
        let b: Vec<(f32, f32)> = second.values().map(|n| (n.x, n.y)).collect();
        assert_eq!(a, b);
    }
}
