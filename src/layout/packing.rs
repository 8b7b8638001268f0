use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::model::{Graph, NodeRole};
use crate::text_metrics::NodeSizer;

use super::cluster::ClusterBox;
use super::types::{Bounds, NodeLayout};

/// Outer margin around the packed field, also applied to the final
/// canvas extent.
pub(super) const MARGIN: f32 = 24.0;

pub(super) struct PackedLayout {
    pub nodes: Vec<NodeLayout>,
    /// Global bounds per cluster id, categories and subcategories
    /// alike, in cluster input order.
    pub cluster_bounds: Vec<(String, Bounds)>,
}

/// Packs cluster boxes onto shelves of a near-square grid, in cluster
/// input order, then lines up unclustered leaves on one trailing
/// shelf. Empty boxes keep their slot so every cluster id stays
/// addressable.
pub(super) fn pack_clusters(
    boxes: Vec<ClusterBox>,
    graph: &Graph,
    layers: &HashMap<String, usize>,
    sizer: &dyn NodeSizer,
    config: &LayoutConfig,
) -> PackedLayout {
    let gap = config.spacing.cluster_spacing;
    let columns = (boxes.len() as f32).sqrt().ceil().max(1.0) as usize;

    let mut nodes: Vec<NodeLayout> = Vec::new();
    let mut cluster_bounds: Vec<(String, Bounds)> = Vec::new();

    let mut x_cursor = MARGIN;
    let mut y_cursor = MARGIN;
    let mut shelf_height = 0.0f32;
    for (index, cluster_box) in boxes.into_iter().enumerate() {
        if index > 0 && index % columns == 0 {
            x_cursor = MARGIN;
            y_cursor += shelf_height + gap;
            shelf_height = 0.0;
        }
        for mut node in cluster_box.nodes {
            node.x += x_cursor;
            node.y += y_cursor;
            nodes.push(node);
        }
        for (id, bounds) in cluster_box.bounds {
            let translated = Bounds {
                x: bounds.x + x_cursor,
                y: bounds.y + y_cursor,
                width: bounds.width,
                height: bounds.height,
            };
            cluster_bounds.push((id, translated));
        }
        shelf_height = shelf_height.max(cluster_box.height);
        x_cursor += cluster_box.width + gap;
    }
    if shelf_height > 0.0 {
        y_cursor += shelf_height + gap;
    }

    let free: Vec<&crate::model::Node> = graph
        .nodes_in_order()
        .into_iter()
        .filter(|node| {
            node.role == NodeRole::Leaf && graph.top_level_cluster(&node.id).is_none()
        })
        .collect();
    if !free.is_empty() {
        let mut x_cursor = MARGIN;
        for node in free {
            let (width, height) = sizer.size(&node.label, node.role);
            nodes.push(NodeLayout {
                id: node.id.clone(),
                label: node.label.clone(),
                role: node.role,
                cluster_id: None,
                file_path: node.file_path.clone(),
                importance: node.importance,
                layer: layers.get(&node.id).copied().unwrap_or(2),
                x: x_cursor,
                y: y_cursor,
                width,
                height,
            });
            x_cursor += width + config.spacing.node_spacing;
        }
    }

    PackedLayout {
        nodes,
        cluster_bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::cluster::layout_cluster;
    use crate::layout::ranking::assign_layers;
    use crate::model::parse_graph;
    use crate::text_metrics::CharMetricSizer;

    fn packed(json: &str) -> (PackedLayout, LayoutConfig) {
        let input = parse_graph(json).unwrap();
        let (graph, _) = Graph::from_input(&input);
        let layers = assign_layers(&graph);
        let config = LayoutConfig::default();
        let sizer = CharMetricSizer::new(&config.label);
        let boxes: Vec<ClusterBox> = graph
            .clusters
            .iter()
            .filter(|cluster| cluster.parent.is_none())
            .map(|cluster| layout_cluster(&graph, &cluster.id, &layers, &sizer, &config))
            .collect();
        (pack_clusters(boxes, &graph, &layers, &sizer, &config), config)
    }

    #[test]
    fn disconnected_categories_stay_apart() {
        let (layout, config) = packed(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "b", "label": "b"}
                ],
                "edges": [],
                "categories": [
                    {"id": "one", "label": "One", "members": ["a"]},
                    {"id": "two", "label": "Two", "members": ["b"]}
                ]
            }"#,
        );
        let bounds_for = |id: &str| {
            layout
                .cluster_bounds
                .iter()
                .find(|(cluster, _)| cluster == id)
                .map(|(_, bounds)| *bounds)
                .unwrap()
        };
        let one = bounds_for("one");
        let two = bounds_for("two");
        assert!(!one.intersects(&two));
        let horizontal_gap = two.x - one.right();
        let vertical_gap = two.y - one.bottom();
        assert!(
            horizontal_gap >= config.spacing.cluster_spacing
                || vertical_gap >= config.spacing.cluster_spacing
        );
    }

    #[test]
    fn grid_wraps_to_a_near_square() {
        let (layout, _) = packed(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "b", "label": "b"},
                    {"id": "c", "label": "c"},
                    {"id": "d", "label": "d"}
                ],
                "edges": [],
                "categories": [
                    {"id": "c1", "label": "C1", "members": ["a"]},
                    {"id": "c2", "label": "C2", "members": ["b"]},
                    {"id": "c3", "label": "C3", "members": ["c"]},
                    {"id": "c4", "label": "C4", "members": ["d"]}
                ]
            }"#,
        );
        let ys: Vec<f32> = layout
            .cluster_bounds
            .iter()
            .map(|(_, bounds)| bounds.y)
            .collect();
        let first_row = ys[0];
        assert!(ys.iter().any(|y| *y > first_row), "expected a second shelf");
    }

    #[test]
    fn unclustered_leaves_land_on_a_trailing_shelf() {
        let (layout, _) = packed(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "stray", "label": "stray"}
                ],
                "edges": [],
                "categories": [
                    {"id": "cat", "label": "Cat", "members": ["a"]}
                ]
            }"#,
        );
        let stray = layout.nodes.iter().find(|n| n.id == "stray").unwrap();
        let cluster_bottom = layout
            .cluster_bounds
            .iter()
            .map(|(_, bounds)| bounds.bottom())
            .fold(0.0f32, f32::max);
        assert!(stray.y >= cluster_bottom);
    }

    #[test]
    fn empty_category_still_occupies_a_slot() {
        let (layout, _) = packed(
            r#"{
                "nodes": [{"id": "a", "label": "a"}],
                "edges": [],
                "categories": [
                    {"id": "empty", "label": "Empty", "members": []},
                    {"id": "full", "label": "Full", "members": ["a"]}
                ]
            }"#,
        );
        let empty = layout
            .cluster_bounds
            .iter()
            .find(|(id, _)| id == "empty")
            .map(|(_, bounds)| *bounds)
            .unwrap();
        assert!(empty.is_empty());
        assert!(layout.nodes.iter().any(|n| n.id == "empty"));
    }
}
