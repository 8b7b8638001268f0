use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::model::{Graph, NodeRole};
use crate::text_metrics::NodeSizer;

use super::types::{Bounds, NodeLayout, bounds_of};

/// One top-level cluster laid out in local coordinates, origin at the
/// box's top-left corner.
pub(super) struct ClusterBox {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeLayout>,
    /// Local bounds for the category itself and each of its
    /// subcategories.
    pub bounds: Vec<(String, Bounds)>,
}

/// Lays out one category: header row on top, subcategory headers
/// below it, then leaf rows by layer. Within a row, siblings follow
/// the barycenter of their already-placed predecessors; placement is
/// width-aware so boxes never collide regardless of label length.
pub(super) fn layout_cluster(
    graph: &Graph,
    category_id: &str,
    layers: &HashMap<String, usize>,
    sizer: &dyn NodeSizer,
    config: &LayoutConfig,
) -> ClusterBox {
    let pad = config.spacing.cluster_padding;
    let gap = config.spacing.node_spacing;

    let members: Vec<&crate::model::Node> = graph
        .nodes_in_order()
        .into_iter()
        .filter(|node| belongs_to(graph, node, category_id))
        .collect();

    let sizes: HashMap<String, (f32, f32)> = members
        .iter()
        .map(|node| (node.id.clone(), sizer.size(&node.label, node.role)))
        .collect();

    let mut rows: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for node in &members {
        let layer = layers.get(&node.id).copied().unwrap_or(2);
        rows.entry(layer).or_default().push(node.id.clone());
    }

    let row_width = |ids: &[String]| -> f32 {
        let total: f32 = ids.iter().map(|id| sizes[id].0).sum();
        total + gap * (ids.len().saturating_sub(1)) as f32
    };
    let content_width = rows
        .values()
        .map(|ids| row_width(ids))
        .fold(0.0f32, f32::max);

    let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in graph.ranking_edges() {
        let (from, to) = edge.ranking_endpoints();
        predecessors.entry(to).or_default().push(from);
    }

    let mut placed: Vec<NodeLayout> = Vec::new();
    let mut centers: HashMap<String, f32> = HashMap::new();
    let mut y_cursor = pad;
    for (&layer, ids) in &rows {
        let ordered = order_by_barycenter(ids, &predecessors, &centers);
        let row_height = ordered
            .iter()
            .map(|id| sizes[id].1)
            .fold(0.0f32, f32::max);
        let mut x_cursor = pad + (content_width - row_width(&ordered)) / 2.0;
        for id in &ordered {
            let (width, height) = sizes[id];
            let node = graph.nodes.get(id).map(|node| NodeLayout {
                id: id.clone(),
                label: node.label.clone(),
                role: node.role,
                cluster_id: node.cluster_id.clone(),
                file_path: node.file_path.clone(),
                importance: node.importance,
                layer,
                x: x_cursor,
                // Rows are baseline-aligned within their band.
                y: y_cursor + (row_height - height),
                width,
                height,
            });
            if let Some(node) = node {
                centers.insert(id.clone(), node.center().0);
                placed.push(node);
            }
            x_cursor += width + gap;
        }
        y_cursor += row_height + config.spacing.layer_spacing;
    }
    let content_height = if rows.is_empty() {
        0.0
    } else {
        y_cursor - config.spacing.layer_spacing - pad
    };

    let width = content_width + 2.0 * pad;
    let height = content_height + 2.0 * pad;

    let mut bounds = vec![(
        category_id.to_string(),
        cluster_bounds(category_id, &placed, width, height),
    )];
    for sub in graph
        .clusters
        .iter()
        .filter(|cluster| cluster.parent.as_deref() == Some(category_id))
    {
        bounds.push((
            sub.id.clone(),
            subcategory_bounds(graph, &sub.id, &placed, pad),
        ));
    }

    ClusterBox {
        id: category_id.to_string(),
        width,
        height,
        nodes: placed,
        bounds,
    }
}

fn belongs_to(graph: &Graph, node: &crate::model::Node, category_id: &str) -> bool {
    match node.role {
        NodeRole::Category => node.id == category_id,
        NodeRole::Subcategory => node.cluster_id.as_deref() == Some(category_id),
        NodeRole::Leaf => graph.top_level_cluster(&node.id) == Some(category_id),
    }
}

/// Sorts a row by mean center of placed predecessors, the current
/// index breaking ties and standing in when nothing is placed yet.
fn order_by_barycenter(
    ids: &[String],
    predecessors: &HashMap<&str, Vec<&str>>,
    centers: &HashMap<String, f32>,
) -> Vec<String> {
    let index_of: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let score = |id: &str| -> f32 {
        let fallback = index_of.get(id).copied().unwrap_or(0) as f32;
        let Some(list) = predecessors.get(id) else {
            return fallback;
        };
        let known: Vec<f32> = list
            .iter()
            .filter_map(|pred| centers.get(*pred).copied())
            .collect();
        if known.is_empty() {
            return fallback;
        }
        known.iter().sum::<f32>() / known.len() as f32
    };

    let mut ordered: Vec<String> = ids.to_vec();
    ordered.sort_by(|a, b| {
        score(a)
            .partial_cmp(&score(b))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| index_of[a.as_str()].cmp(&index_of[b.as_str()]))
    });
    ordered
}

/// A category with actual content owns its whole box. A header-only
/// category keeps an addressable zero-size bounds at the header's
/// center.
fn cluster_bounds(category_id: &str, placed: &[NodeLayout], width: f32, height: f32) -> Bounds {
    let has_content = placed.iter().any(|node| node.id != category_id);
    if has_content {
        return Bounds {
            x: 0.0,
            y: 0.0,
            width,
            height,
        };
    }
    placed
        .iter()
        .find(|node| node.id == category_id)
        .map(|header| {
            let (cx, cy) = header.center();
            Bounds {
                x: cx,
                y: cy,
                width: 0.0,
                height: 0.0,
            }
        })
        .unwrap_or_default()
}

fn subcategory_bounds(graph: &Graph, sub_id: &str, placed: &[NodeLayout], pad: f32) -> Bounds {
    let member_ids: Vec<&str> = graph
        .cluster(sub_id)
        .map(|cluster| cluster.members.iter().map(String::as_str).collect())
        .unwrap_or_default();
    if member_ids.is_empty() {
        return placed
            .iter()
            .find(|node| node.id == sub_id)
            .map(|header| {
                let (cx, cy) = header.center();
                Bounds {
                    x: cx,
                    y: cy,
                    width: 0.0,
                    height: 0.0,
                }
            })
            .unwrap_or_default();
    }
    bounds_of(
        placed
            .iter()
            .filter(|node| node.id == sub_id || member_ids.contains(&node.id.as_str())),
        pad,
    )
}
