mod acyclic;
mod cluster;
mod ordering;
mod packing;
mod ranking;
mod refine;
mod routing;
pub(crate) mod types;

pub use routing::{LabelHit, bidirectional_label_hits};
pub use types::*;

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::LayoutConfig;
use crate::model::{Cluster, Graph, GraphInput};
use crate::text_metrics::{FontSizer, NodeSizer};

use cluster::ClusterBox;
use types::bounds_of;

/// Runs the full pipeline: sanitize, break cycles, rank, lay out each
/// category, pack the boxes, untangle rows, optionally relax, route.
pub fn compute_layout(input: &GraphInput, config: &LayoutConfig) -> Layout {
    let sizer = FontSizer::new(&config.label);
    compute_layout_with(input, &sizer, config)
}

/// Same pipeline with an injected sizer, which keeps tests and
/// benchmarks off the system font database.
pub fn compute_layout_with(
    input: &GraphInput,
    sizer: &dyn NodeSizer,
    config: &LayoutConfig,
) -> Layout {
    let (mut graph, diagnostics) = Graph::from_input(input);
    acyclic::break_cycles(&mut graph);
    let layers = ranking::assign_layers(&graph);

    let categories: Vec<&str> = graph
        .clusters
        .iter()
        .filter(|cluster| cluster.parent.is_none())
        .map(|cluster| cluster.id.as_str())
        .collect();
    // Categories are independent once layers are fixed, and the
    // indexed collect keeps them in input order.
    let boxes: Vec<ClusterBox> = categories
        .par_iter()
        .map(|id| cluster::layout_cluster(&graph, id, &layers, sizer, config))
        .collect();

    let packed = packing::pack_clusters(boxes, &graph, &layers, sizer, config);
    let mut nodes: BTreeMap<String, NodeLayout> = packed
        .nodes
        .into_iter()
        .map(|node| (node.id.clone(), node))
        .collect();
    ordering::minimize_crossings(&mut nodes, &graph, config);
    refine::refine(&mut nodes, &graph, config);

    let clusters = cluster_layouts(&graph, &nodes, &packed.cluster_bounds, config);
    let edges = routing::route_edges(&nodes, &graph, config);
    let (width, height) = extent(&nodes, &clusters);

    tracing::debug!(
        nodes = nodes.len(),
        clusters = clusters.len(),
        segments = edges.len(),
        "layout complete"
    );

    Layout {
        nodes,
        clusters,
        edges,
        width,
        height,
        diagnostics,
    }
}

/// Cluster frames are recomputed from final node positions, so the
/// ordering and refinement stages cannot strand a frame away from its
/// content. Header-only clusters keep a zero-size bounds at the
/// header's center.
fn cluster_layouts(
    graph: &Graph,
    nodes: &BTreeMap<String, NodeLayout>,
    slots: &[(String, Bounds)],
    config: &LayoutConfig,
) -> Vec<ClusterLayout> {
    let pad = config.spacing.cluster_padding;
    slots
        .iter()
        .filter_map(|(id, _)| {
            let cluster = graph.cluster(id)?;
            let members: Vec<&NodeLayout> = nodes
                .values()
                .filter(|node| node.id != *id && is_member(graph, node, cluster, id))
                .collect();
            let bounds = if members.is_empty() {
                nodes
                    .get(id)
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
            } else {
                bounds_of(members.into_iter().chain(nodes.get(id)), pad)
            };
            Some(ClusterLayout {
                id: id.clone(),
                label: cluster.label.clone(),
                parent: cluster.parent.clone(),
                bounds,
            })
        })
        .collect()
}

fn is_member(graph: &Graph, node: &NodeLayout, cluster: &Cluster, id: &str) -> bool {
    if cluster.parent.is_none() {
        graph.top_level_cluster(&node.id) == Some(id)
    } else {
        cluster.members.iter().any(|member| member == &node.id)
    }
}

fn extent(nodes: &BTreeMap<String, NodeLayout>, clusters: &[ClusterLayout]) -> (f32, f32) {
    if nodes.is_empty() && clusters.is_empty() {
        return (0.0, 0.0);
    }
    let mut extent = bounds_of(nodes.values(), 0.0);
    for cluster in clusters {
        extent = extent.union(&cluster.bounds);
    }
    (
        extent.right() + packing::MARGIN,
        extent.bottom() + packing::MARGIN,
    )
}
