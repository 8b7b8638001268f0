use crate::layout::Layout;
use crate::model::{Diagnostics, EdgeKind, NodeRole};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub clusters: Vec<ClusterDump>,
    pub edges: Vec<EdgeDump>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub role: NodeRole,
    pub cluster_id: Option<String>,
    pub file_path: Option<String>,
    pub importance: Option<f32>,
    pub layer: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDump {
    pub id: String,
    pub label: String,
    pub parent: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub edge_id: String,
    pub segment_id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: Option<String>,
    pub start: [f32; 2],
    pub control: [f32; 2],
    pub end: [f32; 2],
    pub curvature: f32,
    pub label_anchor: Option<[f32; 2]>,
    pub bidirectional: bool,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                role: node.role,
                cluster_id: node.cluster_id.clone(),
                file_path: node.file_path.clone(),
                importance: node.importance,
                layer: node.layer,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
            })
            .collect();

        let clusters = layout
            .clusters
            .iter()
            .map(|cluster| ClusterDump {
                id: cluster.id.clone(),
                label: cluster.label.clone(),
                parent: cluster.parent.clone(),
                x: cluster.bounds.x,
                y: cluster.bounds.y,
                width: cluster.bounds.width,
                height: cluster.bounds.height,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                edge_id: edge.edge_id.clone(),
                segment_id: edge.segment_id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.kind,
                label: edge.label.clone(),
                start: [edge.start.0, edge.start.1],
                control: [edge.control.0, edge.control.1],
                end: [edge.end.0, edge.end.1],
                curvature: edge.curvature,
                label_anchor: edge.label_anchor.map(|(x, y)| [x, y]),
                bidirectional: edge.bidirectional,
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            nodes,
            clusters,
            edges,
            diagnostics: layout.diagnostics.clone(),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
