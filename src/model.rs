use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Category,
    Subcategory,
    Leaf,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub role: NodeRole,
    /// Innermost cluster containing this node. `None` for category
    /// headers and unclustered leaves.
    pub cluster_id: Option<String>,
    pub file_path: Option<String>,
    pub importance: Option<f32>,
    /// Insertion index, used wherever a pass needs input order.
    pub order: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// Synthesized from the cluster tree; drawn as straight segments
    /// and invisible to ranking.
    Containment,
    /// Domain edge whose endpoints share a top-level cluster.
    Relationship,
    /// Domain edge spanning top-level clusters or touching an
    /// unclustered node.
    CrossCluster,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: Option<String>,
    /// Set by cycle breaking; ranking follows the flipped direction,
    /// routing always uses the original one.
    pub reversed: bool,
}

impl Edge {
    /// Endpoints in the direction ranking should follow.
    pub fn ranking_endpoints(&self) -> (&str, &str) {
        if self.reversed {
            (&self.target, &self.source)
        } else {
            (&self.source, &self.target)
        }
    }

    pub fn is_ranking_edge(&self) -> bool {
        self.kind != EdgeKind::Containment
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    /// Member node ids in input order, sanitized.
    pub members: Vec<String>,
    /// Parent category for subcategories, `None` for categories.
    pub parent: Option<String>,
}

/// Everything the sanitizer dropped, by synthesized edge id or member
/// node id. Carried through to the layout output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub dropped_edges: Vec<String>,
    pub dropped_members: Vec<String>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.dropped_edges.is_empty() && self.dropped_members.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: BTreeMap<String, Node>,
    pub edges: Vec<Edge>,
    /// Categories first, then subcategories, each in input order.
    pub clusters: Vec<Cluster>,
}

impl Graph {
    pub fn ensure_node(&mut self, id: &str, label: Option<String>, role: Option<NodeRole>) {
        let order = self.nodes.len();
        let entry = self.nodes.entry(id.to_string()).or_insert(Node {
            id: id.to_string(),
            label: id.to_string(),
            role: NodeRole::Leaf,
            cluster_id: None,
            file_path: None,
            importance: None,
            order,
        });
        if let Some(label) = label {
            entry.label = label;
        }
        if let Some(role) = role {
            entry.role = role;
        }
    }

    /// Node ids sorted by insertion order.
    pub fn nodes_in_order(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|node| node.order);
        nodes
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    /// Top-level category containing a node, following one parent hop
    /// for subcategory membership.
    pub fn top_level_cluster(&self, node_id: &str) -> Option<&str> {
        let node = self.nodes.get(node_id)?;
        if node.role == NodeRole::Category {
            return Some(&node.id);
        }
        let cluster = self.cluster(node.cluster_id.as_deref()?)?;
        match &cluster.parent {
            Some(parent) => Some(parent.as_str()),
            None => Some(cluster.id.as_str()),
        }
    }

    pub fn ranking_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|edge| edge.is_ranking_edge())
    }
}

// ── Input contract ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInput {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub importance: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInput {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryInput {
    pub id: String,
    pub label: String,
    pub category: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInput {
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub edges: Vec<EdgeInput>,
    #[serde(default)]
    pub categories: Vec<CategoryInput>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryInput>,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid graph JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn parse_graph(source: &str) -> Result<GraphInput, InputError> {
    Ok(serde_json::from_str(source)?)
}

impl Graph {
    /// Builds the typed graph from the input document. Dangling edge
    /// endpoints and unknown cluster members are dropped, never fatal;
    /// every drop lands in `Diagnostics` and a `tracing` warning.
    pub fn from_input(input: &GraphInput) -> (Graph, Diagnostics) {
        let mut graph = Graph::default();
        let mut diagnostics = Diagnostics::default();

        for node in &input.nodes {
            graph.ensure_node(&node.id, Some(node.label.clone()), None);
            if let Some(entry) = graph.nodes.get_mut(&node.id) {
                entry.file_path = node.file_path.clone();
                entry.importance = node.importance;
            }
        }

        // Cluster definitions materialize their header nodes.
        for category in &input.categories {
            graph.ensure_node(
                &category.id,
                Some(category.label.clone()),
                Some(NodeRole::Category),
            );
            graph.clusters.push(Cluster {
                id: category.id.clone(),
                label: category.label.clone(),
                members: Vec::new(),
                parent: None,
            });
        }
        for subcategory in &input.subcategories {
            graph.ensure_node(
                &subcategory.id,
                Some(subcategory.label.clone()),
                Some(NodeRole::Subcategory),
            );
            if let Some(node) = graph.nodes.get_mut(&subcategory.id) {
                node.cluster_id = Some(subcategory.category.clone());
            }
            graph.clusters.push(Cluster {
                id: subcategory.id.clone(),
                label: subcategory.label.clone(),
                members: Vec::new(),
                parent: Some(subcategory.category.clone()),
            });
        }

        graph.assign_members(input, &mut diagnostics);
        graph.synthesize_domain_edges(input, &mut diagnostics);
        graph.synthesize_containment_edges();

        (graph, diagnostics)
    }

    fn assign_members(&mut self, input: &GraphInput, diagnostics: &mut Diagnostics) {
        let member_lists: Vec<(String, Vec<String>)> = input
            .categories
            .iter()
            .map(|category| (category.id.clone(), category.members.clone()))
            .chain(
                input
                    .subcategories
                    .iter()
                    .map(|subcategory| (subcategory.id.clone(), subcategory.members.clone())),
            )
            .collect();

        for (cluster_id, members) in member_lists {
            for member in members {
                let Some(node) = self.nodes.get_mut(&member) else {
                    tracing::warn!(cluster = %cluster_id, member = %member, "dropping unknown cluster member");
                    diagnostics.dropped_members.push(member);
                    continue;
                };
                if node.role != NodeRole::Leaf {
                    tracing::warn!(cluster = %cluster_id, member = %member, "ignoring header listed as member");
                    continue;
                }
                if let Some(existing) = &node.cluster_id {
                    tracing::warn!(
                        cluster = %cluster_id,
                        member = %member,
                        existing = %existing,
                        "ignoring duplicate cluster membership"
                    );
                    continue;
                }
                node.cluster_id = Some(cluster_id.clone());
                if let Some(cluster) = self
                    .clusters
                    .iter_mut()
                    .find(|cluster| cluster.id == cluster_id)
                {
                    cluster.members.push(member);
                }
            }
        }
    }

    fn synthesize_domain_edges(&mut self, input: &GraphInput, diagnostics: &mut Diagnostics) {
        for (index, edge) in input.edges.iter().enumerate() {
            let id = format!("e{index}");
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                tracing::warn!(
                    edge = %id,
                    source = %edge.source,
                    target = %edge.target,
                    "dropping edge with unknown endpoint"
                );
                diagnostics.dropped_edges.push(id);
                continue;
            }
            let source_top = self.top_level_cluster(&edge.source).map(str::to_string);
            let target_top = self.top_level_cluster(&edge.target).map(str::to_string);
            let kind = match (source_top, target_top) {
                (Some(a), Some(b)) if a == b => EdgeKind::Relationship,
                _ => EdgeKind::CrossCluster,
            };
            self.edges.push(Edge {
                id,
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind,
                label: edge.label.clone(),
                reversed: false,
            });
        }
    }

    fn synthesize_containment_edges(&mut self) {
        let mut counter = 0usize;
        let mut push = |edges: &mut Vec<Edge>, source: &str, target: &str| {
            edges.push(Edge {
                id: format!("c{counter}"),
                source: source.to_string(),
                target: target.to_string(),
                kind: EdgeKind::Containment,
                label: None,
                reversed: false,
            });
            counter += 1;
        };

        let mut edges = std::mem::take(&mut self.edges);
        for cluster in &self.clusters {
            if let Some(parent) = &cluster.parent {
                push(&mut edges, parent, &cluster.id);
            }
        }
        for cluster in &self.clusters {
            for member in &cluster.members {
                push(&mut edges, &cluster.id, member);
            }
        }
        self.edges = edges;
    }
}
