use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::model::{EdgeKind, Graph};

use super::types::{Layout, NodeLayout, RoutedEdge};

// ── Degenerate geometry fallbacks ───────────────────────────────────
/// Offset direction used when both endpoints coincide and no chord
/// normal exists.
const DEGENERATE_PERP: (f32, f32) = (0.0, -1.0);
/// Chord lengths below this are treated as zero.
const EPSILON: f32 = 1e-3;

/// Routes every surviving edge as a quadratic segment. Reciprocal
/// domain edges are detected through an unordered-pair map and bowed
/// to opposite sides of their shared chord; at most one pair forms per
/// node pair, so a third parallel edge stays an ordinary segment and
/// self-loops never pair. Containment edges are drawn straight.
pub(super) fn route_edges(
    nodes: &BTreeMap<String, NodeLayout>,
    graph: &Graph,
    config: &LayoutConfig,
) -> Vec<RoutedEdge> {
    let pairs = detect_reciprocal_pairs(graph);
    let backward_of: HashMap<usize, usize> = pairs.iter().map(|p| (p.forward, p.backward)).collect();
    let consumed: HashSet<usize> = pairs.iter().map(|p| p.backward).collect();

    let mut routed = Vec::new();
    for (index, edge) in graph.edges.iter().enumerate() {
        if consumed.contains(&index) {
            continue;
        }
        let Some(source) = nodes.get(&edge.source) else {
            continue;
        };
        let Some(target) = nodes.get(&edge.target) else {
            continue;
        };

        if let Some(&backward) = backward_of.get(&index) {
            let partner = &graph.edges[backward];
            routed.extend(route_pair(edge, partner, source, target, config));
            continue;
        }

        routed.push(match edge.kind {
            EdgeKind::Containment => route_straight(edge, source, target),
            _ => route_lone(edge, source, target, config),
        });
    }
    routed
}

struct ReciprocalPair {
    forward: usize,
    backward: usize,
}

/// One slot per unordered node pair. Only the first edge seen in each
/// direction is remembered, and a slot pairs at most once.
#[derive(Default)]
struct PairSlot {
    ascending: Option<usize>,
    descending: Option<usize>,
    done: bool,
}

fn detect_reciprocal_pairs(graph: &Graph) -> Vec<ReciprocalPair> {
    let mut slots: HashMap<(String, String), PairSlot> = HashMap::new();
    let mut pairs = Vec::new();
    for (index, edge) in graph.edges.iter().enumerate() {
        if edge.kind == EdgeKind::Containment || edge.source == edge.target {
            continue;
        }
        let ascending = edge.source < edge.target;
        let key = if ascending {
            (edge.source.clone(), edge.target.clone())
        } else {
            (edge.target.clone(), edge.source.clone())
        };
        let slot = slots.entry(key).or_default();
        if slot.done {
            continue;
        }
        let side = if ascending {
            &mut slot.ascending
        } else {
            &mut slot.descending
        };
        if side.is_none() {
            *side = Some(index);
        }
        if let (Some(forward), Some(backward)) = (slot.ascending, slot.descending) {
            slot.done = true;
            pairs.push(ReciprocalPair { forward, backward });
        }
    }
    pairs
}

/// Both members of a reciprocal pair, computed in the forward chord's
/// frame so the signed curvatures land on opposite sides. The forward
/// member is the edge whose source id sorts first.
fn route_pair(
    forward: &crate::model::Edge,
    backward: &crate::model::Edge,
    source: &NodeLayout,
    target: &NodeLayout,
    config: &LayoutConfig,
) -> Vec<RoutedEdge> {
    let routing = &config.routing;
    let start = boundary_point(source, target.center());
    let end = boundary_point(target, source.center());
    let (perp, distance) = chord_normal(start, end);
    let mid = ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0);

    let curvature = (distance * routing.curvature_ratio)
        .clamp(routing.curvature_min, routing.curvature_max);
    let anchor_offset = (curvature + routing.label_clearance).max(routing.min_label_separation / 2.0);

    let segment = |edge: &crate::model::Edge, sign: f32, from: (f32, f32), to: (f32, f32)| {
        RoutedEdge {
            edge_id: forward.id.clone(),
            segment_id: if sign > 0.0 {
                format!("{}-forward", forward.id)
            } else {
                format!("{}-backward", forward.id)
            },
            source: edge.source.clone(),
            target: edge.target.clone(),
            kind: edge.kind,
            label: edge.label.clone(),
            start: from,
            control: (
                mid.0 + 2.0 * sign * curvature * perp.0,
                mid.1 + 2.0 * sign * curvature * perp.1,
            ),
            end: to,
            curvature: sign * curvature,
            label_anchor: Some((
                mid.0 + sign * anchor_offset * perp.0,
                mid.1 + sign * anchor_offset * perp.1,
            )),
            bidirectional: true,
        }
    };

    vec![
        segment(forward, 1.0, start, end),
        segment(backward, -1.0, end, start),
    ]
}

/// Ordinary domain edge. A gentle fixed bow keeps it visually apart
/// from containment segments.
fn route_lone(
    edge: &crate::model::Edge,
    source: &NodeLayout,
    target: &NodeLayout,
    config: &LayoutConfig,
) -> RoutedEdge {
    let routing = &config.routing;
    let start = boundary_point(source, target.center());
    let end = boundary_point(target, source.center());
    let (perp, _) = chord_normal(start, end);
    let mid = ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0);
    let curvature = routing.lone_edge_curvature;

    RoutedEdge {
        edge_id: edge.id.clone(),
        segment_id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        kind: edge.kind,
        label: edge.label.clone(),
        start,
        control: (
            mid.0 + 2.0 * curvature * perp.0,
            mid.1 + 2.0 * curvature * perp.1,
        ),
        end,
        curvature,
        label_anchor: edge.label.as_ref().map(|_| {
            let offset = curvature + routing.label_clearance;
            (mid.0 + offset * perp.0, mid.1 + offset * perp.1)
        }),
        bidirectional: false,
    }
}

fn route_straight(
    edge: &crate::model::Edge,
    source: &NodeLayout,
    target: &NodeLayout,
) -> RoutedEdge {
    let start = boundary_point(source, target.center());
    let end = boundary_point(target, source.center());
    let mid = ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0);
    RoutedEdge {
        edge_id: edge.id.clone(),
        segment_id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        kind: edge.kind,
        label: edge.label.clone(),
        start,
        control: mid,
        end,
        curvature: 0.0,
        label_anchor: None,
        bidirectional: false,
    }
}

/// Unit normal of the chord plus its length. Coincident endpoints fall
/// back to a fixed upward normal so downstream math stays finite.
fn chord_normal(start: (f32, f32), end: (f32, f32)) -> ((f32, f32), f32) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let distance = (dx * dx + dy * dy).sqrt();
    if distance < EPSILON {
        return (DEGENERATE_PERP, 0.0);
    }
    ((-dy / distance, dx / distance), distance)
}

/// Intersection of the node border with the ray from its center toward
/// `toward`. Falls back to the center itself when the ray has no
/// length.
fn boundary_point(node: &NodeLayout, toward: (f32, f32)) -> (f32, f32) {
    let center = node.center();
    let dx = toward.0 - center.0;
    let dy = toward.1 - center.1;
    let half_w = node.width / 2.0;
    let half_h = node.height / 2.0;
    if dx.abs() < EPSILON && dy.abs() < EPSILON {
        return center;
    }
    let tx = if dx.abs() < EPSILON {
        f32::INFINITY
    } else {
        half_w / dx.abs()
    };
    let ty = if dy.abs() < EPSILON {
        f32::INFINITY
    } else {
        half_h / dy.abs()
    };
    let t = tx.min(ty);
    (center.0 + dx * t, center.1 + dy * t)
}

// ── Pointer proximity ───────────────────────────────────────────────

/// Hover state for one reciprocal-pair segment.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelHit {
    pub edge_id: String,
    pub segment_id: String,
    pub hovered: bool,
}

/// Reports, for every reciprocal-pair segment, whether the pointer is
/// within the configured radius of its label anchor. Pure over the
/// routed layout; nothing is cached between calls.
pub fn bidirectional_label_hits(
    layout: &Layout,
    pointer: (f32, f32),
    config: &LayoutConfig,
) -> Vec<LabelHit> {
    let radius = config.routing.label_hit_radius;
    layout
        .edges
        .iter()
        .filter(|segment| segment.bidirectional)
        .map(|segment| {
            let hovered = segment.label_anchor.is_some_and(|(ax, ay)| {
                let dx = pointer.0 - ax;
                let dy = pointer.1 - ay;
                dx * dx + dy * dy <= radius * radius
            });
            LabelHit {
                edge_id: segment.edge_id.clone(),
                segment_id: segment.segment_id.clone(),
                hovered,
            }
        })
        .collect()
}
