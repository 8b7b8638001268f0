use std::collections::{HashMap, HashSet};

use crate::model::Graph;

/// Marks the minimal set of back edges found by a depth-first walk so
/// ranking sees an acyclic graph. Traversal follows the ranking
/// direction, so a graph that was already broken has no back edges
/// left and re-running changes nothing. Containment edges and
/// self-loops are never candidates.
pub(super) fn break_cycles(graph: &mut Graph) {
    let mut adj: HashMap<String, Vec<(String, usize)>> = HashMap::new();
    for (index, edge) in graph.edges.iter().enumerate() {
        if !edge.is_ranking_edge() {
            continue;
        }
        let (source, target) = edge.ranking_endpoints();
        if source == target {
            continue;
        }
        adj.entry(source.to_string())
            .or_default()
            .push((target.to_string(), index));
    }

    let roots: Vec<String> = graph
        .nodes_in_order()
        .iter()
        .map(|node| node.id.clone())
        .collect();

    let mut visited: HashSet<String> = HashSet::new();
    let mut in_stack: HashSet<String> = HashSet::new();
    let mut back: Vec<usize> = Vec::new();

    fn dfs(
        node: &str,
        adj: &HashMap<String, Vec<(String, usize)>>,
        visited: &mut HashSet<String>,
        in_stack: &mut HashSet<String>,
        back: &mut Vec<usize>,
    ) {
        visited.insert(node.to_string());
        in_stack.insert(node.to_string());
        if let Some(neighbors) = adj.get(node) {
            for (target, index) in neighbors {
                if in_stack.contains(target) {
                    back.push(*index);
                } else if !visited.contains(target) {
                    dfs(target, adj, visited, in_stack, back);
                }
            }
        }
        in_stack.remove(node);
    }

    for id in &roots {
        if !visited.contains(id) {
            dfs(id, &adj, &mut visited, &mut in_stack, &mut back);
        }
    }

    if !back.is_empty() {
        tracing::debug!(count = back.len(), "reversed back edges for ranking");
    }
    for index in back {
        graph.edges[index].reversed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Graph, GraphInput, parse_graph};

    fn graph_from(json: &str) -> Graph {
        let input: GraphInput = parse_graph(json).unwrap();
        Graph::from_input(&input).0
    }

    #[test]
    fn acyclic_input_is_untouched() {
        let mut graph = graph_from(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "b", "label": "b"},
                    {"id": "c", "label": "c"}
                ],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"source": "b", "target": "c"},
                    {"source": "a", "target": "c"}
                ]
            }"#,
        );
        break_cycles(&mut graph);
        assert!(graph.edges.iter().all(|edge| !edge.reversed));
    }

    #[test]
    fn cycle_gets_exactly_one_reversal_and_keeps_cardinality() {
        let mut graph = graph_from(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "b", "label": "b"},
                    {"id": "c", "label": "c"}
                ],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"source": "b", "target": "c"},
                    {"source": "c", "target": "a"}
                ]
            }"#,
        );
        break_cycles(&mut graph);
        let reversed: Vec<&str> = graph
            .edges
            .iter()
            .filter(|edge| edge.reversed)
            .map(|edge| edge.id.as_str())
            .collect();
        assert_eq!(reversed, vec!["e2"]);
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn rerunning_after_breaking_changes_nothing() {
        let mut graph = graph_from(
            r#"{
                "nodes": [
                    {"id": "a", "label": "a"},
                    {"id": "b", "label": "b"}
                ],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"source": "b", "target": "a"}
                ]
            }"#,
        );
        break_cycles(&mut graph);
        let first: Vec<bool> = graph.edges.iter().map(|edge| edge.reversed).collect();
        break_cycles(&mut graph);
        let second: Vec<bool> = graph.edges.iter().map(|edge| edge.reversed).collect();
        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|flag| **flag).count(), 1);
    }

    #[test]
    fn self_loops_are_left_alone() {
        let mut graph = graph_from(
            r#"{
                "nodes": [{"id": "a", "label": "a"}],
                "edges": [{"source": "a", "target": "a"}]
            }"#,
        );
        break_cycles(&mut graph);
        assert!(!graph.edges[0].reversed);
    }
}
