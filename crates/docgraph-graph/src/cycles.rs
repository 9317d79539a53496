use crate::ModuleGraph;
use docgraph_core::ModuleId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Find every directed cycle reachable in the graph using three-color
/// depth-first traversal: a back edge to a grey (on-stack) node closes
/// a cycle, and traversal restarts from each still-white node until
/// none remain.
///
/// Cycles are returned as node sequences in canonical form (rotated so
/// the smallest id comes first, deduplicated, sorted), so the same
/// cycle is reported identically regardless of traversal start order.
/// The traversal itself is iterative so deep graphs cannot overflow
/// the call stack.
pub fn find_cycles(graph: &ModuleGraph) -> Vec<Vec<ModuleId>> {
    let mut color: HashMap<&str, Color> = graph
        .node_ids()
        .iter()
        .map(|id| (leak_ref(graph, id), Color::White))
        .collect();
    let ids = graph.node_ids();

    let mut found: HashSet<Vec<ModuleId>> = HashSet::new();

    for start in &ids {
        if color[start.as_str()] != Color::White {
            continue;
        }
        // Stack frames: (node, index of next neighbor to visit).
        let mut stack: Vec<(ModuleId, usize)> = vec![(start.clone(), 0)];
        let mut path: Vec<ModuleId> = vec![start.clone()];
        *color.get_mut(start.as_str()).unwrap() = Color::Grey;

        while let Some((node, next)) = stack.last().cloned() {
            let neighbors = graph.dependencies_of(&node);
            if next < neighbors.len() {
                stack.last_mut().unwrap().1 += 1;
                let target = &neighbors[next];
                match color[target.as_str()] {
                    Color::White => {
                        *color.get_mut(target.as_str()).unwrap() = Color::Grey;
                        stack.push((target.clone(), 0));
                        path.push(target.clone());
                    }
                    Color::Grey => {
                        let pos = path
                            .iter()
                            .position(|p| p == target)
                            .expect("grey node is on the current path");
                        found.insert(canonicalize(&path[pos..]));
                    }
                    Color::Black => {}
                }
            } else {
                *color.get_mut(node.as_str()).unwrap() = Color::Black;
                stack.pop();
                path.pop();
            }
        }
    }

    let mut cycles: Vec<Vec<ModuleId>> = found.into_iter().collect();
    cycles.sort();
    cycles
}

/// Rotate a cycle so its lexicographically smallest node comes first.
fn canonicalize(cycle: &[ModuleId]) -> Vec<ModuleId> {
    let min = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| id.as_str())
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[min..]);
    rotated.extend_from_slice(&cycle[..min]);
    rotated
}

// Borrow a key with the graph's lifetime for the color map.
fn leak_ref<'g>(graph: &'g ModuleGraph, id: &str) -> &'g str {
    graph
        .node(id)
        .map(|n| n.id.as_str())
        .expect("id comes from the graph's own node list")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_info;

    fn graph_with_edges(nodes: &[&str], edges: &[(&str, &str)]) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        for n in nodes {
            graph.add_node(n.to_string(), test_info(n));
        }
        for (s, t) in edges {
            graph.add_edge(&s.to_string(), &t.to_string());
        }
        graph.finalize();
        graph
    }

    #[test]
    fn acyclic_graph_reports_no_cycles() {
        let graph = graph_with_edges(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn two_node_cycle_is_reported_once() {
        let graph = graph_with_edges(&["a", "b"], &[("a", "b"), ("b", "a")]);
        assert_eq!(find_cycles(&graph), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn three_node_cycle_is_exact_regardless_of_start_order() {
        // a -> b -> c -> a, plus an acyclic spur d -> a.
        let graph = graph_with_edges(
            &["d", "c", "b", "a"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "a")],
        );
        let cycles = find_cycles(&graph);
        assert_eq!(
            cycles,
            vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]
        );
    }

    #[test]
    fn multiple_disjoint_cycles_are_all_found() {
        let graph = graph_with_edges(
            &["a", "b", "x", "y", "z"],
            &[("a", "b"), ("b", "a"), ("x", "y"), ("y", "z"), ("z", "x")],
        );
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(cycles.contains(&vec![
            "x".to_string(),
            "y".to_string(),
            "z".to_string()
        ]));
    }

    #[test]
    fn overlapping_cycles_are_distinct() {
        // a -> b -> a and a -> c -> a share the node a.
        let graph = graph_with_edges(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "a"), ("a", "c"), ("c", "a")],
        );
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 2);
    }
}
