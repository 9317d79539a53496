use docgraph_core::{ModuleId, ModuleInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// "source imports target", both resolved to in-project modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: ModuleId,
    pub target: ModuleId,
}

/// One node of the project dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub info: ModuleInfo,
    pub complexity: f64,
}

/// Whole-project dependency graph. Read-only once built; the builder
/// either constructs it fully or returns the per-file error list
/// alongside, never a partially wired graph.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    nodes: HashMap<ModuleId, ModuleNode>,
    edges: Vec<DependencyEdge>,
    adjacency: HashMap<ModuleId, Vec<ModuleId>>,
    reverse: HashMap<ModuleId, Vec<ModuleId>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: ModuleId, info: ModuleInfo) {
        self.adjacency.entry(id.clone()).or_default();
        self.reverse.entry(id.clone()).or_default();
        self.nodes.insert(
            id.clone(),
            ModuleNode {
                id,
                info,
                complexity: 0.0,
            },
        );
    }

    /// Add an edge between two existing nodes. Self-loops are rejected
    /// here (the builder reports them as cycles instead); returns
    /// whether the edge was added.
    pub fn add_edge(&mut self, source: &ModuleId, target: &ModuleId) -> bool {
        if source == target {
            return false;
        }
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return false;
        }
        let edge = DependencyEdge {
            source: source.clone(),
            target: target.clone(),
        };
        if self.edges.contains(&edge) {
            return false;
        }
        self.adjacency
            .get_mut(source)
            .expect("adjacency row exists for every node")
            .push(target.clone());
        self.reverse
            .get_mut(target)
            .expect("reverse row exists for every node")
            .push(source.clone());
        self.edges.push(edge);
        true
    }

    /// Sort adjacency rows so traversal order is deterministic.
    pub(crate) fn finalize(&mut self) {
        for row in self.adjacency.values_mut() {
            row.sort_unstable();
        }
        for row in self.reverse.values_mut() {
            row.sort_unstable();
        }
    }

    pub fn node(&self, id: &str) -> Option<&ModuleNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut ModuleNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<_> = self.nodes.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Modules this one imports.
    pub fn dependencies_of(&self, id: &str) -> &[ModuleId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Modules that import this one.
    pub fn dependents_of(&self, id: &str) -> &[ModuleId] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// In-project edges touching the module: fan-in plus fan-out.
    pub fn degree(&self, id: &str) -> usize {
        self.dependencies_of(id).len() + self.dependents_of(id).len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
pub(crate) fn test_info(name: &str) -> ModuleInfo {
    use docgraph_core::Language;
    ModuleInfo {
        path: format!("{name}.py").into(),
        module_name: name.to_string(),
        language: Language::Python,
        imports: vec![],
        exports: vec![],
        function_count: 0,
        class_count: 0,
        line_count: 1,
        doc_comment: None,
        content_hash: format!("hash-{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_abc() -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        for name in ["a", "b", "c"] {
            graph.add_node(name.to_string(), test_info(name));
        }
        graph
    }

    #[test]
    fn edges_update_both_directions() {
        let mut graph = graph_abc();
        assert!(graph.add_edge(&"a".to_string(), &"b".to_string()));
        assert!(graph.add_edge(&"c".to_string(), &"b".to_string()));
        graph.finalize();

        assert_eq!(graph.dependencies_of("a"), ["b".to_string()]);
        assert_eq!(
            graph.dependents_of("b"),
            ["a".to_string(), "c".to_string()]
        );
        assert_eq!(graph.degree("b"), 2);
    }

    #[test]
    fn self_loops_and_duplicates_are_rejected() {
        let mut graph = graph_abc();
        assert!(!graph.add_edge(&"a".to_string(), &"a".to_string()));
        assert!(graph.add_edge(&"a".to_string(), &"b".to_string()));
        assert!(!graph.add_edge(&"a".to_string(), &"b".to_string()));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edges_require_both_endpoints() {
        let mut graph = graph_abc();
        assert!(!graph.add_edge(&"a".to_string(), &"missing".to_string()));
        assert_eq!(graph.edge_count(), 0);
    }
}
