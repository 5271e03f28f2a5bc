//! Type Reference Graph
//!
//! Nodes are the named definitions of one namespace; edges are field-type
//! references between them. Each edge records whether the reference is held
//! inline or behind a heap-allocating container (array or map), which is what
//! decides whether a cycle needs boxing in generated code.

pub mod analysis;

pub use analysis::{compute_scc_analysis, SccAnalysis, SccGroup};

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::namespace::Namespace;

/// How a definition holds a referenced type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Stored inline (plain field, optional, union member)
    Direct,
    /// Stored behind an array or map
    Container,
}

/// Reference graph over one namespace
pub struct TypeGraph {
    pub(crate) graph: DiGraph<String, EdgeKind>,
    index: HashMap<String, NodeIndex>,
}

impl TypeGraph {
    /// Build the graph for every definition in `namespace`
    pub fn build(namespace: &Namespace) -> Self {
        let mut graph = DiGraph::with_capacity(namespace.len(), namespace.len() * 2);
        let mut index = HashMap::with_capacity(namespace.len());

        for definition in namespace.definitions() {
            let idx = graph.add_node(definition.name().to_string());
            index.insert(definition.name().to_string(), idx);
        }

        for definition in namespace.definitions() {
            let from = index[definition.name()];
            for ty in definition.type_refs() {
                let direct = ty.direct_names();
                for target in ty.all_names() {
                    let Some(&to) = index.get(target) else {
                        continue;
                    };
                    let kind = if direct.contains(&target) {
                        EdgeKind::Direct
                    } else {
                        EdgeKind::Container
                    };
                    if !graph.edges_connecting(from, to).any(|e| *e.weight() == kind) {
                        graph.add_edge(from, to, kind);
                    }
                }
            }
        }

        Self { graph, index }
    }

    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn type_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Names `name` references, sorted
    pub fn refs_out(&self, name: &str) -> Vec<&str> {
        let Some(idx) = self.node(name) else {
            return Vec::new();
        };
        let mut refs: Vec<&str> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].as_str())
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }
}
