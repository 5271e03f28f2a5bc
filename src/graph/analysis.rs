//! Cycle Analysis
//!
//! Computes strongly connected components over the inline references of a
//! [`TypeGraph`]. A reference from one type to another in the same component
//! would make the generated type infinitely sized, so the emitter boxes it.
//! References behind an array or map are already heap-allocated and never
//! take part in a component.

use std::collections::HashMap;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;

use super::{EdgeKind, TypeGraph};

/// A cycle of inline references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccGroup {
    pub id: usize,
    /// Member names, sorted
    pub members: Vec<String>,
    /// Single type holding itself inline
    pub is_self_referential: bool,
}

/// Cycle membership for every type of a namespace
#[derive(Debug, Clone, Default)]
pub struct SccAnalysis {
    pub groups: Vec<SccGroup>,
    membership: HashMap<String, usize>,
}

impl SccAnalysis {
    /// SCC group containing `name`, if it is part of a cycle
    pub fn group_of(&self, name: &str) -> Option<&SccGroup> {
        self.membership.get(name).map(|&id| &self.groups[id])
    }

    pub fn is_cyclic(&self, name: &str) -> bool {
        self.membership.contains_key(name)
    }

    /// Whether an inline reference from `from` to `to` closes a cycle
    pub fn needs_boxing(&self, from: &str, to: &str) -> bool {
        match (self.membership.get(from), self.membership.get(to)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Compute SCCs over the direct edges of `graph`
pub fn compute_scc_analysis(graph: &TypeGraph) -> SccAnalysis {
    // Same node indices, container edges dropped
    let direct: DiGraph<String, EdgeKind> = graph.graph.filter_map(
        |_, name| Some(name.clone()),
        |_, kind| (*kind == EdgeKind::Direct).then_some(*kind),
    );

    let mut components: Vec<Vec<String>> = Vec::new();
    let mut self_referential = Vec::new();

    for scc in kosaraju_scc(&direct) {
        let is_self_ref = scc.len() == 1 && direct.contains_edge(scc[0], scc[0]);
        if scc.len() == 1 && !is_self_ref {
            continue;
        }
        let mut members: Vec<String> = scc.iter().map(|&idx| direct[idx].clone()).collect();
        members.sort();
        components.push(members);
        self_referential.push(is_self_ref);
    }

    // kosaraju order depends on insertion order; sort for stable ids
    let mut order: Vec<usize> = (0..components.len()).collect();
    order.sort_by(|&a, &b| components[a].cmp(&components[b]));

    let mut analysis = SccAnalysis::default();
    for (id, original) in order.into_iter().enumerate() {
        for member in &components[original] {
            analysis.membership.insert(member.clone(), id);
        }
        analysis.groups.push(SccGroup {
            id,
            members: components[original].clone(),
            is_self_referential: self_referential[original],
        });
    }

    analysis
}
