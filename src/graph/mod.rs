//! The build graph.
//!
//! Once linked, a [`BuildGraph`] is read-only: every target, every resolved
//! dependency edge, the build order and the flattened settings are computed
//! up front by [`GraphBuilder`].

pub mod link;
pub mod propagate;
pub mod toposort;

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::core::{EdgeKind, Settings, TargetDefinition, TargetId};

pub use link::GraphBuilder;

/// Target graph: edges point from dependent to dependency.
pub type TargetGraph = DiGraph<TargetDefinition, EdgeKind>;

/// The linked, acyclic, ordered target graph.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    /// Targets and dependency edges
    graph: TargetGraph,

    /// Map from TargetId to node index
    index: HashMap<TargetId, NodeIndex>,

    /// Dependencies before dependents
    order: Vec<NodeIndex>,

    /// Flattened settings, by node index
    effective: Vec<Settings>,

    /// Libraries to link, by node index
    links: Vec<Vec<NodeIndex>>,
}

impl BuildGraph {
    /// Get a target by ID.
    pub fn target(&self, id: &TargetId) -> Option<&TargetDefinition> {
        self.index.get(id).map(|n| &self.graph[*n])
    }

    /// Check if a target exists.
    pub fn contains(&self, id: &TargetId) -> bool {
        self.index.contains_key(id)
    }

    /// All targets in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.graph.node_weights()
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Target IDs with every dependency before its dependents.
    pub fn build_order(&self) -> Vec<&TargetId> {
        self.order.iter().map(|n| &self.graph[*n].id).collect()
    }

    /// Targets in build order.
    pub fn ordered_targets(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.order.iter().map(|n| &self.graph[*n])
    }

    /// Direct dependencies of a target, in declaration order.
    pub fn dependencies(&self, id: &TargetId) -> Vec<(&TargetId, EdgeKind)> {
        match self.index.get(id) {
            Some(&node) => dependency_edges(&self.graph, node)
                .into_iter()
                .map(|(dep, kind)| (&self.graph[dep].id, kind))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Targets that depend directly on the given target.
    pub fn dependents(&self, id: &TargetId) -> Vec<&TargetId> {
        match self.index.get(id) {
            Some(&node) => {
                let mut dependents: Vec<NodeIndex> = self
                    .graph
                    .neighbors_directed(node, Direction::Incoming)
                    .collect();
                dependents.sort();
                dependents.dedup();
                dependents.into_iter().map(|n| &self.graph[n].id).collect()
            }
            None => Vec::new(),
        }
    }

    /// Settings after propagation from dependencies.
    pub fn effective_settings(&self, id: &TargetId) -> Option<&Settings> {
        self.index.get(id).map(|n| &self.effective[n.index()])
    }

    /// Libraries the target links, dependents before dependencies.
    pub fn link_dependencies(&self, id: &TargetId) -> Vec<&TargetId> {
        match self.index.get(id) {
            Some(node) => self.links[node.index()]
                .iter()
                .map(|n| &self.graph[*n].id)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Outgoing edges of `node` in the order they were declared.
///
/// petgraph walks adjacency lists newest first, so edges are re-sorted by
/// index, which follows insertion order.
pub(crate) fn dependency_edges(graph: &TargetGraph, node: NodeIndex) -> Vec<(NodeIndex, EdgeKind)> {
    let mut edges: Vec<_> = graph
        .edges(node)
        .map(|e| (e.id(), e.target(), *e.weight()))
        .collect();
    edges.sort_by_key(|(id, _, _)| *id);
    edges.into_iter().map(|(_, to, kind)| (to, kind)).collect()
}
