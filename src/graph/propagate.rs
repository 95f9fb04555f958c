//! Settings propagation and link closure.
//!
//! This module computes the effective settings of every target by pulling
//! exported settings from its dependencies, and the list of libraries each
//! final-link target has to link.
//!
//! Key principle: `export` flows through chains of propagating edges,
//! `direct_export` only reaches direct dependents, plain `settings` never
//! leave the target.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::core::{EdgeKind, Settings, TargetKind};
use crate::graph::{dependency_edges, TargetGraph};

/// Compute the effective settings of every node, indexed by node index.
///
/// Algorithm, per target:
/// 1. Walk propagating edges depth-first, dependencies before dependents,
///    visiting each dependency once; merge each reached target's `export`
/// 2. Merge `direct_export` of direct propagating dependencies
/// 3. Merge the target's own `export`, then its own `settings`
///
/// Steps 1 and 2 skip list entries that are already present.
pub fn flatten(graph: &TargetGraph) -> Vec<Settings> {
    graph
        .node_indices()
        .map(|node| {
            let reached = collect_propagated(graph, node);

            let mut settings = Settings::new();
            for dep in reached {
                settings.merge_unique(&graph[dep].export);
            }
            for (dep, kind) in dependency_edges(graph, node) {
                if kind.propagates() {
                    settings.merge_unique(&graph[dep].direct_export);
                }
            }

            let target = &graph[node];
            settings.merge(&target.export);
            settings.merge(&target.settings);
            settings
        })
        .collect()
}

/// Pending dependencies of one node on an explicit walk stack.
struct Frame {
    deps: Vec<NodeIndex>,
    next: usize,
}

impl Frame {
    fn new(graph: &TargetGraph, node: NodeIndex, follow: fn(&EdgeKind) -> bool) -> Self {
        let deps = dependency_edges(graph, node)
            .into_iter()
            .filter(|(_, kind)| follow(kind))
            .map(|(dep, _)| dep)
            .collect();
        Frame { deps, next: 0 }
    }

    fn advance(&mut self) -> Option<NodeIndex> {
        let dep = self.deps.get(self.next).copied();
        self.next += 1;
        dep
    }
}

/// Targets reachable from `root` through propagating edges, each once,
/// dependencies before dependents.
fn collect_propagated(graph: &TargetGraph, root: NodeIndex) -> Vec<NodeIndex> {
    let mut visited = HashSet::from([root]);
    let mut out = Vec::new();
    let mut stack = vec![(root, Frame::new(graph, root, EdgeKind::propagates))];

    while let Some((node, frame)) = stack.last_mut() {
        match frame.advance() {
            Some(dep) => {
                if visited.insert(dep) {
                    stack.push((dep, Frame::new(graph, dep, EdgeKind::propagates)));
                }
            }
            None => {
                let node = *node;
                stack.pop();
                if node != root {
                    out.push(node);
                }
            }
        }
    }
    out
}

/// Compute the libraries each node links, indexed by node index.
///
/// Only executables and shared libraries link. The walk follows linking
/// edges, records every library reached, and descends through static
/// libraries and groups; a shared library or executable ends the walk
/// since it links its own dependencies. Dependents come before their
/// dependencies.
pub fn link_closure(graph: &TargetGraph) -> Vec<Vec<NodeIndex>> {
    graph
        .node_indices()
        .map(|node| {
            if graph[node].kind.is_final_link() {
                walk_links(graph, node)
            } else {
                Vec::new()
            }
        })
        .collect()
}

fn walk_links(graph: &TargetGraph, root: NodeIndex) -> Vec<NodeIndex> {
    let mut visited = HashSet::from([root]);
    let mut out = Vec::new();
    let mut stack = vec![Frame::new(graph, root, EdgeKind::links)];

    while let Some(frame) = stack.last_mut() {
        let Some(dep) = frame.advance() else {
            stack.pop();
            continue;
        };
        if !visited.insert(dep) {
            continue;
        }
        let dep_kind = graph[dep].kind;
        if dep_kind.is_library() {
            out.push(dep);
        }
        if matches!(dep_kind, TargetKind::StaticLibrary | TargetKind::None) {
            stack.push(Frame::new(graph, dep, EdgeKind::links));
        }
    }
    out
}
