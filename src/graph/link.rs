//! Dependency graph builder.
//!
//! Consumes loaded units, resolves every dependency reference to a target,
//! validates the result is acyclic and computes the derived data
//! (build order, flattened settings, link closure).

use std::collections::HashMap;
use std::path::Path;

use petgraph::graph::NodeIndex;
use tracing::{debug, info_span, trace};

use crate::core::{DescriptionUnit, TargetId, TargetRef};
use crate::error::{Error, Result};
use crate::graph::{propagate, toposort, BuildGraph, TargetGraph};
use crate::util::paths::relative_to_unit;

/// Builds a [`BuildGraph`] from loaded units.
pub struct GraphBuilder {
    units: Vec<DescriptionUnit>,
}

impl GraphBuilder {
    /// Take ownership of the units' targets.
    pub fn new(units: Vec<DescriptionUnit>) -> Self {
        GraphBuilder { units }
    }

    /// Link, validate and flatten.
    pub fn build(self) -> Result<BuildGraph> {
        let mut graph = TargetGraph::new();
        let mut index = HashMap::new();

        for unit in self.units {
            for target in unit.into_targets() {
                // Units are de-duplicated on load and names are unique within
                // a unit, so ids are unique here.
                let id = target.id.clone();
                let node = graph.add_node(target);
                index.insert(id, node);
            }
        }

        let nodes: Vec<NodeIndex> = graph.node_indices().collect();
        for node in nodes {
            let from = graph[node].id.clone();
            let deps = graph[node].dependencies.clone();
            for dep in deps {
                let to_id = resolve_reference(&from, &dep.reference, &index)?;
                let to = index[&to_id];
                if graph.find_edge(node, to).is_some() {
                    trace!(from = %from, to = %to_id, "ignoring repeated dependency");
                    continue;
                }
                debug!(from = %from, to = %to_id, kind = ?dep.kind, "linked dependency");
                graph.add_edge(node, to, dep.kind);
            }
        }

        let order = {
            let _span = info_span!("sort").entered();
            toposort::sort(&graph)?
        };

        let effective = propagate::flatten(&graph);
        let links = propagate::link_closure(&graph);

        debug!(
            targets = graph.node_count(),
            edges = graph.edge_count(),
            "built dependency graph"
        );

        Ok(BuildGraph {
            graph,
            index,
            order,
            effective,
            links,
        })
    }
}

/// Resolve a reference made by `from`.
///
/// `name` names a target in the same unit; `path:name` names a target in
/// the unit at `path`, relative to the directory of `from`'s unit.
fn resolve_reference(
    from: &TargetId,
    reference: &str,
    index: &HashMap<TargetId, NodeIndex>,
) -> Result<TargetId> {
    let id = match TargetRef::parse(reference) {
        TargetRef::Local(name) => TargetId::new(from.unit(), name),
        TargetRef::Qualified { unit, name } => {
            TargetId::new(relative_to_unit(from.unit(), Path::new(unit)), name)
        }
    };

    if index.contains_key(&id) {
        Ok(id)
    } else {
        Err(Error::UnresolvedDependency {
            target: from.clone(),
            reference: reference.to_string(),
        })
    }
}
