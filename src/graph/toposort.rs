//! Cycle detection and topological ordering.
//!
//! A three-colour depth-first search: roots are visited in declaration
//! order (units in load order), dependencies in declaration order, and a
//! target is emitted once all of its dependencies have been. Every edge kind
//! takes part, including order-only edges.

use petgraph::graph::NodeIndex;

use crate::error::{Error, Result};
use crate::graph::{dependency_edges, TargetGraph};

/// Visitation state of a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// A node on the search path and the next dependency to look at.
struct Frame {
    node: NodeIndex,
    deps: Vec<NodeIndex>,
    next: usize,
}

struct Sorter<'a> {
    graph: &'a TargetGraph,
    marks: Vec<Mark>,
    path: Vec<Frame>,
    order: Vec<NodeIndex>,
}

/// Order the graph so every dependency precedes its dependents.
///
/// Fails with [`Error::CyclicDependency`] on the first cycle found. The
/// reported path starts and ends at the target that closed the cycle.
///
/// The search keeps its own stack, so chain depth is bounded by memory and
/// not by the thread's stack.
pub fn sort(graph: &TargetGraph) -> Result<Vec<NodeIndex>> {
    let mut sorter = Sorter {
        graph,
        marks: vec![Mark::Unvisited; graph.node_count()],
        path: Vec::new(),
        order: Vec::with_capacity(graph.node_count()),
    };

    for root in graph.node_indices() {
        if sorter.marks[root.index()] == Mark::Unvisited {
            sorter.visit(root)?;
        }
    }

    Ok(sorter.order)
}

impl Sorter<'_> {
    fn visit(&mut self, root: NodeIndex) -> Result<()> {
        self.enter(root);

        while let Some(frame) = self.path.last_mut() {
            let Some(&dep) = frame.deps.get(frame.next) else {
                let node = frame.node;
                self.path.pop();
                self.marks[node.index()] = Mark::Done;
                self.order.push(node);
                continue;
            };
            frame.next += 1;

            match self.marks[dep.index()] {
                Mark::Done => {}
                Mark::InProgress => return Err(self.cycle_error(dep)),
                Mark::Unvisited => self.enter(dep),
            }
        }

        Ok(())
    }

    fn enter(&mut self, node: NodeIndex) {
        self.marks[node.index()] = Mark::InProgress;
        let deps = dependency_edges(self.graph, node)
            .into_iter()
            .map(|(dep, _)| dep)
            .collect();
        self.path.push(Frame {
            node,
            deps,
            next: 0,
        });
    }

    fn cycle_error(&self, node: NodeIndex) -> Error {
        let start = self.path.iter().position(|f| f.node == node).unwrap_or(0);
        let cycle = self.path[start..]
            .iter()
            .map(|f| f.node)
            .chain(std::iter::once(node))
            .map(|n| self.graph[n].id.clone())
            .collect();
        Error::CyclicDependency { cycle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EdgeKind, TargetDefinition, TargetId, TargetKind};

    fn graph(nodes: &[&str], edges: &[(usize, usize, EdgeKind)]) -> TargetGraph {
        let mut graph = TargetGraph::new();
        let idx: Vec<NodeIndex> = nodes
            .iter()
            .map(|n| {
                graph.add_node(TargetDefinition::new(
                    TargetId::new("u.toml", *n),
                    TargetKind::None,
                ))
            })
            .collect();
        for (from, to, kind) in edges {
            graph.add_edge(idx[*from], idx[*to], *kind);
        }
        graph
    }

    fn names(graph: &TargetGraph, order: &[NodeIndex]) -> Vec<String> {
        order.iter().map(|n| graph[*n].name().to_string()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        // app -> lib -> base, app -> base
        let g = graph(
            &["app", "lib", "base"],
            &[
                (0, 1, EdgeKind::Propagate),
                (1, 2, EdgeKind::Propagate),
                (0, 2, EdgeKind::LinkOnly),
            ],
        );
        let order = sort(&g).unwrap();
        assert_eq!(names(&g, &order), vec!["base", "lib", "app"]);
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let g = graph(
            &["app", "z", "a"],
            &[(0, 1, EdgeKind::Propagate), (0, 2, EdgeKind::Propagate)],
        );
        let order = sort(&g).unwrap();
        assert_eq!(names(&g, &order), vec!["z", "a", "app"]);
    }

    #[test]
    fn test_cycle_path_closes_on_itself() {
        let g = graph(
            &["A", "B", "C"],
            &[
                (0, 1, EdgeKind::Propagate),
                (1, 2, EdgeKind::Propagate),
                (2, 0, EdgeKind::Propagate),
            ],
        );
        match sort(&g).unwrap_err() {
            Error::CyclicDependency { cycle } => {
                let names: Vec<&str> = cycle.iter().map(|id| id.name()).collect();
                assert_eq!(names, vec!["A", "B", "C", "A"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_order_edges_participate_in_cycles() {
        let g = graph(
            &["gen", "lib"],
            &[(0, 1, EdgeKind::Order), (1, 0, EdgeKind::Propagate)],
        );
        assert!(matches!(sort(&g), Err(Error::CyclicDependency { .. })));
    }

    #[test]
    fn test_deep_chain_does_not_exhaust_stack() {
        const DEPTH: usize = 100_000;
        let mut g = TargetGraph::new();
        let nodes: Vec<NodeIndex> = (0..DEPTH)
            .map(|i| {
                g.add_node(TargetDefinition::new(
                    TargetId::new("u.toml", format!("t{}", i)),
                    TargetKind::StaticLibrary,
                ))
            })
            .collect();
        for pair in nodes.windows(2) {
            g.add_edge(pair[0], pair[1], EdgeKind::Propagate);
        }

        let order = sort(&g).unwrap();
        assert_eq!(order.first(), nodes.last());
        assert_eq!(order.last(), nodes.first());

        g.add_edge(nodes[DEPTH - 1], nodes[0], EdgeKind::Order);
        match sort(&g).unwrap_err() {
            Error::CyclicDependency { cycle } => assert_eq!(cycle.len(), DEPTH + 1),
            other => panic!("unexpected error: {}", other),
        }
    }

    /// Small deterministic generator so graph shapes vary without a seed file.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, n: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) % n as u64) as usize
        }
    }

    fn generated(rng: &mut Lcg, size: usize) -> TargetGraph {
        let names: Vec<String> = (0..size).map(|i| format!("n{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut edges = Vec::new();
        for from in 0..size {
            for _ in 0..rng.below(4) {
                // Edges only point to later nodes, so the graph is acyclic.
                if from + 1 < size {
                    let to = from + 1 + rng.below(size - from - 1);
                    edges.push((from, to, EdgeKind::Propagate));
                }
            }
        }
        graph(&names, &edges)
    }

    #[test]
    fn test_generated_graphs_order_every_edge() {
        let mut rng = Lcg(7);
        for _ in 0..200 {
            let size = 1 + rng.below(30);
            let g = generated(&mut rng, size);
            let order = sort(&g).unwrap();
            assert_eq!(order.len(), g.node_count());

            let mut position = vec![usize::MAX; g.node_count()];
            for (i, node) in order.iter().enumerate() {
                position[node.index()] = i;
            }
            for edge in g.edge_indices() {
                let (dependent, dependency) = g.edge_endpoints(edge).unwrap();
                assert!(position[dependency.index()] < position[dependent.index()]);
            }
        }
    }

    #[test]
    fn test_generated_cycles_are_real_paths() {
        let mut rng = Lcg(11);
        for _ in 0..200 {
            let size = 2 + rng.below(30);
            let mut g = generated(&mut rng, size);
            let a = NodeIndex::new(rng.below(size));
            let b = NodeIndex::new(rng.below(size));
            g.add_edge(a, b, EdgeKind::Propagate);
            g.add_edge(b, a, EdgeKind::Order);

            let cycle = match sort(&g).unwrap_err() {
                Error::CyclicDependency { cycle } => cycle,
                other => panic!("unexpected error: {}", other),
            };
            assert!(cycle.len() >= 2);
            assert_eq!(cycle.first(), cycle.last());

            let node = |id: &TargetId| {
                g.node_indices()
                    .find(|n| &g[*n].id == id)
                    .unwrap()
            };
            for step in cycle.windows(2) {
                assert!(g.find_edge(node(&step[0]), node(&step[1])).is_some());
            }
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let g = graph(&["x"], &[(0, 0, EdgeKind::Propagate)]);
        match sort(&g).unwrap_err() {
            Error::CyclicDependency { cycle } => assert_eq!(cycle.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }
}
