//! Topological sort of the dependency graph.
//!
//! Layered Kahn: every round places all currently unblocked nodes in input
//! order, so the output is deterministic for a given node list.

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::error::CompileError;
use crate::parse::graph::DependencyGraph;

/// Returns node ids with every dependency ahead of its dependents.
pub fn topo_sort(graph: &DependencyGraph) -> Result<Vec<String>, CompileError> {
    let g = &graph.graph;
    let mut in_degree: Vec<usize> = g
        .node_indices()
        .map(|idx| {
            g.edges_directed(idx, Direction::Incoming)
                .filter(|e| e.source() != idx)
                .count()
        })
        .collect();

    let mut layer: Vec<NodeIndex> = g
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.node_count());

    while !layer.is_empty() {
        let mut next = Vec::new();
        for &idx in &layer {
            order.push(g[idx].clone());
            for edge in g.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                if target == idx {
                    continue;
                }
                in_degree[target.index()] -= 1;
                if in_degree[target.index()] == 0 {
                    next.push(target);
                }
            }
        }
        next.sort();
        layer = next;
    }

    if order.len() < graph.node_count() {
        let node_ids = g
            .node_indices()
            .filter(|idx| in_degree[idx.index()] > 0)
            .map(|idx| g[idx].clone())
            .collect();
        return Err(CompileError::CycleDetected { node_ids });
    }

    Ok(order)
}
