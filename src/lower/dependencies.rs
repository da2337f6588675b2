//! Authoritative dependency edges, recomputed from field contents.
//!
//! Edges supplied by the host are display hints and are never consulted here.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::reference::scan_references;
use crate::parse::types::{Edge, Node, NodeData};

/// `node id → ids of the nodes it references`. Every node is a key.
pub fn build_dependencies(data: &BTreeMap<String, NodeData>) -> BTreeMap<String, BTreeSet<String>> {
    data.iter()
        .map(|(id, node)| {
            let deps = node
                .text_fields()
                .into_iter()
                .flat_map(scan_references)
                .map(|r| r.node_id)
                .filter(|dep| *dep != id.as_str())
                .map(str::to_string)
                .collect();
            (id.clone(), deps)
        })
        .collect()
}

/// Dependencies between the nodes that are emitted on their own.
///
/// A package's child resources are created by the package's `run`, so a
/// reference to a child becomes a dependency on the parent package. Children
/// have no entry of their own, and a package never depends on itself.
pub fn primary_dependencies(
    nodes: &[Node],
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let parents: HashMap<&str, &str> = nodes
        .iter()
        .filter_map(|n| n.parent_node.as_deref().map(|p| (n.id.as_str(), p)))
        .collect();
    let owner = |id: &str| parents.get(id).copied().unwrap_or(id).to_string();

    dependencies
        .iter()
        .filter(|(id, _)| !parents.contains_key(id.as_str()))
        .map(|(id, deps)| {
            let deps = deps
                .iter()
                .map(|dep| owner(dep.as_str()))
                .filter(|dep| dep != id)
                .collect();
            (id.clone(), deps)
        })
        .collect()
}

/// Flatten a dependency map into `source → target` edges.
pub fn dependency_edges(dependencies: &BTreeMap<String, BTreeSet<String>>) -> Vec<Edge> {
    dependencies
        .iter()
        .flat_map(|(target, sources)| sources.iter().map(move |source| Edge::new(source, target)))
        .collect()
}
