//! petgraph-based directed graph over the authoritative dependency edges.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use super::types::Node;

/// Nodes are inserted in input order, so `NodeIndex` order is the
/// tie-break order used by the topological sort.
pub struct DependencyGraph {
    pub graph: DiGraph<String, ()>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build from the node list and a `node → depends-on` map.
    ///
    /// Self-loops are dropped and edges naming an unknown node are skipped.
    pub fn build(nodes: &[Node], dependencies: &BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in nodes {
            if node_indices.contains_key(&node.id) {
                continue;
            }
            let idx = graph.add_node(node.id.clone());
            node_indices.insert(node.id.clone(), idx);
        }

        for (dependent, sources) in dependencies {
            let Some(&target) = node_indices.get(dependent) else {
                continue;
            };
            for source in sources {
                if source == dependent {
                    continue;
                }
                match node_indices.get(source) {
                    Some(&s) => {
                        graph.update_edge(s, target, ());
                    }
                    None => warn!(
                        node_id = %dependent,
                        missing = %source,
                        "dependency on unknown node ignored for ordering"
                    ),
                }
            }
        }

        DependencyGraph { graph, node_indices }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}
