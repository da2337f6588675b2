//! Lowering phase: ResourceGraph → ScriptIR.
//!
//! Resolves variables, recomputes the dependency edges from field contents,
//! orders the nodes and builds the statements consumed by codegen.
//! SYNC NOTE: When node types change in `parse::types`, re-check this
//! orchestrator and the lower submodules for full coverage.

pub mod builder;
pub mod dependencies;
pub mod reference;
pub mod topo;
pub mod variables;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::CompileError;
use crate::ir::types::ScriptIR;
use crate::parse::graph::DependencyGraph;
use crate::parse::types::{Node, ResourceGraph};

pub use variables::Variable;

/// Result of lowering, with the intermediate products the host may want to
/// show (variables for mention pickers, authoritative edges for display).
///
/// `dependencies` covers every node, package children included; `order`
/// holds only the nodes that get their own statement.
#[derive(Debug, Clone)]
pub struct LoweredGraph {
    pub ir: ScriptIR,
    pub variables: Vec<Variable>,
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
    pub order: Vec<String>,
}

/// Lower a resource graph into a ScriptIR.
///
/// `prior` is the graph recovered from the previous script, if any; services
/// it declared that are gone from `graph` get removal statements.
pub fn lower(
    graph: &ResourceGraph,
    prior: Option<&ResourceGraph>,
) -> Result<LoweredGraph, Vec<CompileError>> {
    // 1. Variables
    let variables = variables::resolve_variables(&graph.data);
    let lookup = variables::variable_lookup(&variables);
    debug!(count = variables.len(), "resolved variables");

    // 2. Authoritative edges
    let dependencies = dependencies::build_dependencies(&graph.data);
    debug!(
        edges = dependencies.values().map(BTreeSet::len).sum::<usize>(),
        "built dependency edges"
    );

    // 3. Topological sort over the nodes emitted on their own
    let primary: Vec<Node> = graph.nodes.iter().filter(|n| n.is_primary()).cloned().collect();
    let ordering = dependencies::primary_dependencies(&graph.nodes, &dependencies);
    let dep_graph = DependencyGraph::build(&primary, &ordering);
    let order = topo::topo_sort(&dep_graph).map_err(|e| vec![e])?;
    debug!(?order, "sorted nodes");

    // 4. Statements
    let built = builder::build_statements(&order, &graph.data, &lookup)?;

    // 5. Stale services
    let removals = prior
        .map(|prior| builder::build_removals(graph, prior))
        .unwrap_or_default();
    if !removals.is_empty() {
        debug!(count = removals.len(), "removing stale services");
    }

    Ok(LoweredGraph {
        ir: ScriptIR {
            imports: built.imports,
            body: built.body,
            removals,
        },
        variables,
        dependencies,
        order,
    })
}
