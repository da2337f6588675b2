//! Full pipeline: validate → lower → IR validate → codegen → state trailer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codegen;
use crate::error::{CompileError, LoadError};
use crate::ir;
use crate::lower::{self, Variable};
use crate::parse::types::{Edge, ResourceGraph};
use crate::state;

/// Caller-tunable compile behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Append the `# EMUI_BUILD_STATE=` trailer.
    pub emit_build_state: bool,
    /// Remove services the prior script declared that are now gone.
    pub remove_stale_services: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            emit_build_state: true,
            remove_stale_services: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub script: String,
    /// Node ids in emission order.
    pub order: Vec<String>,
    /// Authoritative edges recomputed from field contents.
    pub edges: Vec<Edge>,
    pub variables: Vec<Variable>,
}

/// Compile a resource graph into an orchestration script.
///
/// `prior` is the graph recovered from the previously generated script.
pub fn compile(
    graph: &ResourceGraph,
    prior: Option<&ResourceGraph>,
    options: &CompileOptions,
) -> Result<CompileOutput, Vec<CompileError>> {
    // 1. Structural validation
    let errors = crate::validate::validate_graph(graph);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut graph = graph.clone();
    state::prune_orphan_data(&mut graph);

    // 2. Lower to IR
    let prior = prior.filter(|_| options.remove_stale_services);
    let lowered = lower::lower(&graph, prior)?;

    // 3. IR validation
    let errors = ir::validate_ir(&lowered.ir);
    if !errors.is_empty() {
        return Err(errors);
    }

    // 4. Codegen
    let mut script = codegen::codegen(&lowered.ir);
    if options.emit_build_state {
        script = state::append_state_trailer(&script, &graph)
            .map_err(|e| vec![CompileError::StateEncode(e.to_string())])?;
    }
    debug!(
        nodes = lowered.order.len(),
        bytes = script.len(),
        "generated script"
    );

    Ok(CompileOutput {
        script,
        edges: lower::dependencies::dependency_edges(&lowered.dependencies),
        order: lowered.order,
        variables: lowered.variables,
    })
}

/// Compile against the state embedded in a previous script.
///
/// A prior script without build state is treated as a fresh build; a trailer
/// that cannot be decoded is an error.
pub fn compile_with_prior_script(
    graph: &ResourceGraph,
    prior_script: Option<&str>,
    options: &CompileOptions,
) -> Result<CompileOutput, Vec<CompileError>> {
    let prior = match prior_script.map(state::load) {
        None => None,
        Some(Ok(prior)) => Some(prior),
        Some(Err(LoadError::MissingPriorState)) => {
            warn!("prior script carries no build state; compiling from scratch");
            None
        }
        Some(Err(e)) => return Err(vec![CompileError::from(e)]),
    };
    compile(graph, prior.as_ref(), options)
}

/// Variables offered by a set of node data, for the host's mention picker.
pub fn list_variables(data: &BTreeMap<String, crate::parse::types::NodeData>) -> Vec<Variable> {
    lower::variables::resolve_variables(data)
}
