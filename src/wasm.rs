//! WASM entry points for browser use.

use std::collections::BTreeMap;

use wasm_bindgen::prelude::*;

use crate::compile::{self, CompileOptions};
use crate::error::{CompileError, Phase};
use crate::lower::Variable;
use crate::parse::types::{Edge, NodeData};
use crate::state;

/// Full pipeline: parse → validate → lower → IR validate → codegen.
/// Returns a JSON object with either `script` (success) or `errors` (failure).
#[wasm_bindgen]
pub fn compile_graph(graph_json: &str, options_json: &str, prior_script: Option<String>) -> JsValue {
    let result = compile_graph_inner(graph_json, options_json, prior_script.as_deref());
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn compile_graph_inner(
    graph_json: &str,
    options_json: &str,
    prior_script: Option<&str>,
) -> CompileResult {
    // 1. Parse
    let graph = match crate::parse::parse(graph_json) {
        Ok(g) => g,
        Err(errors) => return CompileResult::errors(errors),
    };
    let options = match parse_options(options_json) {
        Ok(o) => o,
        Err(e) => return CompileResult::Errors(vec![e]),
    };

    // 2. Compile against the prior script, if any
    match compile::compile_with_prior_script(&graph, prior_script, &options) {
        Ok(output) => CompileResult::Success {
            script: output.script,
            order: output.order,
            edges: output.edges,
            variables: output.variables,
        },
        Err(errors) => CompileResult::errors(errors),
    }
}

fn parse_options(options_json: &str) -> Result<CompileOptions, ErrorDto> {
    if options_json.trim().is_empty() {
        return Ok(CompileOptions::default());
    }
    serde_json::from_str(options_json).map_err(|e| ErrorDto {
        code: "P001".into(),
        phase: Phase::Parse.to_string(),
        message: format!("Failed to parse compile options JSON: {}", e),
        node_id: None,
    })
}

/// Recover the resource graph embedded in a previously generated script.
/// Returns `{status: "success", graph}` or `{status: "errors", errors}`.
#[wasm_bindgen]
pub fn load_graph(script: &str) -> JsValue {
    let result = load_graph_inner(script);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn load_graph_inner(script: &str) -> LoadResult {
    let graph = match state::load(script) {
        Ok(graph) => graph,
        Err(e) => return LoadResult::Errors(vec![ErrorDto::from(CompileError::from(e))]),
    };
    match serde_json::to_value(&graph) {
        Ok(graph) => LoadResult::Success { graph },
        Err(e) => LoadResult::Errors(vec![ErrorDto::from(CompileError::StateEncode(e.to_string()))]),
    }
}

/// List the variables offered by a `data` map (node id → node data).
/// Returns a JSON array of `{id, displayName, valueExpression}`.
#[wasm_bindgen]
pub fn list_variables(data_json: &str) -> JsValue {
    let result = list_variables_inner(data_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn list_variables_inner(data_json: &str) -> Result<Vec<Variable>, Vec<ErrorDto>> {
    let data = serde_json::from_str::<BTreeMap<String, NodeData>>(data_json).map_err(|e| {
        vec![ErrorDto::from(CompileError::Parse(format!(
            "Failed to parse node data JSON: {}",
            e
        )))]
    })?;
    Ok(compile::list_variables(&data))
}

/// True if `script` carries a build-state trailer.
#[wasm_bindgen]
pub fn contains_build_state(script: &str) -> bool {
    state::contains_build_state(script)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
    node_id: Option<String>,
}

impl From<CompileError> for ErrorDto {
    fn from(e: CompileError) -> Self {
        ErrorDto {
            code: e.code().to_string(),
            phase: e.phase().to_string(),
            node_id: e.node_id().map(str::to_string),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "status")]
enum CompileResult {
    #[serde(rename = "success")]
    Success {
        script: String,
        order: Vec<String>,
        edges: Vec<Edge>,
        variables: Vec<Variable>,
    },
    #[serde(rename = "errors")]
    Errors(Vec<ErrorDto>),
}

impl CompileResult {
    fn errors(errors: Vec<CompileError>) -> Self {
        CompileResult::Errors(errors.into_iter().map(ErrorDto::from).collect())
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "status")]
enum LoadResult {
    #[serde(rename = "success")]
    Success { graph: serde_json::Value },
    #[serde(rename = "errors")]
    Errors(Vec<ErrorDto>),
}
