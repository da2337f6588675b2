//! IR invariant validation.
//!
//! Every script-level identifier must come from exactly one node and must
//! not shadow a name the generated script relies on.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::ir::types::*;

/// Names the generated script uses itself, plus Starlark keywords.
const RESERVED_BINDINGS: &[&str] = &[
    "plan",
    "run",
    "struct",
    "str",
    "import_module",
    "and",
    "break",
    "continue",
    "def",
    "elif",
    "else",
    "for",
    "if",
    "in",
    "lambda",
    "load",
    "not",
    "or",
    "pass",
    "return",
    "while",
];

/// Validate a ScriptIR. Returns all errors found.
pub fn validate_ir(ir: &ScriptIR) -> Vec<CompileError> {
    let mut errors = Vec::new();

    validate_unique_bindings(ir, &mut errors);
    validate_reserved_bindings(ir, &mut errors);

    errors
}

// ---------------------------------------------------------------------------
// Invariant: each binding is produced by a single node
// ---------------------------------------------------------------------------

fn validate_unique_bindings(ir: &ScriptIR, errors: &mut Vec<CompileError>) {
    let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for stmt in ir.statements() {
        let (Some(binding), Some(node_id)) = (stmt.binding.as_deref(), stmt.node_id.as_deref())
        else {
            continue;
        };
        let nodes = owners.entry(binding).or_default();
        if !nodes.contains(&node_id) {
            nodes.push(node_id);
        }
    }

    for (binding, node_ids) in owners {
        if node_ids.len() > 1 {
            errors.push(CompileError::DuplicateBinding {
                binding: binding.to_string(),
                node_ids: node_ids.into_iter().map(str::to_string).collect(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant: bindings do not shadow reserved names
// ---------------------------------------------------------------------------

fn validate_reserved_bindings(ir: &ScriptIR, errors: &mut Vec<CompileError>) {
    for stmt in ir.statements() {
        let Some(binding) = stmt.binding.as_deref() else {
            continue;
        };
        if RESERVED_BINDINGS.contains(&binding) {
            errors.push(CompileError::ReservedBinding {
                binding: binding.to_string(),
                node_id: stmt.node_id.clone().unwrap_or_default(),
            });
        }
    }
}
