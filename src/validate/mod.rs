//! Graph-level validation phase (pre-lowering).
//!
//! Checks the snapshot handed over by the host before any lowering. The
//! host's own `isValid` flags are never consulted.

pub mod structural;

use crate::error::CompileError;
use crate::parse::types::ResourceGraph;

/// Validate the resource graph. Returns all errors found.
pub fn validate_graph(graph: &ResourceGraph) -> Vec<CompileError> {
    structural::validate_structural(graph)
}
