//! Parse phase: JSON → Rust types + dependency graph construction.

pub mod graph;
pub mod types;

pub use graph::DependencyGraph;
pub use types::*;

use crate::error::CompileError;

/// Deserialize a resource graph JSON string into a `ResourceGraph`.
pub fn parse(json: &str) -> Result<ResourceGraph, Vec<CompileError>> {
    serde_json::from_str::<ResourceGraph>(json).map_err(|e| {
        vec![CompileError::Parse(format!(
            "Failed to parse resource graph JSON: {}",
            e
        ))]
    })
}
