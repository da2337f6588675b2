//! Graph-level structural validation rules (V001-V005).

use std::collections::HashSet;

use tracing::warn;

use crate::error::CompileError;
use crate::parse::types::{NodeKind, ResourceGraph};

/// Run all structural validation rules. Returns all errors found.
pub fn validate_structural(graph: &ResourceGraph) -> Vec<CompileError> {
    let mut errors = Vec::new();

    v001_every_node_has_data(graph, &mut errors);
    v002_data_matches_node_kind(graph, &mut errors);
    v003_unique_node_ids(graph, &mut errors);
    v004_node_ids_embeddable(graph, &mut errors);
    v005_children_belong_to_packages(graph, &mut errors);
    warn_dangling_edges(graph);

    errors
}

fn v001_every_node_has_data(graph: &ResourceGraph, errors: &mut Vec<CompileError>) {
    for node in &graph.nodes {
        if !graph.data.contains_key(&node.id) {
            errors.push(CompileError::MissingNodeData {
                node_id: node.id.clone(),
            });
        }
    }
}

fn v002_data_matches_node_kind(graph: &ResourceGraph, errors: &mut Vec<CompileError>) {
    for node in &graph.nodes {
        let Some(data) = graph.data.get(&node.id) else {
            continue;
        };
        if data.kind() != node.kind {
            errors.push(CompileError::KindMismatch {
                node_id: node.id.clone(),
                declared: node.kind.to_string(),
                actual: data.kind().to_string(),
            });
        }
    }
}

fn v003_unique_node_ids(graph: &ResourceGraph, errors: &mut Vec<CompileError>) {
    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(CompileError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
}

/// Node ids are embedded in `{{<type>.<id>...}}` references.
fn v004_node_ids_embeddable(graph: &ResourceGraph, errors: &mut Vec<CompileError>) {
    for node in &graph.nodes {
        let id = &node.id;
        if id.is_empty()
            || id.contains(['.', '{', '}'])
            || id.chars().any(char::is_whitespace)
        {
            errors.push(CompileError::InvalidNodeId {
                node_id: id.clone(),
            });
        }
    }
}

/// Child resources hang off a top-level package node.
fn v005_children_belong_to_packages(graph: &ResourceGraph, errors: &mut Vec<CompileError>) {
    for node in &graph.nodes {
        let Some(parent) = node.parent_node.as_deref() else {
            continue;
        };
        let is_package = graph
            .nodes
            .iter()
            .any(|p| p.id == parent && p.is_primary() && p.kind == NodeKind::Package);
        if !is_package {
            errors.push(CompileError::InvalidParentNode {
                node_id: node.id.clone(),
                parent: parent.to_string(),
            });
        }
    }
}

fn warn_dangling_edges(graph: &ResourceGraph) {
    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
            warn!(
                source = %edge.source,
                target = %edge.target,
                "display edge references an unknown node"
            );
        }
    }
}
