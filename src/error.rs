//! Unified compiler error type used across all phases.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Validate,
    Lower,
    IrValidate,
    Load,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Validate => write!(f, "Validate"),
            Phase::Lower => write!(f, "Lower"),
            Phase::IrValidate => write!(f, "IR Validate"),
            Phase::Load => write!(f, "Load"),
        }
    }
}

/// Failure to recover a resource graph from a previously generated script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Script wasn't created by the enclave builder: no build state found")]
    MissingPriorState,
    #[error("Couldn't parse previous state: {0}")]
    PriorStateDecode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{0}")]
    Parse(String),

    #[error("Node '{node_id}' has no data")]
    MissingNodeData { node_id: String },

    #[error("Node '{node_id}' is declared as '{declared}' but its data is '{actual}'")]
    KindMismatch {
        node_id: String,
        declared: String,
        actual: String,
    },

    #[error("Duplicate node id '{node_id}'")]
    DuplicateNodeId { node_id: String },

    #[error("Node id '{node_id}' may not be empty or contain '.', '{{', '}}' or whitespace")]
    InvalidNodeId { node_id: String },

    #[error("Node '{node_id}' belongs to '{parent}', which is not a top-level package node")]
    InvalidParentNode { node_id: String, parent: String },

    #[error("Cycle detected between nodes: {}", .node_ids.join(", "))]
    CycleDetected { node_ids: Vec<String> },

    #[error("Node '{node_id}' references unknown variable '{{{{{reference}}}}}'")]
    UnresolvedReference { node_id: String, reference: String },

    #[error("Script identifier '{binding}' is produced by more than one node: {}", .node_ids.join(", "))]
    DuplicateBinding {
        binding: String,
        node_ids: Vec<String>,
    },

    #[error("Script identifier '{binding}' is reserved")]
    ReservedBinding { binding: String, node_id: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Couldn't encode build state: {0}")]
    StateEncode(String),
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Parse(_) => "P001",
            CompileError::MissingNodeData { .. } => "V001",
            CompileError::KindMismatch { .. } => "V002",
            CompileError::DuplicateNodeId { .. } => "V003",
            CompileError::InvalidNodeId { .. } => "V004",
            CompileError::InvalidParentNode { .. } => "V005",
            CompileError::CycleDetected { .. } => "L001",
            CompileError::UnresolvedReference { .. } => "L002",
            CompileError::DuplicateBinding { .. } => "E001",
            CompileError::ReservedBinding { .. } => "E002",
            CompileError::Load(LoadError::MissingPriorState) => "S001",
            CompileError::Load(LoadError::PriorStateDecode(_)) => "S002",
            CompileError::StateEncode(_) => "S003",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            CompileError::Parse(_) => Phase::Parse,
            CompileError::MissingNodeData { .. }
            | CompileError::KindMismatch { .. }
            | CompileError::DuplicateNodeId { .. }
            | CompileError::InvalidNodeId { .. }
            | CompileError::InvalidParentNode { .. } => Phase::Validate,
            CompileError::CycleDetected { .. } | CompileError::UnresolvedReference { .. } => {
                Phase::Lower
            }
            CompileError::DuplicateBinding { .. } | CompileError::ReservedBinding { .. } => {
                Phase::IrValidate
            }
            CompileError::Load(_) | CompileError::StateEncode(_) => Phase::Load,
        }
    }

    /// The node the error is attributed to, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            CompileError::MissingNodeData { node_id }
            | CompileError::KindMismatch { node_id, .. }
            | CompileError::DuplicateNodeId { node_id }
            | CompileError::InvalidNodeId { node_id }
            | CompileError::InvalidParentNode { node_id, .. }
            | CompileError::UnresolvedReference { node_id, .. }
            | CompileError::ReservedBinding { node_id, .. } => Some(node_id.as_str()),
            CompileError::CycleDetected { node_ids } | CompileError::DuplicateBinding { node_ids, .. } => {
                node_ids.first().map(String::as_str)
            }
            CompileError::Parse(_) | CompileError::Load(_) | CompileError::StateEncode(_) => None,
        }
    }
}
