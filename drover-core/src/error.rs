//! Error types for the engine.

// Layer 2: Third-party
use thiserror::Error;

/// Errors surfaced by workflow loading, inventories, and the run pipeline.
///
/// Everything that happens *inside* a running workflow travels as failed
/// `ActionResult`s instead; these errors are for the machinery around it.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A workflow file could not be read.
    #[error("Cannot read workflow {path}: {reason}")]
    WorkflowRead { path: String, reason: String },

    /// A workflow document failed to parse.
    #[error("Cannot parse workflow {path}: {reason}")]
    WorkflowParse { path: String, reason: String },

    /// A parsed workflow violated a structural rule.
    #[error("Invalid workflow '{name}': {reason}")]
    WorkflowInvalid { name: String, reason: String },

    /// The workflow file extension maps to no known format.
    #[error("Unsupported workflow format: {0}")]
    UnsupportedFormat(String),

    /// An inventory file could not be read or parsed.
    #[error("Inventory {path}: {reason}")]
    Inventory { path: String, reason: String },

    /// The host limit excluded every inventory host.
    #[error("Host limit '{limit}' matches no inventory host")]
    EmptyHostSelection { limit: String },

    /// Actor system failure during orchestration.
    #[error(transparent)]
    Actor(#[from] drover_actor::ActorError),

    /// Log store failure outside the tolerated write path.
    #[error(transparent)]
    Store(#[from] drover_store::StoreError),

    /// File output failure (file accumulator, render targets).
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl EngineError {
    /// Creates a workflow read error.
    pub fn workflow_read(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WorkflowRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a workflow parse error.
    pub fn workflow_parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WorkflowParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a workflow validation error.
    pub fn workflow_invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WorkflowInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an inventory error.
    pub fn inventory(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Inventory {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
