//! CLI error type and exit-code mapping.

// Layer 2: Third-party
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for configuration problems: missing or invalid flags,
/// unknown workflow, unreadable inventory.
pub const EXIT_CONFIG: u8 = 2;

/// Exit code for a workflow that ran and failed.
pub const EXIT_WORKFLOW_FAILED: u8 = 1;

#[derive(Error, Debug)]
pub enum CliError {
    /// Bad invocation; exits with code 2 before a session opens.
    #[error("{0}")]
    Config(String),

    /// The workflow executed and failed; exits with code 1.
    #[error("workflow failed: {0}")]
    WorkflowFailed(String),

    /// Environment trouble that is not the workflow's fault.
    #[error("{0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] drover_store::StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Map this error to the process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::WorkflowFailed(_) => EXIT_WORKFLOW_FAILED,
            _ => 1,
        }
    }
}

impl From<drover_core::EngineError> for CliError {
    fn from(error: drover_core::EngineError) -> Self {
        use drover_core::EngineError;
        match &error {
            // Problems that exist before anything runs are configuration.
            EngineError::WorkflowRead { .. }
            | EngineError::UnsupportedFormat(_)
            | EngineError::Inventory { .. } => Self::Config(error.to_string()),
            _ => Self::Runtime(error.to_string()),
        }
    }
}
