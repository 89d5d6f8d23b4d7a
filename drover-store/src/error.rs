//! Error types for the log store.

// Layer 2: Third-party
use thiserror::Error;

/// Errors surfaced by the store, its writer, and the log service.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening or talking to the database failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The writer task is gone; the store was closed or the writer died.
    #[error("Log writer is not running")]
    WriterClosed,

    /// The writer did not drain within the shutdown cap.
    #[error("Log writer did not drain within {0:?}")]
    DrainTimeout(std::time::Duration),

    /// A write batch was rolled back.
    #[error("Write batch failed: {0}")]
    WriteFailed(String),

    /// A referenced session does not exist.
    #[error("Unknown session: {0}")]
    UnknownSession(i64),

    /// The on-disk schema is newer than this build understands.
    #[error("Unsupported schema version {found} (supported: {supported})")]
    SchemaVersion { found: i64, supported: i64 },

    /// Network failure while talking to a log service.
    #[error("Log service I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The log service answered something unparseable or unexpected.
    #[error("Log service protocol error: {0}")]
    Protocol(String),

    /// The log service reported a failure.
    #[error("Log service error: {0}")]
    Remote(String),

    /// A merge source could not be used.
    #[error("Merge source {path}: {reason}")]
    MergeSource { path: String, reason: String },
}

impl StoreError {
    /// Creates a protocol error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }

    /// Creates a merge source error.
    pub fn merge_source(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MergeSource {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(error.to_string())
    }
}
