//! Error types for shell execution.

// Layer 2: Third-party
use thiserror::Error;

/// Errors surfaced by local and remote shells.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The underlying process could not be spawned or awaited.
    #[error("Process execution failed: {command}: {reason}")]
    Process { command: String, reason: String },

    /// Establishing the SSH transport failed.
    #[error("SSH connection to {target} failed: {reason}")]
    Connect { target: String, reason: String },

    /// All configured authentication methods were rejected.
    #[error("SSH authentication failed for {target}")]
    AuthFailed { target: String },

    /// The SSH channel died mid-command.
    #[error("SSH channel error on {target}: {reason}")]
    Channel { target: String, reason: String },

    /// Command output was not valid UTF-8.
    #[error("Command output is not valid UTF-8: {0}")]
    Encoding(String),
}

impl ShellError {
    /// Creates a process execution error.
    pub fn process(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Process {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connection error.
    pub fn connect(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connect {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Creates a channel error.
    pub fn channel(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Channel {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
