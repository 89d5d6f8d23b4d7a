//! Captured output of one executed command.

// Layer 1: Standard library
use std::fmt;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

/// Output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// Process exit code; `-1` when the process died without one.
    pub exit_code: i32,
}

impl CommandOutput {
    /// True iff the command exited with code zero.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr joined, stdout first, for logging.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit {}: {}", self.exit_code, self.combined())
    }
}
