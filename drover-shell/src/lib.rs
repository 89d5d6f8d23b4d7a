//! # drover-shell - Uniform command execution on managed hosts
//!
//! One trait, [`RemoteShell`], behind which a command runs the same way on
//! the local machine ([`LocalShell`], a `sh -c` subprocess) or on a remote
//! host over SSH ([`SshShell`], password or agent auth). Node actors own
//! their shell exclusively; the shell blocks its actor while a command
//! runs, and concurrency across nodes comes from each node being a
//! distinct actor.
//!
//! ```rust,ignore
//! let spec = HostSpec::new("web-01").with_user("deploy");
//! let mut shell = shell_for(&spec);
//! let output = shell.run("uname -r").await?;
//! println!("{} -> {}", shell.target(), output.stdout.trim());
//! ```

pub mod command;
pub mod error;
pub mod host;
pub mod local;
pub mod ssh;

// Re-export commonly used types
pub use command::CommandOutput;
pub use error::ShellError;
pub use host::{HostLimit, HostSpec};
pub use local::LocalShell;
pub use ssh::SshShell;

// Layer 2: Third-party
use async_trait::async_trait;

/// Uniform command execution surface.
///
/// `run` blocks until the command finishes and returns captured stdout,
/// stderr, and the exit code. Timeouts, if any, are the implementation's
/// concern.
#[async_trait]
pub trait RemoteShell: Send {
    /// Execute a command and capture its output.
    async fn run(&mut self, command: &str) -> Result<CommandOutput, ShellError>;

    /// Human-readable execution target, e.g. `localhost` or
    /// `deploy@web-01:22`.
    fn target(&self) -> String;

    /// Release any held connection. Idempotent.
    async fn close(&mut self) -> Result<(), ShellError> {
        Ok(())
    }
}

/// Pick the right shell for a host spec: [`LocalShell`] for loopback
/// targets, a lazily-connecting [`SshShell`] otherwise.
pub fn shell_for(spec: &HostSpec) -> Box<dyn RemoteShell> {
    if spec.is_local() {
        Box::new(LocalShell::new())
    } else {
        Box::new(SshShell::new(spec.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_for_local() {
        let spec = HostSpec::new("localhost");
        assert_eq!(shell_for(&spec).target(), "localhost");
    }

    #[test]
    fn test_shell_for_remote() {
        let spec = HostSpec::new("web-01").with_user("deploy");
        assert_eq!(shell_for(&spec).target(), "deploy@web-01:22");
    }
}
