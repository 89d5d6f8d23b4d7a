//! Local command execution via `sh -c`.

// Layer 2: Third-party
use async_trait::async_trait;
use tokio::process::Command;

// Layer 3: Internal
use crate::command::CommandOutput;
use crate::error::ShellError;
use crate::RemoteShell;

/// Shell that runs commands on the machine drover itself runs on.
///
/// Commands go through `sh -c`, matching what the SSH path does on the far
/// end, so workflows behave the same on `localhost` entries as on remote
/// hosts.
#[derive(Debug, Clone, Default)]
pub struct LocalShell;

impl LocalShell {
    /// Create a local shell.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RemoteShell for LocalShell {
    async fn run(&mut self, command: &str) -> Result<CommandOutput, ShellError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|error| ShellError::process(command, error.to_string()))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    fn target(&self) -> String {
        "localhost".to_string()
    }
}
