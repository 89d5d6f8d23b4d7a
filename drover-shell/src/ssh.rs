//! SSH command execution with password or agent authentication.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use async_trait::async_trait;
use russh::client::{self, AuthResult, Config, Handle, Handler};
use russh::keys::agent::client::AgentClient;
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect};

// Layer 3: Internal
use crate::command::CommandOutput;
use crate::error::ShellError;
use crate::host::HostSpec;
use crate::RemoteShell;

/// SSH-backed shell for one host.
///
/// The transport is established lazily on the first `run` and then reused;
/// agentless means nothing is installed remotely, every action is a plain
/// `exec` over a fresh channel on the shared session.
///
/// Host keys are currently accepted without verification, as is usual for
/// bootstrap tooling; the inventory is the trust anchor.
pub struct SshShell {
    spec: HostSpec,
    session: Option<Handle<AcceptingHandler>>,
}

impl SshShell {
    /// Create a shell for `spec` without connecting yet.
    pub fn new(spec: HostSpec) -> Self {
        Self {
            spec,
            session: None,
        }
    }

    /// The host this shell executes on.
    pub fn host(&self) -> &HostSpec {
        &self.spec
    }

    async fn ensure_connected(&mut self) -> Result<&mut Handle<AcceptingHandler>, ShellError> {
        if self.session.is_none() {
            let target = self.spec.target();
            let config = Arc::new(Config::default());
            let address = (self.spec.hostname.as_str(), self.spec.port);

            let mut handle = client::connect(config, address, AcceptingHandler)
                .await
                .map_err(|error| ShellError::connect(&target, error.to_string()))?;

            authenticate(&mut handle, &self.spec).await?;
            tracing::debug!(target = %target, "ssh session established");
            self.session = Some(handle);
        }
        // Just inserted above when absent.
        self.session
            .as_mut()
            .ok_or_else(|| ShellError::connect(self.spec.target(), "session lost"))
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(&mut self, command: &str) -> Result<CommandOutput, ShellError> {
        let target = self.spec.target();
        let session = self.ensure_connected().await?;

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|error| ShellError::channel(&target, error.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|error| ShellError::channel(&target, error.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: exit_code.unwrap_or(-1),
        })
    }

    fn target(&self) -> String {
        self.spec.target()
    }

    async fn close(&mut self) -> Result<(), ShellError> {
        if let Some(session) = self.session.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(|error| ShellError::channel(self.spec.target(), error.to_string()))?;
        }
        Ok(())
    }
}

/// Try password auth when a password is configured, the local SSH agent
/// otherwise.
async fn authenticate(
    handle: &mut Handle<AcceptingHandler>,
    spec: &HostSpec,
) -> Result<(), ShellError> {
    let target = spec.target();

    if let Some(password) = &spec.password {
        let outcome = handle
            .authenticate_password(&spec.user, password)
            .await
            .map_err(|error| ShellError::connect(&target, error.to_string()))?;
        return if matches!(outcome, AuthResult::Success) {
            Ok(())
        } else {
            Err(ShellError::AuthFailed { target })
        };
    }

    let mut agent = AgentClient::connect_env()
        .await
        .map_err(|error| ShellError::connect(&target, format!("ssh-agent: {error}")))?;
    let identities = agent
        .request_identities()
        .await
        .map_err(|error| ShellError::connect(&target, format!("ssh-agent: {error}")))?;

    for identity in identities {
        let key = identity.public_key().into_owned();
        let outcome = handle
            .authenticate_publickey_with(&spec.user, key, None, &mut agent)
            .await
            .map_err(|error| ShellError::connect(&target, error.to_string()))?;
        if matches!(outcome, AuthResult::Success) {
            return Ok(());
        }
    }

    Err(ShellError::AuthFailed { target })
}

/// Client handler that accepts any server key.
pub struct AcceptingHandler;

impl Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_shell_does_not_connect() {
        let shell = SshShell::new(HostSpec::new("unreachable.invalid"));
        assert!(shell.session.is_none());
        assert_eq!(shell.target(), "root@unreachable.invalid:22");
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        // Reserved TEST-NET-1 address; the connection attempt must fail
        // quickly with a Connect error rather than hang forever.
        let spec = HostSpec::new("192.0.2.1").with_port(2222);
        let mut shell = SshShell::new(spec);
        let result =
            tokio::time::timeout(std::time::Duration::from_secs(10), shell.run("true")).await;
        if let Ok(outcome) = result {
            assert!(matches!(outcome, Err(ShellError::Connect { .. })));
        }
    }

    #[tokio::test]
    async fn test_close_without_session_is_idempotent() {
        let mut shell = SshShell::new(HostSpec::new("web-01"));
        assert!(shell.close().await.is_ok());
        assert!(shell.close().await.is_ok());
    }
}
