//! Per-node actors: one interpreter and one shell per managed host.

// Layer 1: Standard library
use std::path::PathBuf;
use std::sync::Arc;

// Layer 2: Third-party
use async_trait::async_trait;
use drover_actor::{decode_args, ActionResult, Actor, ActorContext};
use drover_shell::{shell_for, HostSpec, RemoteShell};

// Layer 3: Internal
use super::node_actor_name;
use crate::context::RuntimeContext;
use crate::interpreter::{share, Interpreter, LocalActions, SharedLocalActions, DEFAULT_MAX_STEPS};
use crate::workflow::load_workflow;

/// Direct handler for actions targeting the node itself.
///
/// Registered as the interpreter's local dispatch under the names `node`,
/// the node id, and the bare hostname, so a workflow can say
/// `actor: node` and run on whichever host the interpreter drives.
pub struct ShellActions {
    node_id: String,
    hostname: String,
    shell: Box<dyn RemoteShell>,
    ctx: RuntimeContext,
}

impl ShellActions {
    fn new(node_id: String, hostname: String, shell: Box<dyn RemoteShell>, ctx: RuntimeContext) -> Self {
        Self {
            node_id,
            hostname,
            shell,
            ctx,
        }
    }

    async fn run_command(&mut self, command: &str) -> ActionResult {
        let output = match self.shell.run(command).await {
            Ok(output) => output,
            Err(error) => return ActionResult::err(format!("Error: {error}")),
        };

        // Command output streams through the multiplexer as it would from
        // any other source.
        if !output.stdout.is_empty() {
            self.ctx
                .emit(&self.node_id, "stdout", output.stdout.trim_end_matches('\n'))
                .await;
        }
        if !output.stderr.is_empty() {
            self.ctx
                .emit(&self.node_id, "stderr", output.stderr.trim_end_matches('\n'))
                .await;
        }

        if output.is_success() {
            ActionResult::ok(output.stdout.trim_end_matches('\n'))
        } else {
            ActionResult::err(format!("exit {}: {}", output.exit_code, output.combined()))
        }
    }
}

#[async_trait]
impl LocalActions for ShellActions {
    fn handles(&self, actor: &str) -> bool {
        actor == "node" || actor == self.node_id || actor == self.hostname
    }

    async fn call(&mut self, method: &str, args: &str) -> ActionResult {
        let arguments = match decode_args(args) {
            Ok(arguments) => arguments,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        match method {
            "run" => {
                let Some(command) = arguments.first() else {
                    return ActionResult::err("run expects [command]");
                };
                self.run_command(command).await
            }
            "getTarget" => ActionResult::ok(self.shell.target()),
            "getNode" => ActionResult::ok(self.node_id.clone()),
            other => ActionResult::unknown_action(other),
        }
    }
}

/// One actor per inventory host, named `node-<hostname>`.
///
/// Owns the host's interpreter and, through the shared local dispatch,
/// its shell. The shell blocks this actor while a command runs; other
/// nodes keep going because each is its own actor.
pub struct NodeActor {
    interpreter: Interpreter,
    local: SharedLocalActions,
}

impl NodeActor {
    /// Build the actor for one host.
    pub fn new(ctx: RuntimeContext, host: &HostSpec, base_dir: Option<PathBuf>) -> Self {
        let node_id = node_actor_name(&host.hostname);
        let shell = shell_for(host);
        let local = share(ShellActions::new(
            node_id.clone(),
            host.hostname.clone(),
            shell,
            ctx.clone(),
        ));

        let hook_node = node_actor_name(&host.hostname);
        let mut interpreter = Interpreter::new(ctx, node_id)
            .with_local(Arc::clone(&local))
            .on_enter_transition(Box::new(move |transition| {
                tracing::debug!(
                    node = %hook_node,
                    from = %transition.from,
                    to = %transition.to,
                    "entering transition"
                );
            }));
        if let Some(base_dir) = base_dir {
            interpreter = interpreter.with_base_dir(base_dir);
        }

        Self { interpreter, local }
    }

    fn apply_workflow(&mut self, args: &str) -> ActionResult {
        let arguments = match decode_args(args) {
            Ok(arguments) => arguments,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        let Some(path) = arguments.first() else {
            return ActionResult::err("applyWorkflow expects [path]");
        };

        match load_workflow(std::path::Path::new(path)) {
            Ok(workflow) => {
                let name = workflow.name.clone();
                self.interpreter.load(Arc::new(workflow));
                ActionResult::ok(name)
            }
            Err(error) => ActionResult::err(format!("Error: {error}")),
        }
    }
}

#[async_trait]
impl Actor for NodeActor {
    async fn handle(&mut self, action: &str, args: &str, _ctx: &ActorContext) -> ActionResult {
        match action {
            "applyWorkflow" => self.apply_workflow(args),
            "runUntilEnd" => {
                let max_steps = decode_args(args)
                    .ok()
                    .and_then(|arguments| arguments.first().and_then(|raw| raw.parse().ok()))
                    .unwrap_or(DEFAULT_MAX_STEPS);
                self.interpreter.run_until_end(max_steps).await
            }
            "getState" => ActionResult::ok(self.interpreter.state()),
            // Everything else the node understands is a shell action.
            other => {
                let mut local = self.local.lock().await;
                local.call(other, args).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drover_actor::{encode_args, ActorSystem, SystemConfig};
    use tempfile::TempDir;

    fn localhost_node(system: &ActorSystem, base_dir: Option<PathBuf>) {
        let ctx = RuntimeContext::without_log(system.downgrade());
        let host = HostSpec::new("localhost");
        system
            .register_pooled("node-localhost", Box::new(NodeActor::new(ctx, &host, base_dir)))
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_through_local_shell() {
        let system = ActorSystem::new(SystemConfig::default());
        localhost_node(&system, None);

        let result = system
            .call_by_action_name("node-localhost", "run", &encode_args(&["echo hi"]))
            .await;
        assert!(result.success);
        assert_eq!(result.result, "hi");

        let failed = system
            .call_by_action_name("node-localhost", "run", &encode_args(&["exit 4"]))
            .await;
        assert!(!failed.success);
        assert!(failed.result.starts_with("exit 4"));
    }

    #[tokio::test]
    async fn test_apply_and_run_workflow_targeting_node() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("touch.yaml");
        std::fs::write(
            &path,
            r#"
name: touch
transitions:
  - states: ["0", "end"]
    actions:
      - actor: node
        method: run
        arguments: ["true"]
"#,
        )
        .unwrap();

        let system = ActorSystem::new(SystemConfig::default());
        localhost_node(&system, Some(dir.path().to_path_buf()));

        let loaded = system
            .call_by_action_name(
                "node-localhost",
                "applyWorkflow",
                &encode_args(&[path.to_str().unwrap()]),
            )
            .await;
        assert!(loaded.success, "{}", loaded.result);
        assert_eq!(loaded.result, "touch");

        // The node-targeted action dispatches directly through the shell,
        // not back through this actor's own busy mailbox.
        let ran = system
            .call_by_action_name("node-localhost", "runUntilEnd", &encode_args(&["10"]))
            .await;
        assert!(ran.success, "{}", ran.result);

        let state = system
            .call_by_action_name("node-localhost", "getState", "[]")
            .await;
        assert_eq!(state.result, "end");
    }
}
