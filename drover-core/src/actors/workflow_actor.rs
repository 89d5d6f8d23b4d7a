//! The registered `subWorkflow` actor.
//!
//! Interpreters serve these actions natively (and in parallel, per node);
//! this actor exists for callers *outside* an interpreter run: direct
//! `ask`s from the CLI or from dynamically created actors.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use async_trait::async_trait;
use drover_actor::{decode_args, ActionResult, Actor, ActorContext};

// Layer 3: Internal
use crate::context::RuntimeContext;
use crate::interpreter::{Interpreter, SUB_WORKFLOW_ACTOR};

/// Workflow-as-a-service: `call`, `doNothing`, and the `read*` probes.
pub struct SubWorkflowActor {
    interpreter: Interpreter,
}

impl SubWorkflowActor {
    /// Actor resolving relative workflow files against `base_dir`.
    pub fn new(ctx: RuntimeContext, base_dir: Option<PathBuf>) -> Self {
        let mut interpreter = Interpreter::new(ctx, SUB_WORKFLOW_ACTOR);
        if let Some(base_dir) = base_dir {
            interpreter = interpreter.with_base_dir(base_dir);
        }
        Self { interpreter }
    }
}

#[async_trait]
impl Actor for SubWorkflowActor {
    async fn handle(&mut self, action: &str, args: &str, _ctx: &ActorContext) -> ActionResult {
        let arguments = match decode_args(args) {
            Ok(arguments) => arguments,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        self.interpreter.sub_workflow_action(action, &arguments).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drover_actor::{encode_args, ActorSystem, SystemConfig};
    use tempfile::TempDir;

    const NOOP_WORKFLOW: &str = r#"
name: noop
transitions:
  - states: ["0", "end"]
    actions:
      - actor: subWorkflow
        method: doNothing
"#;

    fn system_with_actor(base_dir: Option<PathBuf>) -> ActorSystem {
        let system = ActorSystem::new(SystemConfig::default());
        let ctx = RuntimeContext::without_log(system.downgrade());
        system
            .register(SUB_WORKFLOW_ACTOR, Box::new(SubWorkflowActor::new(ctx, base_dir)))
            .unwrap();
        system
    }

    #[tokio::test]
    async fn test_do_nothing() {
        let system = system_with_actor(None);
        let result = system
            .call_by_action_name(SUB_WORKFLOW_ACTOR, "doNothing", "[]")
            .await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_call_runs_workflow_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("noop.yaml"), NOOP_WORKFLOW).unwrap();

        let system = system_with_actor(Some(dir.path().to_path_buf()));
        let result = system
            .call_by_action_name(SUB_WORKFLOW_ACTOR, "call", &encode_args(&["noop.yaml"]))
            .await;
        assert!(result.success, "{}", result.result);
    }

    #[tokio::test]
    async fn test_read_yaml_probe() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("noop.yaml"), NOOP_WORKFLOW).unwrap();

        let system = system_with_actor(Some(dir.path().to_path_buf()));
        let ok = system
            .call_by_action_name(SUB_WORKFLOW_ACTOR, "readYaml", &encode_args(&["noop.yaml"]))
            .await;
        assert!(ok.success);
        assert_eq!(ok.result, "noop");

        let wrong_format = system
            .call_by_action_name(SUB_WORKFLOW_ACTOR, "readJson", &encode_args(&["noop.yaml"]))
            .await;
        assert!(!wrong_format.success);

        let missing = system
            .call_by_action_name(SUB_WORKFLOW_ACTOR, "readYaml", &encode_args(&["ghost.yaml"]))
            .await;
        assert!(!missing.success);
    }
}
