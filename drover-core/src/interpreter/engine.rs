//! Step execution, transition selection, and sub-workflow recursion.

// Layer 1: Standard library
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

// Layer 2: Third-party
use drover_actor::{encode_args, ActionResult};
use drover_store::{LogLevel, NewLogRecord};
use futures::future::BoxFuture;

// Layer 3: Internal
use super::local::SharedLocalActions;
use super::outcome::StepOutcome;
use crate::context::RuntimeContext;
use crate::workflow::{load_workflow, workflow_format, ActionSpec, Transition, Workflow, WorkflowFormat};

/// Default step budget of a top-level run.
pub const DEFAULT_MAX_STEPS: u64 = 10_000;

/// Default step budget of a nested workflow run. Deliberately separate
/// from the parent budget; recursion depth is unbounded and budget
/// exhaustion is the backstop.
pub const SUB_WORKFLOW_MAX_STEPS: u64 = 1_000;

/// Lines of transition YAML carried as the label on action log records.
pub const TRANSITION_EXCERPT_LINES: usize = 4;

/// The actor name whose actions the interpreter serves natively.
pub const SUB_WORKFLOW_ACTOR: &str = "subWorkflow";

/// Callback invoked around transitions.
pub type TransitionHook = Box<dyn Fn(&Transition) + Send + Sync>;

/// Drives one node through a workflow's state machine.
///
/// Owns its current state and step counter exclusively; an interpreter is
/// never shared between nodes. Actions do not mutate the interpreter's
/// own state: guards are evaluated once per selection attempt and never
/// re-checked mid-action-list.
pub struct Interpreter {
    ctx: RuntimeContext,
    node_id: String,
    workflow: Option<Arc<Workflow>>,
    state: String,
    step_count: u64,
    workflow_base_dir: Option<PathBuf>,
    local: Option<SharedLocalActions>,
    on_enter_transition: Option<TransitionHook>,
    on_exit_transition: Option<TransitionHook>,
}

impl Interpreter {
    /// Interpreter logging under `node_id`.
    pub fn new(ctx: RuntimeContext, node_id: impl Into<String>) -> Self {
        Self {
            ctx,
            node_id: node_id.into(),
            workflow: None,
            state: String::new(),
            step_count: 0,
            workflow_base_dir: None,
            local: None,
            on_enter_transition: None,
            on_exit_transition: None,
        }
    }

    /// Resolve relative sub-workflow files against this directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.workflow_base_dir = Some(base_dir.into());
        self
    }

    /// Attach direct dispatch for the owning actor's own names.
    pub fn with_local(mut self, local: SharedLocalActions) -> Self {
        self.local = Some(local);
        self
    }

    /// Hook invoked after a transition is selected, before its actions.
    pub fn on_enter_transition(mut self, hook: TransitionHook) -> Self {
        self.on_enter_transition = Some(hook);
        self
    }

    /// Hook invoked after the state has advanced.
    pub fn on_exit_transition(mut self, hook: TransitionHook) -> Self {
        self.on_exit_transition = Some(hook);
        self
    }

    /// Assign a workflow and reset to its initial state.
    pub fn load(&mut self, workflow: Arc<Workflow>) {
        self.state = workflow.initial_state.clone();
        self.step_count = 0;
        self.workflow = Some(workflow);
    }

    /// Current state name.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Transitions executed since the last `load`.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// The loaded workflow, if any.
    pub fn workflow(&self) -> Option<&Arc<Workflow>> {
        self.workflow.as_ref()
    }

    /// Node id this interpreter logs under.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Execute one step of the state machine.
    ///
    /// In order: terminal check, budget check, transition selection in
    /// declaration order (first transition whose guards all hold wins),
    /// action execution with first-failure abort, state advance.
    pub async fn step(&mut self, max_steps: u64) -> StepOutcome {
        let Some(workflow) = self.workflow.clone() else {
            return StepOutcome::Failed {
                reason: "no workflow loaded".to_string(),
            };
        };

        if Workflow::is_terminal(&self.state) {
            return StepOutcome::Terminated;
        }
        if self.step_count >= max_steps {
            return StepOutcome::Failed {
                reason: "max steps exceeded".to_string(),
            };
        }

        let state = self.state.clone();
        let mut selected: Option<&Transition> = None;
        for transition in workflow.transitions_from(&state) {
            if self.guards_hold(transition).await {
                selected = Some(transition);
                break;
            }
        }
        let Some(transition) = selected else {
            return StepOutcome::NoEligibleTransition { state };
        };

        if let Some(hook) = &self.on_enter_transition {
            hook(transition);
        }

        if let Err(reason) = self.run_actions(transition).await {
            self.log_transition(transition, Some(&reason)).await;
            return StepOutcome::Failed { reason };
        }

        let from = transition.from.clone();
        let to = transition.to.clone();
        self.state = to.clone();
        self.step_count += 1;

        if let Some(hook) = &self.on_exit_transition {
            hook(transition);
        }
        self.log_transition(transition, None).await;

        StepOutcome::Progressed { from, to }
    }

    /// Run until a terminal state, budget exhaustion, a failed action, or
    /// a dead end.
    pub async fn run_until_end(&mut self, max_steps: u64) -> ActionResult {
        loop {
            match self.step(max_steps).await {
                StepOutcome::Progressed { .. } => continue,
                StepOutcome::Terminated => {
                    return ActionResult::ok(format!(
                        "reached '{}' in {} steps",
                        self.state, self.step_count
                    ));
                }
                StepOutcome::NoEligibleTransition { state } => {
                    let reason = format!("no eligible transition from {state}");
                    self.ctx
                        .log_message(&self.node_id, LogLevel::Error, reason.clone())
                        .await;
                    return ActionResult::err(reason);
                }
                StepOutcome::Failed { reason } => {
                    self.ctx
                        .log_message(&self.node_id, LogLevel::Error, reason.clone())
                        .await;
                    return ActionResult::err(reason);
                }
            }
        }
    }

    /// Load and run another workflow file to completion on a fresh
    /// interpreter sharing this one's context and local dispatch.
    pub fn call_workflow<'a>(
        &'a mut self,
        file: &str,
        max_steps: u64,
    ) -> BoxFuture<'a, ActionResult> {
        // The returned future is boxed to break the recursive future type:
        // a sub-workflow can itself call workflows.
        let path = self.resolve_workflow(file);
        Box::pin(async move {
            let workflow = match load_workflow(&path) {
                Ok(workflow) => Arc::new(workflow),
                Err(error) => return ActionResult::err(format!("Error: {error}")),
            };

            let mut child = Interpreter::new(self.ctx.clone(), self.node_id.clone());
            child.workflow_base_dir = self.workflow_base_dir.clone();
            child.local = self.local.clone();
            child.load(workflow);
            child.run_until_end(max_steps).await
            // The sub-interpreter is dropped on return.
        })
    }

    async fn guards_hold(&mut self, transition: &Transition) -> bool {
        for guard in &transition.guards {
            let result = self
                .invoke(&guard.actor, &guard.method, &guard.arguments)
                .await;
            let holds = result.success
                && guard
                    .expect
                    .as_ref()
                    .is_none_or(|expected| &result.result == expected);
            if !holds {
                tracing::debug!(
                    node = %self.node_id,
                    guard = %format!("{}.{}", guard.actor, guard.method),
                    result = %result.result,
                    "guard did not hold"
                );
                return false;
            }
        }
        true
    }

    /// Execute a transition's actions in order; the first failure aborts.
    async fn run_actions(&mut self, transition: &Transition) -> Result<(), String> {
        let label = transition.excerpt(TRANSITION_EXCERPT_LINES);
        for action in &transition.actions {
            let started = Instant::now();
            let result = self
                .invoke(&action.actor, &action.method, &action.arguments)
                .await;
            let duration_ms = started.elapsed().as_millis() as i64;

            self.log_action(action, &label, &result, duration_ms).await;

            if !result.success {
                return Err(result.result);
            }
        }
        Ok(())
    }

    /// Dispatch one call: `subWorkflow` natively, the owning actor's names
    /// directly, everything else through the system by name.
    async fn invoke(&mut self, actor: &str, method: &str, arguments: &[String]) -> ActionResult {
        let argument_refs: Vec<&str> = arguments.iter().map(String::as_str).collect();
        let args = encode_args(&argument_refs);

        if actor == SUB_WORKFLOW_ACTOR {
            return self.sub_workflow_action(method, arguments).await;
        }

        if let Some(local) = self.local.clone() {
            let mut local = local.lock().await;
            if local.handles(actor) {
                return local.call(method, &args).await;
            }
        }

        self.ctx.call(actor, method, &args).await
    }

    /// The natively served `subWorkflow` action set. Also backs the
    /// registered `subWorkflow` actor for callers outside an interpreter.
    pub(crate) async fn sub_workflow_action(
        &mut self,
        method: &str,
        arguments: &[String],
    ) -> ActionResult {
        match method {
            "doNothing" => ActionResult::ok(""),
            "call" => {
                let Some(file) = arguments.first() else {
                    return ActionResult::err("call expects [workflow_file]");
                };
                let file = file.clone();
                self.call_workflow(&file, SUB_WORKFLOW_MAX_STEPS).await
            }
            "readYaml" | "readJson" | "readXml" => {
                let Some(file) = arguments.first() else {
                    return ActionResult::err(format!("{method} expects [workflow_file]"));
                };
                self.read_workflow(method, file)
            }
            other => ActionResult::unknown_action(other),
        }
    }

    /// Load-and-validate probe; succeeds with the workflow's name.
    fn read_workflow(&self, method: &str, file: &str) -> ActionResult {
        let path = self.resolve_workflow(file);

        let wanted = match method {
            "readYaml" => WorkflowFormat::Yaml,
            "readJson" => WorkflowFormat::Json,
            _ => WorkflowFormat::Xml,
        };
        if workflow_format(&path) != Some(wanted) {
            return ActionResult::err(format!(
                "{method} cannot read '{}': wrong document format",
                path.display()
            ));
        }

        match load_workflow(&path) {
            Ok(workflow) => ActionResult::ok(workflow.name),
            Err(error) => ActionResult::err(format!("Error: {error}")),
        }
    }

    fn resolve_workflow(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.workflow_base_dir {
            Some(base_dir) => base_dir.join(path),
            None => path.to_path_buf(),
        }
    }

    async fn log_action(
        &self,
        action: &ActionSpec,
        label: &str,
        result: &ActionResult,
        duration_ms: i64,
    ) {
        let level = if result.success {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        let mut record = NewLogRecord::message(
            self.ctx.session_id(),
            &self.node_id,
            level,
            result.result.clone(),
        )
        .with_label(label)
        .with_action_name(action.qualified_name())
        .with_duration_ms(duration_ms);
        if let Some(exit_code) = extract_exit_code(result) {
            record = record.with_exit_code(exit_code);
        }
        self.ctx.record(record).await;
    }

    async fn log_transition(&self, transition: &Transition, failure: Option<&str>) {
        let (level, message) = match failure {
            None => (
                LogLevel::Info,
                format!("Transition {}->{}: SUCCESS", transition.from, transition.to),
            ),
            Some(reason) => (
                LogLevel::Error,
                format!(
                    "Transition {}->{}: FAILED - {reason}",
                    transition.from, transition.to
                ),
            ),
        };
        let record = NewLogRecord::message(self.ctx.session_id(), &self.node_id, level, message)
            .with_label(transition.excerpt(TRANSITION_EXCERPT_LINES));
        self.ctx.record(record).await;
    }
}

/// Pull an exit code out of results shaped like `exit 3: ...`, the form
/// shell-backed actions report failures in. Success without an explicit
/// code conveys zero.
fn extract_exit_code(result: &ActionResult) -> Option<i64> {
    if result.success {
        return Some(0);
    }
    let rest = result.result.strip_prefix("exit ")?;
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    digits.parse().ok()
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("node_id", &self.node_id)
            .field("state", &self.state)
            .field("step_count", &self.step_count)
            .field("workflow", &self.workflow.as_ref().map(|w| w.name.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_exit_code_from_failure() {
        assert_eq!(
            extract_exit_code(&ActionResult::err("exit 3: no such file")),
            Some(3)
        );
        assert_eq!(extract_exit_code(&ActionResult::err("boom")), None);
    }

    #[test]
    fn test_success_conveys_zero() {
        assert_eq!(extract_exit_code(&ActionResult::ok("fine")), Some(0));
    }
}
