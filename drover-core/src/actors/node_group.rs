//! The `nodeGroup` actor: per-node fan-out and aggregation.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use async_trait::async_trait;
use drover_actor::{decode_args, encode_args, ActionResult, Actor, ActorContext, ActorSystem};
use drover_shell::{HostLimit, HostSpec};
use drover_store::{LogLevel, NodeStatus};
use futures::future::join_all;

// Layer 3: Internal
use super::{node_actor_name, NodeActor, NODE_GROUP};
use crate::context::RuntimeContext;
use crate::interpreter::DEFAULT_MAX_STEPS;
use crate::inventory::Inventory;

/// Orchestrates one interpreter per inventory host.
///
/// Per-node failure never short-circuits the others: every node runs to
/// its own verdict, verdicts land in `node_results`, and the aggregate
/// fails iff any node failed. Parallelism comes from each node being its
/// own pooled actor; the user pool width is the cap.
pub struct NodeGroupActor {
    ctx: RuntimeContext,
    inventory: Inventory,
    limit: Option<HostLimit>,
    base_dir: Option<PathBuf>,
    default_max_steps: u64,
    workflow_path: Option<String>,
    node_names: Vec<String>,
}

impl NodeGroupActor {
    /// Orchestrator over an inventory.
    pub fn new(ctx: RuntimeContext, inventory: Inventory, limit: Option<HostLimit>) -> Self {
        Self {
            ctx,
            inventory,
            limit,
            base_dir: None,
            default_max_steps: DEFAULT_MAX_STEPS,
            workflow_path: None,
            node_names: Vec::new(),
        }
    }

    /// Resolve relative workflow paths against this directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Default step budget for `runUntilEnd` without an argument.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.default_max_steps = max_steps;
        self
    }

    fn system(&self) -> Result<ActorSystem, ActionResult> {
        self.ctx
            .system()
            .upgrade()
            .ok_or_else(|| ActionResult::err("Actor system has shut down"))
    }

    /// Select the participating hosts: group (or whole inventory)
    /// intersected with the host limit.
    fn select_hosts(&self, group: Option<&str>) -> Result<Vec<HostSpec>, ActionResult> {
        let candidates: Vec<HostSpec> = match group {
            Some(group) => match self.inventory.group(group) {
                Some(hosts) => hosts.into_iter().cloned().collect(),
                None => {
                    return Err(ActionResult::err(format!("Unknown group: {group}")));
                }
            },
            None => self.inventory.hosts().to_vec(),
        };

        let selected: Vec<HostSpec> = match &self.limit {
            Some(limit) => limit.intersect(&candidates).into_iter().cloned().collect(),
            None => candidates,
        };

        if selected.is_empty() {
            let reason = match &self.limit {
                Some(limit) => format!("Host limit '{limit}' matches no inventory host"),
                None => "Inventory has no hosts".to_string(),
            };
            return Err(ActionResult::err(reason));
        }
        Ok(selected)
    }

    async fn create_node_actors(&mut self, args: &str) -> ActionResult {
        if !self.node_names.is_empty() {
            return ActionResult::err("Node actors already created");
        }

        let arguments = match decode_args(args) {
            Ok(arguments) => arguments,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        let group = arguments.first().map(String::as_str).filter(|g| !g.is_empty());

        let hosts = match self.select_hosts(group) {
            Ok(hosts) => hosts,
            Err(failure) => return failure,
        };
        let system = match self.system() {
            Ok(system) => system,
            Err(failure) => return failure,
        };

        for host in &hosts {
            let name = node_actor_name(&host.hostname);
            let actor = NodeActor::new(self.ctx.clone(), host, self.base_dir.clone());
            if let Err(error) = system.register_pooled(name.clone(), Box::new(actor)) {
                return ActionResult::err(format!("Error: {error}"));
            }
            self.node_names.push(name);
        }

        self.ctx
            .log_message(
                NODE_GROUP,
                LogLevel::Info,
                format!("created {} node actors", self.node_names.len()),
            )
            .await;
        ActionResult::ok(self.node_names.join(","))
    }

    async fn apply_workflow_to_all(&mut self, args: &str) -> ActionResult {
        let arguments = match decode_args(args) {
            Ok(arguments) => arguments,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        let Some(path) = arguments.first() else {
            return ActionResult::err("applyWorkflowToAllNodes expects [path]");
        };
        if self.node_names.is_empty() {
            return ActionResult::err("No node actors; call createNodeActors first");
        }

        let resolved = self.resolve(path);
        let system = match self.system() {
            Ok(system) => system,
            Err(failure) => return failure,
        };

        let apply_args = encode_args(&[resolved.as_str()]);
        let results = join_all(self.node_names.iter().map(|node| {
            let system = system.clone();
            let apply_args = apply_args.clone();
            async move {
                let result = system
                    .call_by_action_name(node, "applyWorkflow", &apply_args)
                    .await;
                (node.clone(), result)
            }
        }))
        .await;

        self.workflow_path = Some(resolved.clone());
        self.ctx
            .log_message(
                NODE_GROUP,
                LogLevel::Info,
                format!("applying {} to {} nodes", resolved, results.len()),
            )
            .await;
        aggregate("loaded", results)
    }

    async fn run_until_end(&mut self, args: &str) -> ActionResult {
        if self.node_names.is_empty() {
            return ActionResult::err("No node actors; call createNodeActors first");
        }
        let max_steps = decode_args(args)
            .ok()
            .and_then(|arguments| arguments.first().and_then(|raw| raw.parse::<u64>().ok()))
            .unwrap_or(self.default_max_steps);

        let system = match self.system() {
            Ok(system) => system,
            Err(failure) => return failure,
        };

        let max_arg = encode_args(&[max_steps.to_string().as_str()]);
        let results = join_all(self.node_names.iter().map(|node| {
            let system = system.clone();
            let max_arg = max_arg.clone();
            async move {
                let result = system
                    .call_by_action_name(node, "runUntilEnd", &max_arg)
                    .await;
                (node.clone(), result)
            }
        }))
        .await;

        // Every node gets a verdict row, winners and losers alike.
        for (node, result) in &results {
            let (status, reason) = if result.success {
                (NodeStatus::Success, None)
            } else {
                (NodeStatus::Failed, Some(result.result.clone()))
            };
            self.ctx.node_result(node, status, reason).await;
        }

        let outcome = aggregate("succeeded", results);
        let level = if outcome.success {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        self.ctx
            .log_message(NODE_GROUP, level, outcome.result.clone())
            .await;
        outcome
    }

    fn resolve(&self, path: &str) -> String {
        let as_path = std::path::Path::new(path);
        if as_path.is_absolute() {
            return path.to_string();
        }
        match &self.base_dir {
            Some(base_dir) => base_dir.join(as_path).display().to_string(),
            None => path.to_string(),
        }
    }
}

/// Fold per-node results into the aggregate verdict.
fn aggregate(verb: &str, results: Vec<(String, ActionResult)>) -> ActionResult {
    let total = results.len();
    let failures: Vec<(String, String)> = results
        .into_iter()
        .filter(|(_, result)| !result.success)
        .map(|(node, result)| (node, result.result))
        .collect();

    if failures.is_empty() {
        return ActionResult::ok(format!("all {total} nodes {verb}"));
    }

    let listed = failures
        .iter()
        .map(|(node, reason)| format!("{node}: {reason}"))
        .collect::<Vec<_>>()
        .join(", ");
    ActionResult::err(format!(
        "{} of {total} nodes failed: [{listed}]",
        failures.len()
    ))
}

#[async_trait]
impl Actor for NodeGroupActor {
    async fn handle(&mut self, action: &str, args: &str, _ctx: &ActorContext) -> ActionResult {
        match action {
            "createNodeActors" => self.create_node_actors(args).await,
            "applyWorkflowToAllNodes" => self.apply_workflow_to_all(args).await,
            "runUntilEnd" => self.run_until_end(args).await,
            "getSessionId" => ActionResult::ok(self.ctx.session_id().to_string()),
            "getWorkflowPath" => {
                ActionResult::ok(self.workflow_path.clone().unwrap_or_default())
            }
            "getNodeNames" => ActionResult::ok(self.node_names.join(",")),
            other => ActionResult::unknown_action(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_all_success() {
        let results = vec![
            ("node-a".to_string(), ActionResult::ok("done")),
            ("node-b".to_string(), ActionResult::ok("done")),
        ];
        let outcome = aggregate("succeeded", results);
        assert!(outcome.success);
        assert_eq!(outcome.result, "all 2 nodes succeeded");
    }

    #[test]
    fn test_aggregate_reports_failures() {
        let results = vec![
            ("node-a".to_string(), ActionResult::ok("done")),
            ("node-b".to_string(), ActionResult::err("boom")),
            ("node-c".to_string(), ActionResult::ok("done")),
        ];
        let outcome = aggregate("succeeded", results);
        assert!(!outcome.success);
        assert!(outcome.result.contains("1 of 3 nodes failed"));
        assert!(outcome.result.contains("node-b: boom"));
    }
}
