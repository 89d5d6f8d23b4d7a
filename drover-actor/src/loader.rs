//! The `loader` actor: dynamic actor creation by class id.

// Layer 1: Standard library
use std::path::PathBuf;

// Layer 2: Third-party
use async_trait::async_trait;

// Layer 3: Internal
use crate::actor::{Actor, ActorContext};
use crate::factory::{ActorFactory, ActorSpawnArgs};
use crate::message::{decode_args, ActionResult};

/// Actor exposing `createChild(parent, name, class_id)`.
///
/// New actors are instantiated from an explicit [`ActorFactory`] registry
/// and registered with the owning system under the requested name. The
/// loader itself holds no reference to the actors it creates.
pub struct LoaderActor {
    factory: ActorFactory,
    overlay_dir: Option<PathBuf>,
}

impl LoaderActor {
    /// Create a loader over a factory registry.
    pub fn new(factory: ActorFactory, overlay_dir: Option<PathBuf>) -> Self {
        Self {
            factory,
            overlay_dir,
        }
    }

    fn create_child(&self, args: &str, ctx: &ActorContext) -> ActionResult {
        let args = match decode_args(args) {
            Ok(args) => args,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        let [parent, name, class_id] = args.as_slice() else {
            return ActionResult::err(format!(
                "createChild expects [parent, name, class_id], got {} arguments",
                args.len()
            ));
        };

        let Some(system) = ctx.system().upgrade() else {
            return ActionResult::err("Actor system has shut down");
        };

        let spawn_args = ActorSpawnArgs {
            system: ctx.system().clone(),
            name: name.clone(),
            parent: Some(parent.clone()),
            overlay_dir: self.overlay_dir.clone(),
        };

        let actor = match self.factory.construct(class_id, spawn_args) {
            Ok(actor) => actor,
            Err(error) => return ActionResult::err(format!("Error: {error}")),
        };

        match system.register(name.clone(), actor) {
            Ok(()) => ActionResult::ok(name.clone()),
            Err(error) => ActionResult::err(format!("Error: {error}")),
        }
    }
}

#[async_trait]
impl Actor for LoaderActor {
    async fn handle(&mut self, action: &str, args: &str, ctx: &ActorContext) -> ActionResult {
        match action {
            "createChild" => self.create_child(args, ctx),
            "listClasses" => ActionResult::ok(self.factory.class_ids().join(",")),
            other => ActionResult::unknown_action(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::encode_args;
    use crate::system::{ActorSystem, SystemConfig};

    struct Probe;

    #[async_trait]
    impl Actor for Probe {
        async fn handle(&mut self, action: &str, _args: &str, _ctx: &ActorContext) -> ActionResult {
            match action {
                "ping" => ActionResult::ok("pong"),
                other => ActionResult::unknown_action(other),
            }
        }
    }

    fn system_with_loader() -> ActorSystem {
        let factory = ActorFactory::new();
        factory.register_kind("probe", |_args| Ok(Box::new(Probe)));

        let system = ActorSystem::new(SystemConfig::default());
        system
            .register("loader", Box::new(LoaderActor::new(factory, None)))
            .unwrap();
        system
    }

    #[tokio::test]
    async fn test_create_child_registers_actor() {
        let system = system_with_loader();
        let args = encode_args(&["cli", "probe-1", "probe"]);
        let result = system.call_by_action_name("loader", "createChild", &args).await;
        assert!(result.success, "{}", result.result);
        assert_eq!(result.result, "probe-1");

        let ping = system.call_by_action_name("probe-1", "ping", "[]").await;
        assert_eq!(ping.result, "pong");
    }

    #[tokio::test]
    async fn test_create_child_unknown_class() {
        let system = system_with_loader();
        let args = encode_args(&["cli", "x", "missing"]);
        let result = system.call_by_action_name("loader", "createChild", &args).await;
        assert!(!result.success);
        assert!(result.result.contains("Unknown actor class"));
    }

    #[tokio::test]
    async fn test_create_child_duplicate_name() {
        let system = system_with_loader();
        let args = encode_args(&["cli", "probe-1", "probe"]);
        assert!(system
            .call_by_action_name("loader", "createChild", &args)
            .await
            .success);
        let second = system.call_by_action_name("loader", "createChild", &args).await;
        assert!(!second.success);
        assert!(second.result.contains("already registered"));
    }

    #[tokio::test]
    async fn test_create_child_bad_arity() {
        let system = system_with_loader();
        let result = system
            .call_by_action_name("loader", "createChild", r#"["only-one"]"#)
            .await;
        assert!(!result.success);
        assert!(result.result.contains("expects"));
    }
}
