//! Environment probe actor, mostly used by guards.

// Layer 2: Third-party
use async_trait::async_trait;
use drover_actor::{decode_args, ActionResult, Actor, ActorContext};

/// Exposes the process environment as guardable actions.
///
/// `has(NAME)` answers `"true"`/`"false"`, which pairs with a guard's
/// `expect` field; `get(NAME)` returns the value and fails when unset.
#[derive(Debug, Default)]
pub struct EnvActor;

impl EnvActor {
    /// Create the probe.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Actor for EnvActor {
    async fn handle(&mut self, action: &str, args: &str, _ctx: &ActorContext) -> ActionResult {
        let args = match decode_args(args) {
            Ok(args) => args,
            Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
        };
        let Some(name) = args.first() else {
            return ActionResult::err(format!("{action} expects [NAME]"));
        };

        match action {
            "has" => ActionResult::ok(if std::env::var_os(name).is_some() {
                "true"
            } else {
                "false"
            }),
            "get" => match std::env::var(name) {
                Ok(value) => ActionResult::ok(value),
                Err(_) => ActionResult::err(format!("Environment variable not set: {name}")),
            },
            other => ActionResult::unknown_action(other),
        }
    }
}
