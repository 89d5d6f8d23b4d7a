//! Actor trait and per-actor execution context.

// Layer 1: Standard library
// (none)

// Layer 2: Third-party
use async_trait::async_trait;

// Layer 3: Internal
use crate::message::ActionResult;
use crate::system::WeakActorSystem;

/// A named, stateful entity whose behaviour is exposed as string-keyed
/// actions.
///
/// Handlers run on the actor's own task, one invocation at a time, so they
/// may freely mutate `self` without locks. Every action receives its
/// arguments as a compact JSON array (`args`) and must answer with an
/// [`ActionResult`]; unmatched action names answer
/// [`ActionResult::unknown_action`].
///
/// Handlers must not panic across the boundary; if they do anyway, the
/// dispatcher converts the panic into a failed result.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Handle one action invocation.
    async fn handle(&mut self, action: &str, args: &str, ctx: &ActorContext) -> ActionResult;

    /// Called once before the first invocation. Default: nothing.
    async fn started(&mut self, _ctx: &ActorContext) {}

    /// Called once after the mailbox closes. Default: nothing.
    async fn stopped(&mut self, _ctx: &ActorContext) {}
}

/// Execution context handed to every handler invocation.
///
/// Carries the actor's own registered name and a non-owning handle to the
/// system for looking up collaborators. The context deliberately holds a
/// weak reference: the system owns the actors, never the other way around.
#[derive(Debug, Clone)]
pub struct ActorContext {
    name: String,
    system: WeakActorSystem,
}

impl ActorContext {
    pub(crate) fn new(name: String, system: WeakActorSystem) -> Self {
        Self { name, system }
    }

    /// The name this actor was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-owning handle to the owning system.
    pub fn system(&self) -> &WeakActorSystem {
        &self.system
    }

    /// Invoke an action on another actor and await its result.
    ///
    /// Unknown actors, a stopped system, and handler failures all come back
    /// as failed [`ActionResult`]s, per the dispatch rules.
    pub async fn call(&self, actor: &str, action: &str, args: &str) -> ActionResult {
        match self.system.upgrade() {
            Some(system) => system.call_by_action_name(actor, action, args).await,
            None => ActionResult::err("Actor system has shut down"),
        }
    }

    /// Fire-and-forget an action on another actor.
    pub fn notify(&self, actor: &str, action: &str, args: &str) {
        if let Some(system) = self.system.upgrade() {
            if let Err(error) = system.tell(actor, action, args) {
                tracing::debug!(actor, action, %error, "notify dropped");
            }
        }
    }
}
