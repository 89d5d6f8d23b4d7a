//! Direct dispatch for actions targeting the interpreter's own actor.
//!
//! A node's interpreter runs *inside* that node's actor task. An action
//! in the workflow that targets the node itself must therefore not go
//! through the mailbox: the actor is busy running the interpreter, and a
//! FIFO mailbox with one consumer would deadlock on the re-entrant ask.
//! Such actions dispatch directly through a [`LocalActions`] handler
//! instead.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use async_trait::async_trait;
use drover_actor::ActionResult;
use tokio::sync::Mutex;

/// Handler for actor names the interpreter resolves without the mailbox.
#[async_trait]
pub trait LocalActions: Send {
    /// Whether `actor` is served by this handler.
    fn handles(&self, actor: &str) -> bool;

    /// Invoke a method. Same contract as actor dispatch: failures are
    /// failed results, never panics.
    async fn call(&mut self, method: &str, args: &str) -> ActionResult;
}

/// Shared handle so a sub-interpreter keeps its parent's local dispatch.
///
/// The mutex is uncontended in practice: an interpreter and the
/// sub-interpreters it spawns run strictly sequentially on one actor task.
pub type SharedLocalActions = Arc<Mutex<dyn LocalActions>>;

/// Wrap a handler for sharing with sub-interpreters.
pub fn share<L: LocalActions + 'static>(local: L) -> SharedLocalActions {
    Arc::new(Mutex::new(local))
}
