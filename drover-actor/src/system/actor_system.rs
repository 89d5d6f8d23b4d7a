//! Main actor system implementation.

// Layer 1: Standard library
use std::any::Any;
use std::fmt::{self, Display};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Instant;

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::{spawn, AbortHandle, JoinHandle};
use tokio::time::timeout;
use uuid::Uuid;

// Layer 3: Internal
use super::SystemConfig;
use crate::actor::{Actor, ActorContext};
use crate::error::ActorError;
use crate::mailbox::{Mailbox, MailboxSender};
use crate::message::{ActionResult, Invocation};
use crate::pool::WorkerPool;

/// Unique identifier for actors, used in diagnostics only; routing is by
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// System state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SystemState {
    Running,
    ShuttingDown,
    Stopped,
}

/// How an actor's handler invocations relate to the user worker pool.
///
/// `Pooled` actors draw one pool permit per message, which is what caps
/// how many node workloads run at once. `Direct` actors process without a
/// permit; coordinators that spend their time awaiting replies from pooled
/// actors must be `Direct`, or a narrow pool deadlocks on its own
/// orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnMode {
    /// No pool permit; for coordinators and cheap in-process services.
    #[default]
    Direct,
    /// One user-pool permit per handled message.
    Pooled,
}

/// Internal per-actor bookkeeping.
struct ActorEntry {
    id: ActorId,
    sender: MailboxSender,
    task: JoinHandle<()>,
    abort: AbortHandle,
    spawned_at: DateTime<Utc>,
}

/// Process-local registry from actor name to mailbox, plus the worker pools
/// that bound concurrent processing.
///
/// An actor name resolves to at most one actor at any moment; registering a
/// name twice is an error. The system exclusively owns actor instances and
/// their mailboxes; external references are names.
///
/// Cloning is cheap and shares the same registry.
///
/// # Examples
///
/// ```rust,ignore
/// let system = ActorSystem::new(SystemConfig::default());
/// system.register("worker", Box::new(MyActor::new()))?;
///
/// system.tell("worker", "start", "[]")?;
/// let result = system.call_by_action_name("worker", "status", "[]").await;
///
/// system.shutdown().await?;
/// ```
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

/// Non-owning handle held by actors and long-lived callbacks.
///
/// Upgrading fails once the last owning [`ActorSystem`] handle is gone.
#[derive(Debug, Clone)]
pub struct WeakActorSystem {
    inner: Weak<SystemInner>,
}

struct SystemInner {
    config: SystemConfig,
    actors: DashMap<String, ActorEntry>,
    user_pool: WorkerPool,
    db_pool: WorkerPool,
    state: RwLock<SystemState>,
    shutdown_tx: watch::Sender<bool>,
}

impl ActorSystem {
    /// Create a new actor system with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let user_pool = WorkerPool::new("user", config.user_workers);
        let db_pool = WorkerPool::new("db", config.db_workers);
        Self {
            inner: Arc::new(SystemInner {
                config,
                actors: DashMap::new(),
                user_pool,
                db_pool,
                state: RwLock::new(SystemState::Running),
                shutdown_tx,
            }),
        }
    }

    /// Get the system configuration.
    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    /// Shared pool gating actor message processing.
    pub fn user_pool(&self) -> &WorkerPool {
        &self.inner.user_pool
    }

    /// Width-1 pool reserved for database writes.
    pub fn db_pool(&self) -> &WorkerPool {
        &self.inner.db_pool
    }

    /// Downgrade to a non-owning handle.
    pub fn downgrade(&self) -> WeakActorSystem {
        WeakActorSystem {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of registered actors.
    pub fn actor_count(&self) -> usize {
        self.inner.actors.len()
    }

    /// Whether an actor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.actors.contains_key(name)
    }

    /// Names of all registered actors, in no particular order.
    pub fn actor_names(&self) -> Vec<String> {
        self.inner.actors.iter().map(|e| e.key().clone()).collect()
    }

    /// Check if the system is shutting down or stopped.
    pub fn is_shutting_down(&self) -> bool {
        *self.inner.state.read() != SystemState::Running
    }

    /// Register an actor under a unique name and start its mailbox task.
    ///
    /// The actor processes directly, without drawing pool permits; use
    /// [`ActorSystem::register_pooled`] for workload actors.
    ///
    /// # Errors
    ///
    /// - [`ActorError::DuplicateName`] if the name is taken.
    /// - [`ActorError::ShuttingDown`] if the system no longer accepts actors.
    pub fn register(
        &self,
        name: impl Into<String>,
        actor: Box<dyn Actor>,
    ) -> Result<(), ActorError> {
        self.register_with_mode(name, actor, SpawnMode::Direct)
    }

    /// Register an actor whose messages each draw a user-pool permit.
    pub fn register_pooled(
        &self,
        name: impl Into<String>,
        actor: Box<dyn Actor>,
    ) -> Result<(), ActorError> {
        self.register_with_mode(name, actor, SpawnMode::Pooled)
    }

    /// Register an actor with an explicit processing mode.
    pub fn register_with_mode(
        &self,
        name: impl Into<String>,
        actor: Box<dyn Actor>,
        mode: SpawnMode,
    ) -> Result<(), ActorError> {
        if self.is_shutting_down() {
            return Err(ActorError::ShuttingDown);
        }

        let name = name.into();
        match self.inner.actors.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ActorError::DuplicateName(name)),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let (sender, receiver) = Mailbox::unbounded();
                let ctx = ActorContext::new(name.clone(), self.downgrade());
                let pool = match mode {
                    SpawnMode::Pooled => Some(self.inner.user_pool.clone()),
                    SpawnMode::Direct => None,
                };
                let shutdown_rx = self.inner.shutdown_tx.subscribe();

                let task = spawn(actor_task(actor, receiver, ctx, pool, shutdown_rx));
                let abort = task.abort_handle();

                vacant.insert(ActorEntry {
                    id: ActorId::new(),
                    sender,
                    task,
                    abort,
                    spawned_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    /// Unregister an actor, closing its mailbox.
    ///
    /// Queued invocations are still processed before the task exits.
    pub fn unregister(&self, name: &str) -> Result<(), ActorError> {
        match self.inner.actors.remove(name) {
            Some(_) => Ok(()),
            None => Err(ActorError::UnknownActor(name.to_string())),
        }
    }

    /// When the actor was registered, if it exists.
    pub fn spawned_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.inner.actors.get(name).map(|e| e.spawned_at)
    }

    /// Diagnostic id of an actor, if it exists.
    pub fn actor_id(&self, name: &str) -> Option<ActorId> {
        self.inner.actors.get(name).map(|e| e.id)
    }

    /// Enqueue an action without waiting for a result.
    pub fn tell(&self, name: &str, action: &str, args: &str) -> Result<(), ActorError> {
        if self.is_shutting_down() {
            return Err(ActorError::ShuttingDown);
        }
        let entry = self
            .inner
            .actors
            .get(name)
            .ok_or_else(|| ActorError::UnknownActor(name.to_string()))?;
        entry
            .sender
            .send(Invocation::tell(action, args))
            .map_err(|_| ActorError::MailboxClosed(name.to_string()))
    }

    /// Enqueue an action and await its single reply.
    ///
    /// Must not be called from inside the target actor's own handler: the
    /// mailbox is FIFO with one consumer, so a self-`ask` deadlocks.
    pub async fn ask(
        &self,
        name: &str,
        action: &str,
        args: &str,
    ) -> Result<ActionResult, ActorError> {
        if self.is_shutting_down() {
            return Err(ActorError::ShuttingDown);
        }
        let (invocation, reply) = Invocation::ask(action, args);
        {
            let entry = self
                .inner
                .actors
                .get(name)
                .ok_or_else(|| ActorError::UnknownActor(name.to_string()))?;
            entry
                .sender
                .send(invocation)
                .map_err(|_| ActorError::MailboxClosed(name.to_string()))?;
        }
        reply
            .await
            .map_err(|_| ActorError::ReplyDropped(name.to_string()))
    }

    /// Ergonomic dispatch used by workflow actions.
    ///
    /// All failure modes (unknown actor, closed mailbox, shutdown) are
    /// converted to failed [`ActionResult`]s so that callers only ever deal
    /// with one result shape.
    pub async fn call_by_action_name(&self, name: &str, action: &str, args: &str) -> ActionResult {
        match self.ask(name, action, args).await {
            Ok(result) => result,
            Err(ActorError::UnknownActor(actor)) => ActionResult::unknown_actor(&actor),
            Err(error) => ActionResult::err(format!("Error: {error}")),
        }
    }

    /// Gracefully shut down the system.
    ///
    /// Stops accepting new work, lets in-flight handlers finish, drops
    /// queued messages, and joins all actor tasks within the configured
    /// timeout. Tasks still running at the deadline are aborted.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        {
            let mut state = self.inner.state.write();
            if *state != SystemState::Running {
                return Err(ActorError::ShuttingDown);
            }
            *state = SystemState::ShuttingDown;
        }

        // Wake every actor task out of its mailbox wait.
        let _ = self.inner.shutdown_tx.send(true);

        let names = self.actor_names();
        let mut timed_out = false;
        let deadline = Instant::now() + self.inner.config.shutdown_timeout;

        for name in names {
            if let Some((_, entry)) = self.inner.actors.remove(&name) {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if timeout(remaining, entry.task).await.is_err() {
                    entry.abort.abort();
                    timed_out = true;
                    tracing::warn!(actor = %name, "actor task aborted at shutdown deadline");
                }
            }
        }

        *self.inner.state.write() = SystemState::Stopped;

        if timed_out {
            Err(ActorError::ShutdownTimeout(
                self.inner.config.shutdown_timeout,
            ))
        } else {
            Ok(())
        }
    }
}

impl Clone for ActorSystem {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("actors", &self.actor_count())
            .field("state", &*self.inner.state.read())
            .finish()
    }
}

impl WeakActorSystem {
    /// Attempt to upgrade to an owning handle.
    pub fn upgrade(&self) -> Option<ActorSystem> {
        self.inner.upgrade().map(|inner| ActorSystem { inner })
    }
}

/// The per-actor task: drain the mailbox in FIFO order, one invocation at a
/// time, drawing a user-pool permit per message.
async fn actor_task(
    mut actor: Box<dyn Actor>,
    mut receiver: crate::mailbox::MailboxReceiver,
    ctx: ActorContext,
    pool: Option<WorkerPool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    actor.started(&ctx).await;

    loop {
        tokio::select! {
            // On shutdown, queued messages are dropped.
            biased;
            _ = shutdown_rx.changed() => break,
            maybe = receiver.recv() => {
                let Some(invocation) = maybe else { break };
                let _permit = match &pool {
                    Some(pool) => Some(pool.acquire().await),
                    None => None,
                };
                let queued_ms = (Utc::now() - invocation.enqueued_at).num_milliseconds();
                if queued_ms > 1_000 {
                    tracing::debug!(
                        actor = ctx.name(),
                        action = %invocation.action,
                        queued_ms,
                        "slow mailbox"
                    );
                }

                let handled =
                    AssertUnwindSafe(actor.handle(&invocation.action, &invocation.args, &ctx))
                        .catch_unwind()
                        .await;
                let result = match handled {
                    Ok(result) => result,
                    Err(panic) => {
                        tracing::error!(
                            actor = ctx.name(),
                            action = %invocation.action,
                            "handler panicked"
                        );
                        ActionResult::err(format!("Error: {}", panic_message(&panic)))
                    }
                };

                if let Some(reply) = invocation.reply {
                    // A dropped asking side discards the reply silently.
                    let _ = reply.send(result);
                }
            }
        }
    }

    actor.stopped(&ctx).await;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    eprintln!("DEBUG panic type_id = {:?} vs &str {:?} vs String {:?}", panic.type_id(), std::any::TypeId::of::<&str>(), std::any::TypeId::of::<String>());
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
