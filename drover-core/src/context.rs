//! Typed runtime context threaded through the engine.
//!
//! Everything that used to be a global (the actor system, the log
//! destination, the current session) travels here explicitly. The
//! context holds a non-owning system handle: the system owns the actors,
//! and many actors hold a context.

// Layer 2: Third-party
use drover_actor::{ActionResult, WeakActorSystem};
use drover_store::{LogHandle, LogLevel, NewLogRecord, NewNodeResult, NodeStatus};

/// Shared run state handed to interpreters, built-in actors, and the
/// reporter.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    system: WeakActorSystem,
    log: Option<LogHandle>,
    session_id: i64,
}

impl RuntimeContext {
    /// Context for a run with an open session.
    pub fn new(system: WeakActorSystem, log: Option<LogHandle>, session_id: i64) -> Self {
        Self {
            system,
            log,
            session_id,
        }
    }

    /// Context without a log destination (tests, `--no-log-db`).
    pub fn without_log(system: WeakActorSystem) -> Self {
        Self {
            system,
            log: None,
            session_id: 0,
        }
    }

    /// Non-owning handle to the actor system.
    pub fn system(&self) -> &WeakActorSystem {
        &self.system
    }

    /// The open session id; zero when logging is disabled.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// The log destination, if logging is enabled.
    pub fn log(&self) -> Option<&LogHandle> {
        self.log.as_ref()
    }

    /// Invoke an action on a named actor.
    pub async fn call(&self, actor: &str, method: &str, args: &str) -> ActionResult {
        match self.system.upgrade() {
            Some(system) => system.call_by_action_name(actor, method, args).await,
            None => ActionResult::err("Actor system has shut down"),
        }
    }

    /// Persist one structured record; persistence trouble is reported to
    /// stderr and otherwise ignored.
    pub async fn record(&self, record: NewLogRecord) {
        if let Some(log) = &self.log {
            if let Err(error) = log.submit_record(record).await {
                tracing::error!(%error, "log record dropped");
            }
        }
    }

    /// Persist a plain message at `level` from `node_id`.
    pub async fn log_message(&self, node_id: &str, level: LogLevel, message: impl Into<String>) {
        self.record(NewLogRecord::message(
            self.session_id,
            node_id,
            level,
            message,
        ))
        .await;
    }

    /// Persist (or overwrite) a node verdict.
    pub async fn node_result(&self, node_id: &str, status: NodeStatus, reason: Option<String>) {
        if let Some(log) = &self.log {
            let result = NewNodeResult {
                session_id: self.session_id,
                node_id: node_id.to_string(),
                status,
                reason,
            };
            if let Err(error) = log.submit_node_result(result).await {
                tracing::error!(%error, "node result dropped");
            }
        }
    }

    /// Route an output triple through the multiplexer actor.
    pub async fn emit(&self, source: &str, output_type: &str, data: &str) {
        let args = drover_actor::encode_args(&[source, output_type, data]);
        let result = self.call("outputMultiplexer", "add", &args).await;
        if !result.success {
            tracing::debug!(reason = %result.result, "output emit failed");
        }
    }
}
