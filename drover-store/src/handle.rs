//! One handle over embedded and remote stores.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
// (none)

// Layer 3: Internal
use crate::error::StoreError;
use crate::model::{
    LogLevel, LogRecord, NewLogRecord, NewNodeResult, NewSession, NodeResult, Session,
    SessionFilter, SessionStatus, SessionSummary,
};
use crate::service::RemoteStore;
use crate::store::LogStore;

/// Where log records go: an embedded store this process owns, or a shared
/// log service another process owns.
///
/// The engine, accumulators, and reporter are all written against this
/// handle so a run behaves identically in both modes.
#[derive(Clone)]
pub enum LogHandle {
    Embedded(Arc<LogStore>),
    Remote(Arc<RemoteStore>),
}

impl LogHandle {
    /// Open a session and return its id.
    pub async fn open_session(&self, session: NewSession) -> Result<i64, StoreError> {
        match self {
            Self::Embedded(store) => store.open_session(session).await,
            Self::Remote(remote) => remote.open_session(session).await,
        }
    }

    /// Enqueue one log record; returns once enqueued, not once persisted.
    pub async fn submit_record(&self, record: NewLogRecord) -> Result<(), StoreError> {
        match self {
            Self::Embedded(store) => store.submit_record(record).await,
            Self::Remote(remote) => remote.submit_record(record).await,
        }
    }

    /// Insert or overwrite one node verdict.
    pub async fn submit_node_result(&self, result: NewNodeResult) -> Result<(), StoreError> {
        match self {
            Self::Embedded(store) => store.submit_node_result(result).await,
            Self::Remote(remote) => remote.submit_node_result(result).await,
        }
    }

    /// Close a session after the write queue drains.
    pub async fn end_session(
        &self,
        session_id: i64,
        status: SessionStatus,
    ) -> Result<(), StoreError> {
        match self {
            Self::Embedded(store) => store.end_session(session_id, status).await,
            Self::Remote(remote) => remote.end_session(session_id, status).await,
        }
    }

    /// Wait until everything submitted so far is committed.
    pub async fn flush(&self) -> Result<(), StoreError> {
        match self {
            Self::Embedded(store) => store.flush().await,
            Self::Remote(remote) => remote.flush().await,
        }
    }

    /// Release this handle's resources. For an embedded store that stops
    /// the writer; a remote service keeps running for its other clients.
    pub async fn close(&self) -> Result<(), StoreError> {
        match self {
            Self::Embedded(store) => store.close().await,
            Self::Remote(_) => Ok(()),
        }
    }

    /// Highest session id, if any.
    pub async fn latest_session_id(&self) -> Result<Option<i64>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().latest_session_id().await,
            Self::Remote(remote) => remote.latest_session_id().await,
        }
    }

    /// Newest sessions, capped at `limit`.
    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().list_sessions(limit).await,
            Self::Remote(remote) => remote.list_sessions(limit).await,
        }
    }

    /// Filtered session listing.
    pub async fn list_sessions_filtered(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<Session>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().list_sessions_filtered(&filter).await,
            Self::Remote(remote) => remote.list_sessions_filtered(filter).await,
        }
    }

    /// Aggregate summary of one session.
    pub async fn summary(&self, session_id: i64) -> Result<SessionSummary, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().summary(session_id).await,
            Self::Remote(remote) => remote.summary(session_id).await,
        }
    }

    /// Records one node produced in a session, in submission order.
    pub async fn logs_by_node(
        &self,
        session_id: i64,
        node_id: &str,
    ) -> Result<Vec<LogRecord>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().logs_by_node(session_id, node_id).await,
            Self::Remote(remote) => remote.logs_by_node(session_id, node_id).await,
        }
    }

    /// Records of a session at or above a level.
    pub async fn logs_by_level(
        &self,
        session_id: i64,
        min_level: LogLevel,
    ) -> Result<Vec<LogRecord>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().logs_by_level(session_id, min_level).await,
            Self::Remote(remote) => remote.logs_by_level(session_id, min_level).await,
        }
    }

    /// Every record of a session, in insertion order.
    pub async fn logs_in_session(&self, session_id: i64) -> Result<Vec<LogRecord>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().logs_in_session(session_id).await,
            Self::Remote(remote) => remote.logs_in_session(session_id).await,
        }
    }

    /// Distinct node ids seen in a session.
    pub async fn nodes_in_session(&self, session_id: i64) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().nodes_in_session(session_id).await,
            Self::Remote(remote) => remote.nodes_in_session(session_id).await,
        }
    }

    /// Node verdicts of a session.
    pub async fn node_results(&self, session_id: i64) -> Result<Vec<NodeResult>, StoreError> {
        match self {
            Self::Embedded(store) => store.reader().node_results(session_id).await,
            Self::Remote(remote) => remote.node_results(session_id).await,
        }
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded(store) => write!(f, "LogHandle::Embedded({})", store.path().display()),
            Self::Remote(remote) => write!(f, "LogHandle::Remote({})", remote.target()),
        }
    }
}
