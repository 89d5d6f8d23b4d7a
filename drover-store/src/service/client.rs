//! Client side of the log service protocol.

// Layer 2: Third-party
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LinesCodec};

// Layer 3: Internal
use super::protocol::{Request, Response, ServiceInfo};
use crate::error::StoreError;
use crate::model::{
    LogLevel, LogRecord, NewLogRecord, NewNodeResult, NewSession, NodeResult, Session,
    SessionFilter, SessionStatus, SessionSummary,
};

/// A connection to a running [`super::LogService`].
///
/// Mirrors the [`crate::LogStore`] producer and query surface; requests
/// are serialized over one connection, one JSON line each way per call.
pub struct RemoteStore {
    framed: Mutex<Framed<TcpStream, LinesCodec>>,
    target: String,
}

impl RemoteStore {
    /// Connect to a service's TCP endpoint.
    pub async fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self, StoreError> {
        let target = addr.to_string();
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Mutex::new(Framed::new(stream, LinesCodec::new())),
            target,
        })
    }

    /// Address this client talks to.
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn roundtrip(&self, request: &Request) -> Result<Response, StoreError> {
        let encoded = serde_json::to_string(request)?;
        let mut framed = self.framed.lock().await;
        framed
            .send(encoded)
            .await
            .map_err(|error| StoreError::protocol(error.to_string()))?;
        match framed.next().await {
            Some(Ok(line)) => {
                let response: Response = serde_json::from_str(&line)?;
                if let Response::Error { message } = response {
                    Err(StoreError::Remote(message))
                } else {
                    Ok(response)
                }
            }
            Some(Err(error)) => Err(StoreError::protocol(error.to_string())),
            None => Err(StoreError::protocol("connection closed")),
        }
    }

    async fn expect_ok(&self, request: &Request) -> Result<(), StoreError> {
        match self.roundtrip(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Open a session on the served database.
    pub async fn open_session(&self, session: NewSession) -> Result<i64, StoreError> {
        match self.roundtrip(&Request::OpenSession { session }).await? {
            Response::SessionId { id } => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    /// Append one log record.
    pub async fn submit_record(&self, record: NewLogRecord) -> Result<(), StoreError> {
        self.expect_ok(&Request::AppendRecord { record }).await
    }

    /// Insert or overwrite one node verdict.
    pub async fn submit_node_result(&self, result: NewNodeResult) -> Result<(), StoreError> {
        self.expect_ok(&Request::PutNodeResult { result }).await
    }

    /// Close a session after the service's queue drains.
    pub async fn end_session(
        &self,
        session_id: i64,
        status: SessionStatus,
    ) -> Result<(), StoreError> {
        self.expect_ok(&Request::EndSession { session_id, status })
            .await
    }

    /// Wait until everything submitted so far is committed.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.expect_ok(&Request::Flush).await
    }

    /// Highest session id, if any.
    pub async fn latest_session_id(&self) -> Result<Option<i64>, StoreError> {
        match self.roundtrip(&Request::LatestSessionId).await? {
            Response::MaybeSessionId { id } => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    /// Newest sessions, capped at `limit`.
    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        match self.roundtrip(&Request::ListSessions { limit }).await? {
            Response::Sessions { sessions } => Ok(sessions),
            other => Err(unexpected(&other)),
        }
    }

    /// Filtered session listing.
    pub async fn list_sessions_filtered(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<Session>, StoreError> {
        match self
            .roundtrip(&Request::ListSessionsFiltered { filter })
            .await?
        {
            Response::Sessions { sessions } => Ok(sessions),
            other => Err(unexpected(&other)),
        }
    }

    /// Aggregate summary of one session.
    pub async fn summary(&self, session_id: i64) -> Result<SessionSummary, StoreError> {
        match self.roundtrip(&Request::Summary { session_id }).await? {
            Response::Summary { summary } => Ok(*summary),
            other => Err(unexpected(&other)),
        }
    }

    /// Records one node produced in a session.
    pub async fn logs_by_node(
        &self,
        session_id: i64,
        node_id: &str,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let request = Request::LogsByNode {
            session_id,
            node_id: node_id.to_string(),
        };
        match self.roundtrip(&request).await? {
            Response::Records { records } => Ok(records),
            other => Err(unexpected(&other)),
        }
    }

    /// Records of a session at or above a level.
    pub async fn logs_by_level(
        &self,
        session_id: i64,
        min_level: LogLevel,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let request = Request::LogsByLevel {
            session_id,
            min_level,
        };
        match self.roundtrip(&request).await? {
            Response::Records { records } => Ok(records),
            other => Err(unexpected(&other)),
        }
    }

    /// Every record of a session.
    pub async fn logs_in_session(&self, session_id: i64) -> Result<Vec<LogRecord>, StoreError> {
        match self.roundtrip(&Request::LogsInSession { session_id }).await? {
            Response::Records { records } => Ok(records),
            other => Err(unexpected(&other)),
        }
    }

    /// Distinct node ids seen in a session.
    pub async fn nodes_in_session(&self, session_id: i64) -> Result<Vec<String>, StoreError> {
        match self.roundtrip(&Request::NodesInSession { session_id }).await? {
            Response::Nodes { nodes } => Ok(nodes),
            other => Err(unexpected(&other)),
        }
    }

    /// Node verdicts of a session.
    pub async fn node_results(&self, session_id: i64) -> Result<Vec<NodeResult>, StoreError> {
        match self.roundtrip(&Request::NodeResults { session_id }).await? {
            Response::NodeResults { results } => Ok(results),
            other => Err(unexpected(&other)),
        }
    }

    /// Service info over the TCP protocol.
    pub async fn info(&self) -> Result<ServiceInfo, StoreError> {
        match self.roundtrip(&Request::Info).await? {
            Response::Info { info } => Ok(*info),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> StoreError {
    StoreError::protocol(format!("unexpected response: {response:?}"))
}
