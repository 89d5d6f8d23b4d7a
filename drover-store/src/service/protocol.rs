//! Wire shapes of the log service protocol.
//!
//! One JSON object per line in both directions. Every request gets exactly
//! one response; failures come back as `{"status":"error", ...}` rather
//! than closing the connection.

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal
use crate::model::{
    LogLevel, LogRecord, NewLogRecord, NewNodeResult, NewSession, NodeResult, Session,
    SessionFilter, SessionStatus, SessionSummary,
};

/// A client request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    OpenSession { session: NewSession },
    AppendRecord { record: NewLogRecord },
    PutNodeResult { result: NewNodeResult },
    EndSession { session_id: i64, status: SessionStatus },
    Flush,
    LatestSessionId,
    ListSessions { limit: usize },
    ListSessionsFiltered { filter: SessionFilter },
    Summary { session_id: i64 },
    LogsByNode { session_id: i64, node_id: String },
    LogsByLevel { session_id: i64, min_level: LogLevel },
    LogsInSession { session_id: i64 },
    NodesInSession { session_id: i64 },
    NodeResults { session_id: i64 },
    Info,
}

/// A server response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok,
    SessionId { id: i64 },
    MaybeSessionId { id: Option<i64> },
    Sessions { sessions: Vec<Session> },
    Summary { summary: Box<SessionSummary> },
    Records { records: Vec<LogRecord> },
    Nodes { nodes: Vec<String> },
    NodeResults { results: Vec<NodeResult> },
    Info { info: Box<ServiceInfo> },
    Error { message: String },
}

/// Body of the HTTP `/info` endpoint and the TCP `Info` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service identifier, always `drover-log-service`.
    pub server: String,

    /// Crate version of the serving process.
    pub version: String,

    /// TCP protocol port.
    pub port: u16,

    /// HTTP info port (`port - 200`).
    pub http_port: u16,

    /// Canonicalized path of the served database.
    pub db_path: String,

    /// File name component of `db_path`.
    pub db_file: String,

    /// When the service started.
    pub started_at: DateTime<Utc>,

    /// Sessions currently in the database.
    pub session_count: i64,

    /// Live TCP client connections; `-1` when unavailable.
    pub active_connections: i64,

    /// Milliseconds since the last session insert or record append.
    pub idle_time_ms: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let encoded = serde_json::to_string(&Request::Summary { session_id: 7 }).unwrap();
        assert_eq!(encoded, r#"{"op":"summary","session_id":7}"#);

        let decoded: Request = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded, Request::Summary { session_id: 7 }));
    }

    #[test]
    fn test_error_response_shape() {
        let encoded = serde_json::to_string(&Response::Error {
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(encoded, r#"{"status":"error","message":"nope"}"#);
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let decoded: Result<Request, _> = serde_json::from_str(r#"{"op":"reboot"}"#);
        assert!(decoded.is_err());
    }
}
