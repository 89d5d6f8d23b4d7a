//! Row types shared by the store, the service protocol, and callers.

// Layer 1: Standard library
use std::fmt;
use std::str::FromStr;

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal
// (none)

/// Severity of one log record.
///
/// Levels are totally ordered: `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Canonical uppercase name, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Level names at or above `self`, for query predicates.
    pub fn at_or_above(self) -> Vec<&'static str> {
        [Self::Debug, Self::Info, Self::Warn, Self::Error]
            .into_iter()
            .filter(|level| *level >= self)
            .map(Self::as_str)
            .collect()
    }

    /// Map a multiplexer output type to a level.
    ///
    /// `log-SEVERE` maps to `ERROR`, `log-WARNING` to `WARN`, `log-INFO` to
    /// `INFO`; anything else (stdout, stderr, cowsay, plugin-result) is
    /// `INFO`.
    pub fn from_output_type(output_type: &str) -> Self {
        match output_type {
            "log-SEVERE" | "log-ERROR" => Self::Error,
            "log-WARNING" | "log-WARN" => Self::Warn,
            _ => Self::Info,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" | "SEVERE" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Canonical uppercase name, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal verdict of one node within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    Success,
    Failed,
}

impl NodeStatus {
    /// Canonical uppercase name, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown node status: {other}")),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution context captured when a session opens.
///
/// All fields are best effort; a missing git checkout simply leaves the
/// commit and branch empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub cwd: Option<String>,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
    pub command_line: Option<String>,
    pub tool_version: Option<String>,
    pub tool_commit: Option<String>,
}

/// What a caller supplies to open a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub workflow_name: String,
    pub overlay_name: Option<String>,
    pub inventory_name: Option<String>,
    pub node_count: i64,
    pub context: SessionContext,
}

/// One row of the `sessions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub workflow_name: String,
    pub overlay_name: Option<String>,
    pub inventory_name: Option<String>,
    pub node_count: i64,
    pub status: SessionStatus,
    pub context: SessionContext,
}

/// What a producer submits for one log record.
///
/// The timestamp is assigned at submission, the row id by the database;
/// records from a single producer keep their submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogRecord {
    pub session_id: i64,
    pub node_id: String,
    pub label: Option<String>,
    pub action_name: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub exit_code: Option<i64>,
    pub duration_ms: Option<i64>,
}

impl NewLogRecord {
    /// Minimal record: a leveled message from one node.
    pub fn message(
        session_id: i64,
        node_id: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            node_id: node_id.into(),
            label: None,
            action_name: None,
            level,
            message: message.into(),
            exit_code: None,
            duration_ms: None,
        }
    }

    /// Attach the originating transition excerpt.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach the `actor.method` name.
    pub fn with_action_name(mut self, action_name: impl Into<String>) -> Self {
        self.action_name = Some(action_name.into());
        self
    }

    /// Attach the command exit code.
    pub fn with_exit_code(mut self, exit_code: i64) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    /// Attach the measured duration.
    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// One row of the `logs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub label: Option<String>,
    pub action_name: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub exit_code: Option<i64>,
    pub duration_ms: Option<i64>,
}

/// What a caller supplies for a node verdict. Re-submitting for the same
/// `(session_id, node_id)` overwrites the previous verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNodeResult {
    pub session_id: i64,
    pub node_id: String,
    pub status: NodeStatus,
    pub reason: Option<String>,
}

/// One row of the `node_results` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub id: i64,
    pub session_id: i64,
    pub node_id: String,
    pub status: NodeStatus,
    pub reason: Option<String>,
}

/// Predicates for `list_sessions_filtered`. `None` fields do not filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    pub workflow_name: Option<String>,
    pub overlay_name: Option<String>,
    pub inventory_name: Option<String>,
    pub started_after: Option<DateTime<Utc>>,
    pub ended_after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Aggregated view of one session, composed in a single call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: Session,
    pub nodes_total: i64,
    pub nodes_success: i64,
    pub nodes_failed: i64,
    pub log_count: i64,
    pub error_count: i64,
    pub warn_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_level_at_or_above() {
        assert_eq!(LogLevel::Warn.at_or_above(), vec!["WARN", "ERROR"]);
        assert_eq!(LogLevel::Debug.at_or_above().len(), 4);
    }

    #[test]
    fn test_level_from_output_type() {
        assert_eq!(LogLevel::from_output_type("log-SEVERE"), LogLevel::Error);
        assert_eq!(LogLevel::from_output_type("log-WARNING"), LogLevel::Warn);
        assert_eq!(LogLevel::from_output_type("log-INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from_output_type("stdout"), LogLevel::Info);
        assert_eq!(LogLevel::from_output_type("cowsay"), LogLevel::Info);
    }

    #[test]
    fn test_level_parse_lenient() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("SEVERE".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_record_builder() {
        let record = NewLogRecord::message(1, "node-web-01", LogLevel::Info, "hello")
            .with_action_name("shell.run")
            .with_exit_code(0)
            .with_duration_ms(12);
        assert_eq!(record.action_name.as_deref(), Some("shell.run"));
        assert_eq!(record.exit_code, Some(0));
        assert_eq!(record.duration_ms, Some(12));
    }
}
