//! Read-only query surface.
//!
//! Runs on its own connection pool, distinct from the writer's connection,
//! and is safe to share across readers. All queries are session-scoped
//! except the session listings.

// Layer 1: Standard library
use std::path::{Path, PathBuf};
use std::time::Duration;

// Layer 2: Third-party
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

// Layer 3: Internal
use crate::error::StoreError;
use crate::model::{
    LogLevel, LogRecord, NodeResult, Session, SessionContext, SessionFilter, SessionSummary,
};

/// Default cap for session listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Shared, thread-safe read access to a log database.
///
/// The pool issues plain connections and the reader only ever runs SELECTs;
/// WAL journal mode lets these proceed while the writer commits.
#[derive(Debug, Clone)]
pub struct LogReader {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl LogReader {
    /// Open a reader over an existing database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Ok(Self { pool, db_path })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Highest session id, if any sessions exist.
    pub async fn latest_session_id(&self) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT MAX(id) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<Option<i64>, _>(0)?)
    }

    /// Total number of sessions.
    pub async fn session_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// One session by id.
    pub async fn session(&self, session_id: i64) -> Result<Session, StoreError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => session_from_row(&row),
            None => Err(StoreError::UnknownSession(session_id)),
        }
    }

    /// At most `limit` sessions, newest `started_at` first.
    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sessions ORDER BY started_at DESC, id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(session_from_row).collect()
    }

    /// Filtered session listing, newest first.
    pub async fn list_sessions_filtered(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sql = String::from("SELECT * FROM sessions WHERE 1=1");
        if filter.workflow_name.is_some() {
            sql.push_str(" AND workflow_name = ?");
        }
        if filter.overlay_name.is_some() {
            sql.push_str(" AND overlay_name = ?");
        }
        if filter.inventory_name.is_some() {
            sql.push_str(" AND inventory_name = ?");
        }
        if filter.started_after.is_some() {
            sql.push_str(" AND started_at >= ?");
        }
        if filter.ended_after.is_some() {
            sql.push_str(" AND ended_at >= ?");
        }
        sql.push_str(" ORDER BY started_at DESC, id DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(workflow) = &filter.workflow_name {
            query = query.bind(workflow);
        }
        if let Some(overlay) = &filter.overlay_name {
            query = query.bind(overlay);
        }
        if let Some(inventory) = &filter.inventory_name {
            query = query.bind(inventory);
        }
        if let Some(started_after) = &filter.started_after {
            query = query.bind(*started_after);
        }
        if let Some(ended_after) = &filter.ended_after {
            query = query.bind(*ended_after);
        }
        query = query.bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64);

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(session_from_row).collect()
    }

    /// Every session in id order; used by the merge tool.
    pub async fn all_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sessions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(session_from_row).collect()
    }

    /// Aggregate node and log counts for one session in a single call.
    pub async fn summary(&self, session_id: i64) -> Result<SessionSummary, StoreError> {
        let session = self.session(session_id).await?;

        let mut nodes_total = 0;
        let mut nodes_success = 0;
        let mut nodes_failed = 0;
        let node_rows =
            sqlx::query("SELECT status, COUNT(*) FROM node_results WHERE session_id = ? GROUP BY status")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;
        for row in &node_rows {
            let status: String = row.try_get(0)?;
            let count: i64 = row.try_get(1)?;
            nodes_total += count;
            match status.as_str() {
                "SUCCESS" => nodes_success += count,
                _ => nodes_failed += count,
            }
        }

        let mut log_count = 0;
        let mut error_count = 0;
        let mut warn_count = 0;
        let level_rows =
            sqlx::query("SELECT level, COUNT(*) FROM logs WHERE session_id = ? GROUP BY level")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;
        for row in &level_rows {
            let level: String = row.try_get(0)?;
            let count: i64 = row.try_get(1)?;
            log_count += count;
            match level.as_str() {
                "ERROR" => error_count += count,
                "WARN" => warn_count += count,
                _ => {}
            }
        }

        Ok(SessionSummary {
            session,
            nodes_total,
            nodes_success,
            nodes_failed,
            log_count,
            error_count,
            warn_count,
        })
    }

    /// All records one node produced in a session, in submission order.
    pub async fn logs_by_node(
        &self,
        session_id: i64,
        node_id: &str,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM logs WHERE session_id = ? AND node_id = ? ORDER BY id")
                .bind(session_id)
                .bind(node_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// All records of a session at or above `min_level`, in insertion
    /// order.
    pub async fn logs_by_level(
        &self,
        session_id: i64,
        min_level: LogLevel,
    ) -> Result<Vec<LogRecord>, StoreError> {
        // Level names are compile-time constants; inlining them keeps the
        // predicate a plain index scan.
        let levels = min_level
            .at_or_above()
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(",");
        let sql =
            format!("SELECT * FROM logs WHERE session_id = ? AND level IN ({levels}) ORDER BY id");

        let rows = sqlx::query(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Every record of a session, in insertion order.
    pub async fn logs_in_session(&self, session_id: i64) -> Result<Vec<LogRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM logs WHERE session_id = ? ORDER BY id")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Distinct node ids that logged or reported a result in a session.
    pub async fn nodes_in_session(&self, session_id: i64) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT DISTINCT node_id FROM logs WHERE session_id = ?
               UNION
               SELECT DISTINCT node_id FROM node_results WHERE session_id = ?
               ORDER BY 1"#,
        )
        .bind(session_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>(0)?))
            .collect()
    }

    /// All node verdicts of a session, by node id.
    pub async fn node_results(&self, session_id: i64) -> Result<Vec<NodeResult>, StoreError> {
        let rows = sqlx::query("SELECT * FROM node_results WHERE session_id = ? ORDER BY node_id")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(node_result_from_row).collect()
    }
}

fn session_from_row(row: &SqliteRow) -> Result<Session, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Session {
        id: row.try_get("id")?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        workflow_name: row.try_get("workflow_name")?,
        overlay_name: row.try_get("overlay_name")?,
        inventory_name: row.try_get("inventory_name")?,
        node_count: row.try_get("node_count")?,
        status: status.parse().map_err(StoreError::Protocol)?,
        context: SessionContext {
            // Context columns are forward-compatible: absent reads as null.
            cwd: optional_text(row, "cwd"),
            git_commit: optional_text(row, "git_commit"),
            git_branch: optional_text(row, "git_branch"),
            command_line: optional_text(row, "command_line"),
            tool_version: optional_text(row, "tool_version"),
            tool_commit: optional_text(row, "tool_commit"),
        },
    })
}

fn record_from_row(row: &SqliteRow) -> Result<LogRecord, StoreError> {
    let level: String = row.try_get("level")?;
    Ok(LogRecord {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        timestamp: row.try_get("timestamp")?,
        node_id: row.try_get("node_id")?,
        label: optional_text(row, "label"),
        action_name: optional_text(row, "action_name"),
        level: level.parse().map_err(StoreError::Protocol)?,
        message: row.try_get("message")?,
        exit_code: row.try_get("exit_code")?,
        duration_ms: row.try_get("duration_ms")?,
    })
}

fn node_result_from_row(row: &SqliteRow) -> Result<NodeResult, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(NodeResult {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        node_id: row.try_get("node_id")?,
        status: status.parse().map_err(StoreError::Protocol)?,
        reason: optional_text(row, "reason"),
    })
}

fn optional_text(row: &SqliteRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column).unwrap_or(None)
}
