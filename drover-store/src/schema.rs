//! Schema definition and versioned migration.
//!
//! The schema version lives in SQLite's `user_version` pragma. Migrations
//! are applied in order on open; a database from a newer build is refused
//! rather than guessed at. Readers are forward-compatible within a
//! version: optional columns read as null when absent.

// Layer 2: Third-party
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

// Layer 3: Internal
use crate::error::StoreError;

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

const CREATE_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at     TEXT NOT NULL,
    ended_at       TEXT,
    workflow_name  TEXT NOT NULL,
    overlay_name   TEXT,
    inventory_name TEXT,
    node_count     INTEGER NOT NULL DEFAULT 0,
    status         TEXT NOT NULL DEFAULT 'RUNNING',
    cwd            TEXT,
    git_commit     TEXT,
    git_branch     TEXT,
    command_line   TEXT,
    tool_version   TEXT,
    tool_commit    TEXT
)
"#;

const CREATE_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS logs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  INTEGER NOT NULL REFERENCES sessions(id),
    timestamp   TEXT NOT NULL,
    node_id     TEXT NOT NULL,
    label       TEXT,
    action_name TEXT,
    level       TEXT NOT NULL,
    message     TEXT NOT NULL,
    exit_code   INTEGER,
    duration_ms INTEGER
)
"#;

const CREATE_NODE_RESULTS: &str = r#"
CREATE TABLE IF NOT EXISTS node_results (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    node_id    TEXT NOT NULL,
    status     TEXT NOT NULL,
    reason     TEXT,
    UNIQUE(session_id, node_id)
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_logs_session ON logs(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_logs_node ON logs(node_id)",
    "CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level)",
    "CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_workflow ON sessions(workflow_name)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at)",
];

/// Bring a freshly opened write connection up to [`SCHEMA_VERSION`].
pub async fn migrate(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let found = user_version(conn).await?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    if found < 1 {
        sqlx::query(CREATE_SESSIONS).execute(&mut *conn).await?;
        sqlx::query(CREATE_LOGS).execute(&mut *conn).await?;
        sqlx::query(CREATE_NODE_RESULTS).execute(&mut *conn).await?;
        for ddl in CREATE_INDEXES {
            sqlx::query(ddl).execute(&mut *conn).await?;
        }
        set_user_version(conn, 1).await?;
    }

    Ok(())
}

async fn user_version(conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let row = sqlx::query("PRAGMA user_version").fetch_one(conn).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

async fn set_user_version(conn: &mut SqliteConnection, version: i64) -> Result<(), StoreError> {
    // PRAGMA does not accept bind parameters.
    sqlx::query(&format!("PRAGMA user_version = {version}"))
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use sqlx::ConnectOptions;

    async fn memory_conn() -> SqliteConnection {
        SqliteConnectOptions::new()
            .in_memory(true)
            .connect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrate_fresh_database() {
        let mut conn = memory_conn().await;
        migrate(&mut conn).await.unwrap();
        assert_eq!(user_version(&mut conn).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let mut conn = memory_conn().await;
        migrate(&mut conn).await.unwrap();
        migrate(&mut conn).await.unwrap();
        assert_eq!(user_version(&mut conn).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_newer_schema_refused() {
        let mut conn = memory_conn().await;
        set_user_version(&mut conn, SCHEMA_VERSION + 1).await.unwrap();
        let result = migrate(&mut conn).await;
        assert!(matches!(result, Err(StoreError::SchemaVersion { .. })));
    }
}
