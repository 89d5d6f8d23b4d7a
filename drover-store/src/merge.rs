//! Merging log databases.
//!
//! Sessions from each source are appended to the target with fresh ids;
//! their logs and node results follow with the session id remapped. The
//! duplicate key is `workflow_name|started_at`, which survives renumbering.

// Layer 1: Standard library
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Layer 2: Third-party
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, Row};

// Layer 3: Internal
use crate::error::StoreError;
use crate::model::Session;
use crate::query::LogReader;
use crate::schema;

/// Behaviour switches for a merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Count what would change without writing anything.
    pub dry_run: bool,

    /// Skip sessions whose `workflow_name|started_at` key already exists
    /// in the target. Applying the same merge twice is then a no-op.
    pub skip_duplicates: bool,
}

/// What a merge run did (or, with `dry_run`, would do).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub sources: usize,
    pub sessions_merged: usize,
    pub sessions_skipped: usize,
    pub records_copied: u64,
    pub node_results_copied: u64,
}

/// Merge `sources` into the database at `target`, creating it if needed.
///
/// Unreadable sources abort the merge before anything is written to the
/// target.
pub async fn merge_into(
    target: &Path,
    sources: &[PathBuf],
    options: &MergeOptions,
) -> Result<MergeReport, StoreError> {
    // Open every source first so a bad path fails the whole run early.
    let mut readers = Vec::with_capacity(sources.len());
    for source in sources {
        if !source.exists() {
            return Err(StoreError::merge_source(
                source.display().to_string(),
                "no such file",
            ));
        }
        let reader = LogReader::open(source)
            .await
            .map_err(|error| StoreError::merge_source(source.display().to_string(), error.to_string()))?;
        readers.push(reader);
    }

    let mut conn: SqliteConnection = SqliteConnectOptions::new()
        .filename(target)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .connect()
        .await?;
    schema::migrate(&mut conn).await?;

    let mut seen = existing_keys(&mut conn).await?;
    let mut report = MergeReport {
        sources: sources.len(),
        ..MergeReport::default()
    };

    for reader in &readers {
        for session in reader.all_sessions().await? {
            let key = dedup_key(&session);
            if options.skip_duplicates && seen.contains(&key) {
                report.sessions_skipped += 1;
                continue;
            }
            seen.insert(key);
            report.sessions_merged += 1;

            if options.dry_run {
                report.records_copied += reader.logs_in_session(session.id).await?.len() as u64;
                report.node_results_copied +=
                    reader.node_results(session.id).await?.len() as u64;
                continue;
            }

            let copied = copy_session(&mut conn, reader, &session).await?;
            report.records_copied += copied.0;
            report.node_results_copied += copied.1;
        }
    }

    conn.close().await?;
    Ok(report)
}

fn dedup_key(session: &Session) -> String {
    format!("{}|{}", session.workflow_name, session.started_at.to_rfc3339())
}

async fn existing_keys(conn: &mut SqliteConnection) -> Result<HashSet<String>, StoreError> {
    let rows = sqlx::query("SELECT workflow_name, started_at FROM sessions")
        .fetch_all(&mut *conn)
        .await?;
    let mut keys = HashSet::with_capacity(rows.len());
    for row in rows {
        let workflow: String = row.try_get(0)?;
        let started_at: chrono::DateTime<chrono::Utc> = row.try_get(1)?;
        keys.insert(format!("{}|{}", workflow, started_at.to_rfc3339()));
    }
    Ok(keys)
}

/// Copy one session and its children inside a single transaction.
async fn copy_session(
    conn: &mut SqliteConnection,
    reader: &LogReader,
    session: &Session,
) -> Result<(u64, u64), StoreError> {
    let records = reader.logs_in_session(session.id).await?;
    let results = reader.node_results(session.id).await?;

    let mut tx = conn.begin().await?;

    sqlx::query(
        r#"INSERT INTO sessions
           (started_at, ended_at, workflow_name, overlay_name, inventory_name, node_count,
            status, cwd, git_commit, git_branch, command_line, tool_version, tool_commit)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(session.started_at)
    .bind(session.ended_at)
    .bind(&session.workflow_name)
    .bind(&session.overlay_name)
    .bind(&session.inventory_name)
    .bind(session.node_count)
    .bind(session.status.as_str())
    .bind(&session.context.cwd)
    .bind(&session.context.git_commit)
    .bind(&session.context.git_branch)
    .bind(&session.context.command_line)
    .bind(&session.context.tool_version)
    .bind(&session.context.tool_commit)
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query("SELECT last_insert_rowid()")
        .fetch_one(&mut *tx)
        .await?;
    let new_id: i64 = row.try_get(0)?;

    for record in &records {
        sqlx::query(
            r#"INSERT INTO logs
               (session_id, timestamp, node_id, label, action_name, level, message,
                exit_code, duration_ms)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(new_id)
        .bind(record.timestamp)
        .bind(&record.node_id)
        .bind(&record.label)
        .bind(&record.action_name)
        .bind(record.level.as_str())
        .bind(&record.message)
        .bind(record.exit_code)
        .bind(record.duration_ms)
        .execute(&mut *tx)
        .await?;
    }

    for result in &results {
        sqlx::query(
            r#"INSERT INTO node_results (session_id, node_id, status, reason)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(session_id, node_id)
               DO UPDATE SET status = excluded.status, reason = excluded.reason"#,
        )
        .bind(new_id)
        .bind(&result.node_id)
        .bind(result.status.as_str())
        .bind(&result.reason)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok((records.len() as u64, results.len() as u64))
}
