//! The single writer task.
//!
//! Owns the only write connection. Drains the bounded multi-producer queue
//! in batches of up to 100 operations per transaction, polling with a
//! 100 ms timeout when idle. A failed batch is rolled back, reported to
//! stderr, and the writer continues; producers with pending
//! acknowledgements get the failure, fire-and-forget records are lost.

// Layer 1: Standard library
use std::time::Duration;

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use drover_actor::WorkerPool;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Connection, Row};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

// Layer 3: Internal
use crate::error::StoreError;
use crate::model::{NewLogRecord, NewNodeResult, NewSession, SessionStatus};

/// Maximum operations applied per transaction.
pub(crate) const BATCH_LIMIT: usize = 100;

/// Idle poll interval when the queue is empty.
pub(crate) const IDLE_POLL: Duration = Duration::from_millis(100);

/// Queue capacity; producers briefly back-pressure beyond this.
pub(crate) const QUEUE_CAPACITY: usize = 8192;

/// One queued write operation.
pub(crate) enum WriteOp {
    OpenSession {
        session: NewSession,
        started_at: DateTime<Utc>,
        ack: oneshot::Sender<Result<i64, StoreError>>,
    },
    Record {
        record: NewLogRecord,
        timestamp: DateTime<Utc>,
    },
    NodeResult(NewNodeResult),
    EndSession {
        session_id: i64,
        status: SessionStatus,
        ended_at: DateTime<Utc>,
        ack: oneshot::Sender<Result<(), StoreError>>,
    },
    Flush {
        ack: oneshot::Sender<()>,
    },
}

/// Per-op bookkeeping collected while a batch is applied.
enum OpOutcome {
    None,
    OpenedSession(i64),
    MissingSession(i64),
}

/// Run the writer until the queue closes, then close the connection.
///
/// The task parks on the reserved database pool for its whole life, which
/// is what keeps database latency out of the user worker slots.
pub(crate) async fn run_writer(
    mut conn: SqliteConnection,
    mut queue: mpsc::Receiver<WriteOp>,
    db_pool: WorkerPool,
) {
    let _permit = db_pool.acquire().await;

    loop {
        let first = match timeout(IDLE_POLL, queue.recv()).await {
            Err(_) => continue,
            Ok(None) => break,
            Ok(Some(op)) => op,
        };

        let mut batch = Vec::with_capacity(BATCH_LIMIT);
        batch.push(first);
        while batch.len() < BATCH_LIMIT {
            match queue.try_recv() {
                Ok(op) => batch.push(op),
                Err(_) => break,
            }
        }

        apply_batch(&mut conn, batch).await;
    }

    if let Err(error) = conn.close().await {
        tracing::error!(%error, "closing log write connection failed");
    }
}

/// Apply one batch in a single transaction and deliver acknowledgements.
async fn apply_batch(conn: &mut SqliteConnection, batch: Vec<WriteOp>) {
    let applied = try_apply(conn, &batch).await;

    match applied {
        Ok(outcomes) => {
            for (op, outcome) in batch.into_iter().zip(outcomes) {
                match (op, outcome) {
                    (WriteOp::OpenSession { ack, .. }, OpOutcome::OpenedSession(id)) => {
                        let _ = ack.send(Ok(id));
                    }
                    (WriteOp::EndSession { ack, .. }, OpOutcome::MissingSession(id)) => {
                        let _ = ack.send(Err(StoreError::UnknownSession(id)));
                    }
                    (WriteOp::EndSession { ack, .. }, _) => {
                        let _ = ack.send(Ok(()));
                    }
                    (WriteOp::Flush { ack }, _) => {
                        let _ = ack.send(());
                    }
                    _ => {}
                }
            }
        }
        Err(error) => {
            tracing::error!(%error, "log write batch rolled back");
            for op in batch {
                match op {
                    WriteOp::OpenSession { ack, .. } => {
                        let _ = ack.send(Err(StoreError::WriteFailed(error.to_string())));
                    }
                    WriteOp::EndSession { ack, .. } => {
                        let _ = ack.send(Err(StoreError::WriteFailed(error.to_string())));
                    }
                    WriteOp::Flush { ack } => {
                        let _ = ack.send(());
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn try_apply(
    conn: &mut SqliteConnection,
    batch: &[WriteOp],
) -> Result<Vec<OpOutcome>, StoreError> {
    let mut tx = conn.begin().await?;
    let mut outcomes = Vec::with_capacity(batch.len());

    for op in batch {
        let outcome = match op {
            WriteOp::OpenSession {
                session,
                started_at,
                ..
            } => {
                sqlx::query(
                    r#"INSERT INTO sessions
                       (started_at, workflow_name, overlay_name, inventory_name, node_count,
                        status, cwd, git_commit, git_branch, command_line, tool_version, tool_commit)
                       VALUES (?, ?, ?, ?, ?, 'RUNNING', ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(started_at)
                .bind(&session.workflow_name)
                .bind(&session.overlay_name)
                .bind(&session.inventory_name)
                .bind(session.node_count)
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
                OpOutcome::OpenedSession(row.try_get::<i64, _>(0)?)
            }
            WriteOp::Record { record, timestamp } => {
                sqlx::query(
                    r#"INSERT INTO logs
                       (session_id, timestamp, node_id, label, action_name, level, message,
                        exit_code, duration_ms)
                       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(record.session_id)
                .bind(timestamp)
                .bind(&record.node_id)
                .bind(&record.label)
                .bind(&record.action_name)
                .bind(record.level.as_str())
                .bind(&record.message)
                .bind(record.exit_code)
                .bind(record.duration_ms)
                .execute(&mut *tx)
                .await?;
                OpOutcome::None
            }
            WriteOp::NodeResult(result) => {
                sqlx::query(
                    r#"INSERT INTO node_results (session_id, node_id, status, reason)
                       VALUES (?, ?, ?, ?)
                       ON CONFLICT(session_id, node_id)
                       DO UPDATE SET status = excluded.status, reason = excluded.reason"#,
                )
                .bind(result.session_id)
                .bind(&result.node_id)
                .bind(result.status.as_str())
                .bind(&result.reason)
                .execute(&mut *tx)
                .await?;
                OpOutcome::None
            }
            WriteOp::EndSession {
                session_id,
                status,
                ended_at,
                ..
            } => {
                let done = sqlx::query("UPDATE sessions SET ended_at = ?, status = ? WHERE id = ?")
                    .bind(ended_at)
                    .bind(status.as_str())
                    .bind(session_id)
                    .execute(&mut *tx)
                    .await?;
                if done.rows_affected() == 0 {
                    OpOutcome::MissingSession(*session_id)
                } else {
                    OpOutcome::None
                }
            }
            WriteOp::Flush { .. } => OpOutcome::None,
        };
        outcomes.push(outcome);
    }

    tx.commit().await?;
    Ok(outcomes)
}
