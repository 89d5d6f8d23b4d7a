//! Embedded log store: one writer task, shared read pool.

// Layer 1: Standard library
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party
use chrono::Utc;
use drover_actor::WorkerPool;
use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::ConnectOptions;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

// Layer 3: Internal
use crate::error::StoreError;
use crate::model::{NewLogRecord, NewNodeResult, NewSession, SessionStatus};
use crate::query::LogReader;
use crate::writer::{run_writer, WriteOp, QUEUE_CAPACITY};

/// Writer drain cap applied at close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable, queryable, append-only log.
///
/// The store owns its write connection exclusively through the writer
/// task; reads go through a separate read-only pool and may proceed
/// concurrently. See the crate docs for the write batching contract.
///
/// Submissions are fire-and-forget: they return once enqueued, not once
/// persisted. [`LogStore::end_session`] and [`LogStore::flush`] are the
/// two points that wait for the queue to drain.
pub struct LogStore {
    db_path: PathBuf,
    // Dropped at close so the writer observes end-of-queue after draining.
    queue: Mutex<Option<mpsc::Sender<WriteOp>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    reader: LogReader,
}

impl LogStore {
    /// Open (creating if missing) the database at `path` and start the
    /// writer task on a private width-1 pool.
    pub async fn open(path: impl AsRef<Path>) -> Result<Arc<Self>, StoreError> {
        Self::open_with_pool(path, WorkerPool::new("db", 1)).await
    }

    /// Open with an externally owned database worker pool.
    ///
    /// The writer parks on one slot of `db_pool` for its whole life, so a
    /// width-1 pool makes the single-writer discipline visible to the
    /// system that owns the pools.
    pub async fn open_with_pool(
        path: impl AsRef<Path>,
        db_pool: WorkerPool,
    ) -> Result<Arc<Self>, StoreError> {
        let db_path = path.as_ref().to_path_buf();

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let mut conn: SqliteConnection = options.connect().await?;
        crate::schema::migrate(&mut conn).await?;

        let reader = LogReader::open(&db_path).await?;

        let (queue, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let writer = tokio::spawn(run_writer(conn, receiver, db_pool));

        Ok(Arc::new(Self {
            db_path,
            queue: Mutex::new(Some(queue)),
            writer: Mutex::new(Some(writer)),
            reader,
        }))
    }

    /// Transient sender handle; fails once the store is closed.
    fn sender(&self) -> Result<mpsc::Sender<WriteOp>, StoreError> {
        self.queue.lock().clone().ok_or(StoreError::WriterClosed)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// The read-only query surface.
    pub fn reader(&self) -> &LogReader {
        &self.reader
    }

    /// Open a session and return its id. Ids strictly increase.
    pub async fn open_session(&self, session: NewSession) -> Result<i64, StoreError> {
        let (ack, rx) = oneshot::channel();
        self.sender()?
            .send(WriteOp::OpenSession {
                session,
                started_at: Utc::now(),
                ack,
            })
            .await
            .map_err(|_| StoreError::WriterClosed)?;
        rx.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Enqueue one log record. Returns once enqueued.
    pub async fn submit_record(&self, record: NewLogRecord) -> Result<(), StoreError> {
        self.sender()?
            .send(WriteOp::Record {
                record,
                timestamp: Utc::now(),
            })
            .await
            .map_err(|_| StoreError::WriterClosed)
    }

    /// Insert or overwrite one node verdict.
    pub async fn submit_node_result(&self, result: NewNodeResult) -> Result<(), StoreError> {
        self.sender()?
            .send(WriteOp::NodeResult(result))
            .await
            .map_err(|_| StoreError::WriterClosed)
    }

    /// Close a session: waits until every previously enqueued record is
    /// committed, then stamps `ended_at` and the final status.
    ///
    /// Idempotent in effect; a second call rewrites the same columns.
    pub async fn end_session(
        &self,
        session_id: i64,
        status: SessionStatus,
    ) -> Result<(), StoreError> {
        let (ack, rx) = oneshot::channel();
        self.sender()?
            .send(WriteOp::EndSession {
                session_id,
                status,
                ended_at: Utc::now(),
                ack,
            })
            .await
            .map_err(|_| StoreError::WriterClosed)?;
        rx.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Wait until everything enqueued so far is committed.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (ack, rx) = oneshot::channel();
        self.sender()?
            .send(WriteOp::Flush { ack })
            .await
            .map_err(|_| StoreError::WriterClosed)?;
        rx.await.map_err(|_| StoreError::WriterClosed)
    }

    /// Stop the writer: the queue closes, remaining operations are
    /// drained (capped at five seconds), and the write connection closes.
    ///
    /// Idempotent; later submissions fail with [`StoreError::WriterClosed`].
    pub async fn close(&self) -> Result<(), StoreError> {
        // Dropping the sender closes the queue; the writer drains what is
        // left and exits.
        drop(self.queue.lock().take());

        let handle = self.writer.lock().take();
        let Some(handle) = handle else {
            return Ok(()); // already closed
        };

        let abort = handle.abort_handle();
        match timeout(CLOSE_TIMEOUT, handle).await {
            Ok(_) => Ok(()),
            Err(_) => {
                abort.abort();
                Err(StoreError::DrainTimeout(CLOSE_TIMEOUT))
            }
        }
    }
}
