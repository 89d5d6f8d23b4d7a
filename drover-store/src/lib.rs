//! # drover-store - Durable, queryable execution log
//!
//! Append-only relational log shared by the engine (producer), the `logs`
//! query tooling, and optionally several cooperating processes through the
//! [`service::LogService`].
//!
//! Three tables: `sessions` (one row per CLI invocation), `logs`
//! (append-only records), `node_results` (per-node terminal verdicts,
//! unique per `(session_id, node_id)`).
//!
//! # Write path
//!
//! All writes funnel through a single writer task owning the only write
//! connection. Producers enqueue onto a bounded queue; the writer drains up
//! to 100 operations per transaction, polling with a 100 ms timeout when
//! idle. SQL failures roll the batch back, go to stderr, and the writer
//! keeps going; persistence trouble never fails a workflow run.
//!
//! # Read path
//!
//! Queries run on a separate read-only pool ([`LogReader`]) and may proceed
//! concurrently with the writer (WAL journal mode).

pub mod error;
pub mod handle;
pub mod merge;
pub mod model;
pub mod query;
pub mod schema;
pub mod service;
pub mod store;
pub(crate) mod writer;

// Re-export commonly used types
pub use error::StoreError;
pub use handle::LogHandle;
pub use merge::{merge_into, MergeOptions, MergeReport};
pub use model::{
    LogLevel, LogRecord, NewLogRecord, NewNodeResult, NewSession, NodeResult, NodeStatus, Session,
    SessionContext, SessionFilter, SessionStatus, SessionSummary,
};
pub use query::LogReader;
pub use service::{discover_service, LogService, LogServiceConfig, RemoteStore, ServiceInfo};
pub use store::LogStore;

/// Conventional first port of the log service range.
pub const SERVICE_PORT_BASE: u16 = 29090;

/// Last port of the log service range, inclusive.
pub const SERVICE_PORT_END: u16 = 29100;

/// The HTTP info endpoint lives this far below the TCP port.
pub const HTTP_PORT_OFFSET: u16 = 200;
