//! Database sink: output triples become structured log records.

// Layer 2: Third-party
use async_trait::async_trait;
use drover_store::{LogHandle, LogLevel, NewLogRecord};

// Layer 3: Internal
use super::{format_block, Accumulator};
use crate::error::EngineError;

/// Packages each output triple as a [`NewLogRecord`] and hands it to the
/// log writer's queue. Fire-and-forget: delivery returns once enqueued,
/// persistence happens on the reserved database lane.
pub struct DatabaseAccumulator {
    log: LogHandle,
    session_id: i64,
    count: u64,
}

impl DatabaseAccumulator {
    /// Sink feeding `log` within `session_id`.
    pub fn new(log: LogHandle, session_id: i64) -> Self {
        Self {
            log,
            session_id,
            count: 0,
        }
    }
}

#[async_trait]
impl Accumulator for DatabaseAccumulator {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn add(
        &mut self,
        source: &str,
        output_type: &str,
        data: &str,
    ) -> Result<(), EngineError> {
        self.count += 1;

        let message = format_block(source, data);
        let record = NewLogRecord {
            session_id: self.session_id,
            node_id: source.to_string(),
            label: None,
            action_name: None,
            level: LogLevel::from_output_type(output_type),
            message: message.trim_end_matches('\n').to_string(),
            exit_code: Some(0),
            duration_ms: None,
        };

        self.log.submit_record(record).await?;
        Ok(())
    }

    fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drover_store::{LogStore, NewSession, SessionContext};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn store_with_session(dir: &TempDir) -> (Arc<LogStore>, i64) {
        let store = LogStore::open(dir.path().join("log.db")).await.unwrap();
        let session = store
            .open_session(NewSession {
                workflow_name: "wf".to_string(),
                overlay_name: None,
                inventory_name: None,
                node_count: 1,
                context: SessionContext::default(),
            })
            .await
            .unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn test_triple_becomes_record() {
        let dir = TempDir::new().unwrap();
        let (store, session) = store_with_session(&dir).await;

        let mut sink = DatabaseAccumulator::new(LogHandle::Embedded(Arc::clone(&store)), session);
        sink.add("node-x", "stdout", "a\nb").await.unwrap();
        store.flush().await.unwrap();

        let records = store.reader().logs_by_node(session, "node-x").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "[node-x] a\n[node-x] b");
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[0].exit_code, Some(0));

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_level_mapping() {
        let dir = TempDir::new().unwrap();
        let (store, session) = store_with_session(&dir).await;
        let mut sink = DatabaseAccumulator::new(LogHandle::Embedded(Arc::clone(&store)), session);

        sink.add("cli", "log-SEVERE", "bad").await.unwrap();
        sink.add("cli", "log-WARNING", "meh").await.unwrap();
        sink.add("cli", "cowsay", "moo").await.unwrap();
        store.flush().await.unwrap();

        let records = store.reader().logs_by_node(session, "cli").await.unwrap();
        let levels: Vec<LogLevel> = records.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![LogLevel::Error, LogLevel::Warn, LogLevel::Info]);

        store.close().await.unwrap();
    }
}
