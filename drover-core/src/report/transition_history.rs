//! Transition history: what each interpreter actually did, in order.

// Layer 2: Third-party
use async_trait::async_trait;
use drover_store::LogRecord;

// Layer 3: Internal
use super::section::{ReportContext, ReportSection};
use crate::actors::NODE_GROUP;
use crate::error::EngineError;

/// Default order of this section.
pub const TRANSITION_HISTORY_ORDER: i32 = 550;

/// Renders `Transition …` log rows, one line each: `o` for success, `x`
/// for failure, timestamp, `from->to`, the transition's note when its
/// label excerpt carries one, and the error suffix on failures.
pub struct TransitionHistorySection {
    order: i32,
    target_node: String,
    include_children: bool,
}

impl Default for TransitionHistorySection {
    fn default() -> Self {
        Self {
            order: TRANSITION_HISTORY_ORDER,
            target_node: NODE_GROUP.to_string(),
            include_children: true,
        }
    }
}

impl TransitionHistorySection {
    /// History of one specific node id.
    pub fn for_node(target_node: impl Into<String>) -> Self {
        Self {
            order: TRANSITION_HISTORY_ORDER,
            target_node: target_node.into(),
            include_children: false,
        }
    }

    fn render(records: &[LogRecord]) -> Vec<String> {
        records
            .iter()
            .filter(|record| record.message.starts_with("Transition "))
            .map(|record| {
                let (marker, rest) = match record.message.strip_prefix("Transition ") {
                    Some(rest) if rest.contains(": SUCCESS") => ("o", rest),
                    Some(rest) => ("x", rest),
                    None => ("x", record.message.as_str()),
                };

                // "0->1: SUCCESS" or "0->1: FAILED - reason"
                let (edge, outcome) = rest.split_once(':').unwrap_or((rest, ""));
                let note = record
                    .label
                    .as_deref()
                    .and_then(extract_note)
                    .map(|note| format!(" [{note}]"))
                    .unwrap_or_default();
                let error = outcome
                    .trim()
                    .strip_prefix("FAILED - ")
                    .map(|reason| format!(" - {reason}"))
                    .unwrap_or_default();

                format!(
                    "{marker} {} {edge}{note}{error}",
                    record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ")
                )
            })
            .collect()
    }
}

/// Pull the `note:` line out of a transition's YAML excerpt.
fn extract_note(label: &str) -> Option<String> {
    label.lines().find_map(|line| {
        line.trim()
            .strip_prefix("note:")
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty())
    })
}

#[async_trait]
impl ReportSection for TransitionHistorySection {
    fn order(&self) -> i32 {
        self.order
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        let mut blocks = Vec::new();

        if self.include_children && self.target_node == NODE_GROUP {
            // Group mode: every node id that produced transition rows.
            for node in ctx.log.nodes_in_session(ctx.session_id).await? {
                let records = ctx.log.logs_by_node(ctx.session_id, &node).await?;
                let lines = Self::render(&records);
                if !lines.is_empty() {
                    blocks.push(format!("{node}:\n{}", lines.join("\n")));
                }
            }
        } else {
            let records = ctx
                .log
                .logs_by_node(ctx.session_id, &self.target_node)
                .await?;
            let lines = Self::render(&records);
            if !lines.is_empty() {
                blocks.push(lines.join("\n"));
            }
        }

        if blocks.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("Transition history:\n{}", blocks.join("\n")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drover_store::{LogHandle, LogLevel, LogStore, NewLogRecord, NewSession, SessionContext};
    use tempfile::TempDir;

    #[test]
    fn test_extract_note() {
        assert_eq!(
            extract_note("from: '0'\nto: '1'\nnote: restart services"),
            Some("restart services".to_string())
        );
        assert_eq!(extract_note("from: '0'"), None);
    }

    #[tokio::test]
    async fn test_renders_grouped_history() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::open(dir.path().join("log.db")).await.unwrap();
        let session = store
            .open_session(NewSession {
                workflow_name: "wf".to_string(),
                overlay_name: None,
                inventory_name: None,
                node_count: 2,
                context: SessionContext::default(),
            })
            .await
            .unwrap();

        store
            .submit_record(
                NewLogRecord::message(
                    session,
                    "node-a",
                    LogLevel::Info,
                    "Transition 0->1: SUCCESS",
                )
                .with_label("from: '0'\nto: '1'\nnote: warm up"),
            )
            .await
            .unwrap();
        store
            .submit_record(NewLogRecord::message(
                session,
                "node-a",
                LogLevel::Error,
                "Transition 1->2: FAILED - boom",
            ))
            .await
            .unwrap();
        store
            .submit_record(NewLogRecord::message(
                session,
                "node-b",
                LogLevel::Info,
                "not a transition",
            ))
            .await
            .unwrap();
        store.flush().await.unwrap();

        let ctx = ReportContext {
            log: LogHandle::Embedded(store),
            session_id: session,
            workflow: None,
            workflow_path: None,
        };
        let output = TransitionHistorySection::default()
            .generate(&ctx)
            .await
            .unwrap();

        assert!(output.starts_with("Transition history:"));
        assert!(output.contains("node-a:"));
        assert!(output.contains("o "));
        assert!(output.contains("0->1 [warm up]"));
        assert!(output.contains("x "));
        assert!(output.contains("- boom"));
        // node-b produced no transition rows and is not listed.
        assert!(!output.contains("node-b"));
    }
}
