//! GPU inventory scraped from command output in the logs.
//!
//! Three identification shapes are recognized wherever they appear in a
//! session's messages:
//!
//! - NVIDIA SMI CSV rows: `NVIDIA GeForce RTX 3090, 24576 MiB, 535.129`
//! - ROCm key/value rows: `Card series: Radeon RX 7900`
//! - `lspci` VGA rows: `01:00.0 VGA compatible controller: …`

// Layer 1: Standard library
use std::collections::BTreeMap;

// Layer 2: Third-party
use async_trait::async_trait;
use regex::Regex;

// Layer 3: Internal
use super::section::{ReportContext, ReportSection};
use crate::error::EngineError;

/// Default order of this section.
pub const GPU_SUMMARY_ORDER: i32 = 600;

/// One line per recognized GPU attribute per node, plus a count.
pub struct GpuSummarySection {
    order: i32,
    source_prefix: Regex,
    nvidia_csv: Regex,
    rocm_kv: Regex,
    lspci_vga: Regex,
}

impl Default for GpuSummarySection {
    fn default() -> Self {
        Self::with_order(GPU_SUMMARY_ORDER)
    }
}

#[allow(clippy::unwrap_used)] // literal patterns
impl GpuSummarySection {
    /// Section at a custom position.
    pub fn with_order(order: i32) -> Self {
        Self {
            order,
            source_prefix: Regex::new(r"^\[[^\]]+\] ").unwrap(),
            nvidia_csv: Regex::new(r"^(NVIDIA [^,]+),\s*(\d+\s*MiB)(?:,\s*(\S+))?").unwrap(),
            rocm_kv: Regex::new(r"^(Card series|Card model|Card vendor|GPU memory)\s*:\s*(.+)$")
                .unwrap(),
            lspci_vga: Regex::new(r"VGA compatible controller:\s*(.+)$").unwrap(),
        }
    }

    fn scan_line(&self, line: &str, attributes: &mut Vec<(String, String)>) {
        if let Some(capture) = self.nvidia_csv.captures(line) {
            attributes.push(("name".to_string(), capture[1].trim().to_string()));
            attributes.push(("memory".to_string(), capture[2].trim().to_string()));
            if let Some(driver) = capture.get(3) {
                attributes.push(("driver".to_string(), driver.as_str().trim().to_string()));
            }
        } else if let Some(capture) = self.rocm_kv.captures(line) {
            attributes.push((
                capture[1].trim().to_ascii_lowercase().replace(' ', "_"),
                capture[2].trim().to_string(),
            ));
        } else if let Some(capture) = self.lspci_vga.captures(line) {
            attributes.push(("vga".to_string(), capture[1].trim().to_string()));
        }
    }
}

#[async_trait]
impl ReportSection for GpuSummarySection {
    fn order(&self) -> i32 {
        self.order
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        let records = ctx.log.logs_in_session(ctx.session_id).await?;

        // node id -> attribute lines, deduplicated, insertion-ordered.
        let mut per_node: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for record in &records {
            let mut attributes = Vec::new();
            for line in record.message.lines() {
                let stripped = self.source_prefix.replace(line, "");
                self.scan_line(stripped.trim(), &mut attributes);
            }
            if !attributes.is_empty() {
                let entry = per_node.entry(record.node_id.clone()).or_default();
                for attribute in attributes {
                    if !entry.contains(&attribute) {
                        entry.push(attribute);
                    }
                }
            }
        }

        if per_node.is_empty() {
            return Ok(String::new());
        }

        let mut lines = vec!["GPU summary:".to_string()];
        let mut attribute_count = 0;
        for (node, attributes) in &per_node {
            for (key, value) in attributes {
                lines.push(format!("{node}: {key} = {value}"));
                attribute_count += 1;
            }
        }
        lines.push(format!(
            "{attribute_count} GPU attributes across {} nodes",
            per_node.len()
        ));
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drover_store::{LogHandle, LogLevel, LogStore, NewLogRecord, NewSession, SessionContext};
    use tempfile::TempDir;

    #[test]
    fn test_scan_shapes() {
        let section = GpuSummarySection::default();
        let mut attributes = Vec::new();

        section.scan_line("NVIDIA GeForce RTX 3090, 24576 MiB, 535.129.03", &mut attributes);
        section.scan_line("Card series: Radeon RX 7900 XTX", &mut attributes);
        section.scan_line(
            "01:00.0 VGA compatible controller: Intel Corporation UHD Graphics 770",
            &mut attributes,
        );
        section.scan_line("nothing to see", &mut attributes);

        let keys: Vec<&str> = attributes.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["name", "memory", "driver", "card_series", "vga"]);
    }

    #[tokio::test]
    async fn test_generates_per_node_lines() {
        let dir = TempDir::new().unwrap();
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

        store
            .submit_record(NewLogRecord::message(
                session,
                "node-gpu-01",
                LogLevel::Info,
                "[node-gpu-01] NVIDIA A100-SXM4-40GB, 40960 MiB, 550.54",
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
        let output = GpuSummarySection::default().generate(&ctx).await.unwrap();

        assert!(output.starts_with("GPU summary:"));
        assert!(output.contains("node-gpu-01: name = NVIDIA A100-SXM4-40GB"));
        assert!(output.contains("node-gpu-01: memory = 40960 MiB"));
        assert!(output.ends_with("3 GPU attributes across 1 nodes"));
    }
}
