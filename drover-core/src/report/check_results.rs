//! Check-result lines: `%`-prefixed output collected across the session.
//!
//! Workflows print check outcomes as lines starting with `%` (a
//! convention the multiplexer passes through untouched). This section
//! collects them from every node, deduplicates, and sorts.

// Layer 2: Third-party
use async_trait::async_trait;
use regex::Regex;

// Layer 3: Internal
use super::section::{ReportContext, ReportSection};
use crate::error::EngineError;

/// Default order of this section.
pub const CHECK_RESULTS_ORDER: i32 = 500;

/// Collects `%` lines from `logs.message`.
pub struct CheckResultsSection {
    order: i32,
    source_prefix: Regex,
}

impl Default for CheckResultsSection {
    fn default() -> Self {
        Self::with_order(CHECK_RESULTS_ORDER)
    }
}

impl CheckResultsSection {
    /// Section at a custom position.
    pub fn with_order(order: i32) -> Self {
        Self {
            order,
            // Messages stored via the database sink carry a "[node-…] "
            // prefix per line; strip it before looking for the marker.
            #[allow(clippy::unwrap_used)] // literal pattern
            source_prefix: Regex::new(r"^\[[^\]]+\] ").unwrap(),
        }
    }
}

#[async_trait]
impl ReportSection for CheckResultsSection {
    fn order(&self) -> i32 {
        self.order
    }

    async fn generate(&self, ctx: &ReportContext) -> Result<String, EngineError> {
        let records = ctx.log.logs_in_session(ctx.session_id).await?;

        let mut seen = std::collections::HashSet::new();
        let mut checks = Vec::new();
        for record in &records {
            for line in record.message.lines() {
                let stripped = self.source_prefix.replace(line, "");
                if let Some(check) = stripped.strip_prefix('%') {
                    let check = check.trim().to_string();
                    if seen.insert(check.clone()) {
                        checks.push(check);
                    }
                }
            }
        }

        if checks.is_empty() {
            return Ok(String::new());
        }
        checks.sort();
        Ok(format!("Check results:\n{}", checks.join("\n")))
    }
}
