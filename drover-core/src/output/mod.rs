//! Multiplexed output: one emit, many sinks.

mod console;
mod database;
mod file;
mod multiplexer;

pub use console::ConsoleAccumulator;
pub use database::DatabaseAccumulator;
pub use file::FileAccumulator;
pub use multiplexer::Multiplexer;

// Layer 2: Third-party
use async_trait::async_trait;

// Layer 3: Internal
use crate::error::EngineError;

/// A destination for formatted output.
///
/// Every emitted triple `(source, type, data)` is offered to each sink;
/// a failing sink must not stop its siblings (the multiplexer enforces
/// that). Sinks are owned by the multiplexer actor, so `add` can take
/// `&mut self` without locking.
#[async_trait]
pub trait Accumulator: Send {
    /// Sink name for stderr failure reports.
    fn name(&self) -> &'static str;

    /// Deliver one output triple.
    async fn add(&mut self, source: &str, output_type: &str, data: &str)
        -> Result<(), EngineError>;

    /// Entries delivered so far (counted even when suppressed).
    fn count(&self) -> u64;

    /// Release resources. Idempotent; delivery after close is an error.
    fn close(&mut self) {}
}

/// Prefix every line of `data` with `[source] `, with a trailing newline
/// after the block.
///
/// ```
/// use drover_core::output::format_block;
///
/// assert_eq!(format_block("node-x", "a\nb"), "[node-x] a\n[node-x] b\n");
/// assert_eq!(format_block("cli", ""), "[cli] \n");
/// ```
pub fn format_block(source: &str, data: &str) -> String {
    if data.is_empty() {
        return format!("[{source}] \n");
    }
    let mut block = String::with_capacity(data.len() + 16);
    for line in data.lines() {
        block.push('[');
        block.push_str(source);
        block.push_str("] ");
        block.push_str(line);
        block.push('\n');
    }
    block
}
