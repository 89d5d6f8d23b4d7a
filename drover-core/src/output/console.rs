//! Console sink.

// Layer 1: Standard library
use std::io::Write;

// Layer 2: Third-party
use async_trait::async_trait;

// Layer 3: Internal
use super::{format_block, Accumulator};
use crate::error::EngineError;

/// Writes prefixed output to stdout, routing `stderr`-typed entries to
/// stderr. A quiet console swallows the bytes but still counts entries.
#[derive(Debug, Default)]
pub struct ConsoleAccumulator {
    quiet: bool,
    count: u64,
}

impl ConsoleAccumulator {
    /// A console sink that prints.
    pub fn new() -> Self {
        Self::default()
    }

    /// A console sink that only counts.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            count: 0,
        }
    }
}

#[async_trait]
impl Accumulator for ConsoleAccumulator {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn add(
        &mut self,
        source: &str,
        output_type: &str,
        data: &str,
    ) -> Result<(), EngineError> {
        self.count += 1;
        if self.quiet {
            return Ok(());
        }

        let block = format_block(source, data);
        if output_type == "stderr" {
            let mut stderr = std::io::stderr().lock();
            let _ = stderr.write_all(block.as_bytes());
        } else {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(block.as_bytes());
        }
        Ok(())
    }

    fn count(&self) -> u64 {
        self.count
    }
}
