//! The broadcast fan-out over sinks.

// Layer 3: Internal
use super::Accumulator;

/// Owns the sink list and offers every output triple to each sink.
///
/// A failing sink is reported to stderr only (routing the failure back
/// through the log pipeline could recurse) and its siblings still receive
/// the delivery. The sink list is fixed at startup in practice; mutation
/// goes through `&mut self` on the owning actor.
#[derive(Default)]
pub struct Multiplexer {
    sinks: Vec<Box<dyn Accumulator>>,
}

impl Multiplexer {
    /// An empty multiplexer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sink.
    pub fn push(&mut self, sink: Box<dyn Accumulator>) {
        self.sinks.push(sink);
    }

    /// Number of attached sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver one triple to every sink.
    pub async fn add(&mut self, source: &str, output_type: &str, data: &str) {
        for sink in &mut self.sinks {
            if let Err(error) = sink.add(source, output_type, data).await {
                eprintln!("output sink '{}' failed: {error}", sink.name());
            }
        }
    }

    /// Close every sink.
    pub fn close_all(&mut self) {
        for sink in &mut self.sinks {
            sink.close();
        }
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|sink| sink.name()).collect();
        f.debug_struct("Multiplexer").field("sinks", &names).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct Recording {
        delivered: Arc<AtomicU64>,
        fail: bool,
    }

    #[async_trait]
    impl Accumulator for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn add(&mut self, _s: &str, _t: &str, _d: &str) -> Result<(), EngineError> {
            if self.fail {
                return Err(EngineError::io("sink", "broken"));
            }
            self.delivered.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn count(&self) -> u64 {
            self.delivered.load(Ordering::Relaxed)
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_siblings() {
        let delivered = Arc::new(AtomicU64::new(0));
        let mut multiplexer = Multiplexer::new();
        multiplexer.push(Box::new(Recording {
            delivered: Arc::clone(&delivered),
            fail: true,
        }));
        multiplexer.push(Box::new(Recording {
            delivered: Arc::clone(&delivered),
            fail: false,
        }));

        multiplexer.add("cli", "stdout", "hello").await;
        assert_eq!(delivered.load(Ordering::Relaxed), 1);
    }
}
