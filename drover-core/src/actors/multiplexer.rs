//! The `outputMultiplexer` actor.

// Layer 2: Third-party
use async_trait::async_trait;
use drover_actor::{decode_args, ActionResult, Actor, ActorContext};

// Layer 3: Internal
use crate::output::Multiplexer;

/// Actor facade over the sink fan-out.
///
/// Everything that prints goes through `add(source, type, data)` on this
/// actor, which gives the whole engine one ordered output stream per
/// sink: the actor's FIFO mailbox is the ordering guarantee.
pub struct OutputMultiplexerActor {
    multiplexer: Multiplexer,
}

impl OutputMultiplexerActor {
    /// Wrap a configured multiplexer.
    pub fn new(multiplexer: Multiplexer) -> Self {
        Self { multiplexer }
    }
}

#[async_trait]
impl Actor for OutputMultiplexerActor {
    async fn handle(&mut self, action: &str, args: &str, _ctx: &ActorContext) -> ActionResult {
        match action {
            "add" => {
                let args = match decode_args(args) {
                    Ok(args) => args,
                    Err(error) => return ActionResult::err(format!("Bad arguments: {error}")),
                };
                let [source, output_type, data] = args.as_slice() else {
                    return ActionResult::err(format!(
                        "add expects [source, type, data], got {} arguments",
                        args.len()
                    ));
                };
                self.multiplexer.add(source, output_type, data).await;
                ActionResult::ok("")
            }
            "sinkCount" => ActionResult::ok(self.multiplexer.sink_count().to_string()),
            "close" => {
                self.multiplexer.close_all();
                ActionResult::ok("")
            }
            other => ActionResult::unknown_action(other),
        }
    }

    async fn stopped(&mut self, _ctx: &ActorContext) {
        self.multiplexer.close_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::output::FileAccumulator;
    use drover_actor::{encode_args, ActorSystem, SystemConfig};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_fans_out_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");

        let mut multiplexer = Multiplexer::new();
        multiplexer.push(Box::new(FileAccumulator::open(&path).unwrap()));

        let system = ActorSystem::new(SystemConfig::default());
        system
            .register(
                "outputMultiplexer",
                Box::new(OutputMultiplexerActor::new(multiplexer)),
            )
            .unwrap();

        let args = encode_args(&["node-x", "stdout", "a\nb"]);
        let result = system
            .call_by_action_name("outputMultiplexer", "add", &args)
            .await;
        assert!(result.success);

        system
            .call_by_action_name("outputMultiplexer", "close", "[]")
            .await;
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[node-x] a\n[node-x] b\n");
    }
}
