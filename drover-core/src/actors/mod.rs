//! The distinguished actors every run registers.

mod env;
mod multiplexer;
mod node;
mod node_group;
mod workflow_actor;

pub use env::EnvActor;
pub use multiplexer::OutputMultiplexerActor;
pub use node::{NodeActor, ShellActions};
pub use node_group::NodeGroupActor;
pub use workflow_actor::SubWorkflowActor;

/// Name of the output fan-out actor.
pub const OUTPUT_MULTIPLEXER: &str = "outputMultiplexer";

/// Name of the fan-out orchestrator actor.
pub const NODE_GROUP: &str = "nodeGroup";

/// Name of the dynamic actor creator.
pub const LOADER: &str = "loader";

/// Name of the environment probe actor.
pub const ENV: &str = "env";

/// Node actors register as `node-<hostname>`.
pub fn node_actor_name(hostname: &str) -> String {
    format!("node-{hostname}")
}
