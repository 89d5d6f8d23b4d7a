//! # drover-actor - Named-actor runtime for workflow automation
//!
//! Process-local actor system in which every actor is addressed by a unique
//! string name and exposes its behaviour as named actions taking a single
//! JSON-encoded argument tuple. This uniform edge keeps the dispatcher
//! independent of any particular workflow language.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use drover_actor::prelude::*;
//! use async_trait::async_trait;
//!
//! struct Counter {
//!     count: u64,
//! }
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     async fn handle(&mut self, action: &str, args: &str, _ctx: &ActorContext) -> ActionResult {
//!         match action {
//!             "increment" => {
//!                 self.count += 1;
//!                 ActionResult::ok(self.count.to_string())
//!             }
//!             other => ActionResult::unknown_action(other),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ActorError> {
//!     let system = ActorSystem::new(SystemConfig::default());
//!     system.register("counter", Box::new(Counter { count: 0 }))?;
//!
//!     let result = system.call_by_action_name("counter", "increment", "[]").await;
//!     assert!(result.success);
//!
//!     system.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Discipline
//!
//! - Each actor owns a FIFO mailbox consumed by exactly one task: handlers
//!   observe a single-writer view of the actor's state, no extra locks.
//! - Message processing draws permits from a shared bounded worker pool; a
//!   separate width-1 pool is reserved for database writes so database
//!   latency never consumes workflow worker slots.
//! - Handler panics are caught at the dispatch boundary and converted into
//!   failed [`ActionResult`]s. Actors never crash the system.
//! - Cross-actor invariants require explicit message exchange. Actors hold a
//!   non-owning [`WeakActorSystem`] handle and look collaborators up by name.

pub mod actor;
pub mod error;
pub mod factory;
pub mod loader;
pub mod mailbox;
pub mod message;
pub mod pool;
pub mod prelude;
pub mod system;

// Re-export commonly used types
pub use actor::{Actor, ActorContext};
pub use error::ActorError;
pub use factory::{ActorFactory, ActorSpawnArgs};
pub use loader::LoaderActor;
pub use mailbox::{Mailbox, MailboxReceiver, MailboxSender};
pub use message::{decode_args, encode_args, ActionResult, Invocation};
pub use pool::WorkerPool;
pub use system::{ActorId, ActorSystem, SpawnMode, SystemConfig, WeakActorSystem};
