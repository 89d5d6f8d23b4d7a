//! Convenience re-exports for the common 90% use case.
//!
//! ```rust,ignore
//! use drover_actor::prelude::*;
//! ```

pub use crate::actor::{Actor, ActorContext};
pub use crate::error::ActorError;
pub use crate::factory::{ActorFactory, ActorSpawnArgs};
pub use crate::loader::LoaderActor;
pub use crate::message::{decode_args, encode_args, ActionResult, Invocation};
pub use crate::pool::WorkerPool;
pub use crate::system::{ActorSystem, SpawnMode, SystemConfig, WeakActorSystem};
