//! Error types for the actor runtime.

// Layer 2: Third-party
use thiserror::Error;

/// Errors surfaced by the actor system itself.
///
/// Failures *inside* action handlers never appear here; those travel as
/// failed [`crate::ActionResult`]s.
#[derive(Error, Debug)]
pub enum ActorError {
    /// An actor name resolved to an existing registration.
    #[error("Actor name already registered: {0}")]
    DuplicateName(String),

    /// No actor is registered under the given name.
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    /// The target actor's mailbox no longer accepts messages.
    #[error("Mailbox closed for actor: {0}")]
    MailboxClosed(String),

    /// The asking side's reply channel was dropped before a reply arrived.
    #[error("Reply dropped by actor: {0}")]
    ReplyDropped(String),

    /// The system is shutting down and rejects new work.
    #[error("Actor system is shutting down")]
    ShuttingDown,

    /// Graceful shutdown did not finish within the configured timeout.
    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(std::time::Duration),

    /// No constructor is registered for the requested actor kind.
    #[error("Unknown actor class: {0}")]
    UnknownClass(String),

    /// A dynamic constructor failed.
    #[error("Actor construction failed for class '{class}': {reason}")]
    ConstructionFailed { class: String, reason: String },
}

impl ActorError {
    /// Creates a construction failure error.
    pub fn construction_failed(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            class: class.into(),
            reason: reason.into(),
        }
    }
}
