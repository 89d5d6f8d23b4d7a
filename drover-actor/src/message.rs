//! Action results and mailbox messages.

// Layer 1: Standard library
use std::fmt;

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

// Layer 3: Internal
// (none)

/// Universal outcome of invoking an action on an actor.
///
/// This is the only shape that crosses the actor boundary: failures are
/// carried as `success = false` with a human-readable reason in `result`,
/// never as panics or typed errors.
///
/// # Example
/// ```rust
/// use drover_actor::ActionResult;
///
/// let ok = ActionResult::ok("42");
/// assert!(ok.success);
///
/// let failed = ActionResult::err("boom");
/// assert!(!failed.success);
/// assert_eq!(failed.result, "boom");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action completed successfully.
    pub success: bool,

    /// Result payload on success, failure reason otherwise.
    pub result: String,
}

impl ActionResult {
    /// Successful result with a payload.
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: result.into(),
        }
    }

    /// Failed result with a reason.
    pub fn err(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            result: reason.into(),
        }
    }

    /// Failure reported when an actor name does not resolve.
    pub fn unknown_actor(name: &str) -> Self {
        Self::err(format!("Unknown actor: {name}"))
    }

    /// Failure reported when an actor does not implement an action.
    pub fn unknown_action(action: &str) -> Self {
        Self::err(format!("Unknown action: {action}"))
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "OK: {}", self.result)
        } else {
            write!(f, "FAILED: {}", self.result)
        }
    }
}

/// A single mailbox entry: one action invocation.
///
/// `reply` is present for `ask` style calls and absent for `tell`. If the
/// asking side has gone away, the reply send fails silently and the result
/// is discarded.
#[derive(Debug)]
pub struct Invocation {
    /// Action name, matched by the actor's handler.
    pub action: String,

    /// Compact JSON array of arguments, e.g. `["deploy.yaml"]`.
    pub args: String,

    /// Reply channel for `ask`; `None` for fire-and-forget `tell`.
    pub reply: Option<oneshot::Sender<ActionResult>>,

    /// Enqueue timestamp, for mailbox latency diagnostics.
    pub enqueued_at: DateTime<Utc>,
}

impl Invocation {
    /// Create a fire-and-forget invocation.
    pub fn tell(action: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: args.into(),
            reply: None,
            enqueued_at: Utc::now(),
        }
    }

    /// Create a request invocation plus the receiver for its reply.
    pub fn ask(
        action: impl Into<String>,
        args: impl Into<String>,
    ) -> (Self, oneshot::Receiver<ActionResult>) {
        let (tx, rx) = oneshot::channel();
        let invocation = Self {
            action: action.into(),
            args: args.into(),
            reply: Some(tx),
            enqueued_at: Utc::now(),
        };
        (invocation, rx)
    }
}

/// Encode positional string arguments as the compact JSON array every
/// action receives.
///
/// # Example
/// ```rust
/// use drover_actor::encode_args;
///
/// assert_eq!(encode_args(&["deploy.yaml"]), r#"["deploy.yaml"]"#);
/// assert_eq!(encode_args(&[]), "[]");
/// ```
pub fn encode_args(args: &[&str]) -> String {
    // serde_json cannot fail on a slice of strings
    serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string())
}

/// Decode the JSON argument tuple back into owned strings.
///
/// Callers that expect a fixed arity should check the length themselves and
/// return [`ActionResult::err`] on mismatch.
pub fn decode_args(args: &str) -> Result<Vec<String>, serde_json::Error> {
    if args.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(args)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_result_ok() {
        let result = ActionResult::ok("done");
        assert!(result.success);
        assert_eq!(result.result, "done");
    }

    #[test]
    fn test_action_result_err() {
        let result = ActionResult::err("bad input");
        assert!(!result.success);
        assert_eq!(result.result, "bad input");
    }

    #[test]
    fn test_unknown_actor_message() {
        let result = ActionResult::unknown_actor("ghost");
        assert!(!result.success);
        assert_eq!(result.result, "Unknown actor: ghost");
    }

    #[test]
    fn test_unknown_action_message() {
        let result = ActionResult::unknown_action("fly");
        assert_eq!(result.result, "Unknown action: fly");
    }

    #[test]
    fn test_display() {
        assert_eq!(ActionResult::ok("x").to_string(), "OK: x");
        assert_eq!(ActionResult::err("y").to_string(), "FAILED: y");
    }

    #[test]
    fn test_encode_args_roundtrip() {
        let encoded = encode_args(&["a", "b c", "\"quoted\""]);
        let decoded = decode_args(&encoded).unwrap();
        assert_eq!(decoded, vec!["a", "b c", "\"quoted\""]);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_args("").unwrap().is_empty());
        assert!(decode_args("[]").unwrap().is_empty());
    }

    #[test]
    fn test_tell_has_no_reply() {
        let invocation = Invocation::tell("run", "[]");
        assert!(invocation.reply.is_none());
    }

    #[tokio::test]
    async fn test_ask_reply_roundtrip() {
        let (invocation, rx) = Invocation::ask("run", "[]");
        invocation
            .reply
            .unwrap()
            .send(ActionResult::ok("done"))
            .unwrap();
        let result = rx.await.unwrap();
        assert_eq!(result.result, "done");
    }

    #[test]
    fn test_ask_dropped_receiver_is_silent() {
        let (invocation, rx) = Invocation::ask("run", "[]");
        drop(rx);
        // The send fails but must not panic.
        assert!(invocation.reply.unwrap().send(ActionResult::ok("x")).is_err());
    }
}
