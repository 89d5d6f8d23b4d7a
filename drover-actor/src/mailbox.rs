//! Per-actor FIFO mailboxes.
//!
//! A mailbox is an unbounded MPSC channel with a shared depth counter. The
//! receiving half is owned by exactly one actor task, which is what gives
//! handlers their single-writer view of actor state.

// Layer 1: Standard library
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

// Layer 3: Internal
use crate::message::Invocation;

/// Mailbox constructor namespace.
#[derive(Debug)]
pub struct Mailbox;

impl Mailbox {
    /// Create a connected sender/receiver pair with a shared depth counter.
    pub fn unbounded() -> (MailboxSender, MailboxReceiver) {
        let (tx, rx) = unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        (
            MailboxSender {
                tx,
                depth: Arc::clone(&depth),
            },
            MailboxReceiver { rx, depth },
        )
    }
}

/// Producer half of a mailbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MailboxSender {
    tx: UnboundedSender<Invocation>,
    depth: Arc<AtomicUsize>,
}

impl MailboxSender {
    /// Enqueue an invocation. Fails when the actor task has stopped.
    pub fn send(&self, invocation: Invocation) -> Result<(), Invocation> {
        self.depth.fetch_add(1, Ordering::Relaxed);
        self.tx.send(invocation).map_err(|e| {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            e.0
        })
    }

    /// Number of invocations enqueued but not yet taken by the actor.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// True when the consuming actor task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a mailbox. Owned by exactly one actor task.
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: UnboundedReceiver<Invocation>,
    depth: Arc<AtomicUsize>,
}

impl MailboxReceiver {
    /// Receive the next invocation in FIFO order.
    ///
    /// Returns `None` once all senders are dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Invocation> {
        let invocation = self.rx.recv().await;
        if invocation.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        invocation
    }

    /// Close the mailbox to further sends; queued entries remain readable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = Mailbox::unbounded();
        tx.send(Invocation::tell("first", "[]")).unwrap();
        tx.send(Invocation::tell("second", "[]")).unwrap();

        assert_eq!(rx.recv().await.unwrap().action, "first");
        assert_eq!(rx.recv().await.unwrap().action, "second");
    }

    #[tokio::test]
    async fn test_depth_tracking() {
        let (tx, mut rx) = Mailbox::unbounded();
        assert_eq!(tx.depth(), 0);

        tx.send(Invocation::tell("a", "[]")).unwrap();
        tx.send(Invocation::tell("b", "[]")).unwrap();
        assert_eq!(tx.depth(), 2);

        rx.recv().await.unwrap();
        assert_eq!(tx.depth(), 1);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (tx, mut rx) = Mailbox::unbounded();
        rx.close();
        assert!(tx.send(Invocation::tell("late", "[]")).is_err());
    }

    #[tokio::test]
    async fn test_recv_none_after_senders_dropped() {
        let (tx, mut rx) = Mailbox::unbounded();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
