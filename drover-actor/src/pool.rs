//! Bounded worker pools.
//!
//! Actor tasks are cheap tokio tasks, but the amount of *work in flight* is
//! capped by semaphore-backed pools: a shared user pool (default width 4)
//! gates actor message processing and per-node workflow runs, and a width-1
//! pool is reserved for the database writer so that database latency cannot
//! consume workflow worker slots.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

// Layer 3: Internal
// (none)

/// A named, fixed-width worker pool.
///
/// Cloning shares the underlying permit set.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    width: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool with `width` concurrent slots.
    ///
    /// A width of zero is clamped to one: a pool that can never run
    /// anything would deadlock its first caller.
    pub fn new(name: &'static str, width: usize) -> Self {
        let width = width.max(1);
        Self {
            name,
            width,
            semaphore: Arc::new(Semaphore::new(width)),
        }
    }

    /// Acquire a slot, waiting until one frees up.
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // The semaphore is never closed, so acquire cannot fail.
        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("worker pool semaphore closed"),
        }
    }

    /// Try to acquire a slot without waiting.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).try_acquire_owned().ok()
    }

    /// Configured width of the pool.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Pool name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}
