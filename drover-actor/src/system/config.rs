//! System configuration with sensible defaults.

// Layer 1: Standard library
use std::time::Duration;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
// (none)

/// Default width of the shared user worker pool.
pub const DEFAULT_USER_WORKERS: usize = 4;

/// Default width of the reserved database worker pool.
pub const DEFAULT_DB_WORKERS: usize = 1;

/// Default timeout for graceful system shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// System-wide configuration for the actor runtime.
///
/// # Examples
///
/// ```rust
/// use drover_actor::SystemConfig;
///
/// let config = SystemConfig::default();
/// assert_eq!(config.user_workers, 4);
/// assert_eq!(config.db_workers, 1);
///
/// let wide = SystemConfig::with_user_workers(16);
/// assert_eq!(wide.user_workers, 16);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Width of the shared pool gating actor message processing.
    pub user_workers: usize,

    /// Width of the pool reserved for database writes.
    pub db_workers: usize,

    /// Timeout for graceful system shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            user_workers: DEFAULT_USER_WORKERS,
            db_workers: DEFAULT_DB_WORKERS,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl SystemConfig {
    /// Default configuration with a custom user pool width.
    pub fn with_user_workers(user_workers: usize) -> Self {
        Self {
            user_workers,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.user_workers, DEFAULT_USER_WORKERS);
        assert_eq!(config.db_workers, DEFAULT_DB_WORKERS);
        assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn test_with_user_workers() {
        let config = SystemConfig::with_user_workers(8);
        assert_eq!(config.user_workers, 8);
        assert_eq!(config.db_workers, DEFAULT_DB_WORKERS);
    }
}
