//! Host specifications and host-limit gating.

// Layer 1: Standard library
use std::collections::BTreeSet;
use std::fmt;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

/// One managed host as described by an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    /// Hostname or IP address.
    pub hostname: String,

    /// Login user.
    pub user: String,

    /// SSH port.
    pub port: u16,

    /// Password, when password auth is in use. Agent auth otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl HostSpec {
    /// A host with the default user (`root`) and port (22).
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            user: "root".to_string(),
            port: 22,
            password: None,
        }
    }

    /// Set the login user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Whether this host is the machine we are already running on.
    pub fn is_local(&self) -> bool {
        matches!(self.hostname.as_str(), "localhost" | "127.0.0.1" | "::1")
    }

    /// `user@hostname:port` form used in logs and reports.
    pub fn target(&self) -> String {
        if self.is_local() {
            "localhost".to_string()
        } else {
            format!("{}@{}:{}", self.user, self.hostname, self.port)
        }
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target())
    }
}

/// A comma-separated restriction on which inventory hosts participate.
///
/// The limit is intersected with the inventory when node actors are
/// created; an empty intersection is a hard error at that point, reported
/// by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLimit {
    names: BTreeSet<String>,
}

impl HostLimit {
    /// Parse `"web-01,web-02 , db-01"` into a limit set.
    ///
    /// Returns `None` for an empty or all-whitespace input, meaning no
    /// restriction.
    pub fn parse(raw: &str) -> Option<Self> {
        let names: BTreeSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    /// Hosts from `inventory` whose hostname appears in the limit,
    /// preserving inventory order.
    pub fn intersect<'a>(&self, inventory: &'a [HostSpec]) -> Vec<&'a HostSpec> {
        inventory
            .iter()
            .filter(|host| self.names.contains(&host.hostname))
            .collect()
    }

    /// Limit entries with no matching inventory host, for error messages.
    pub fn unmatched(&self, inventory: &[HostSpec]) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| !inventory.iter().any(|host| &&host.hostname == name))
            .cloned()
            .collect()
    }
}

impl fmt::Display for HostLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        write!(f, "{}", names.join(","))
    }
}
