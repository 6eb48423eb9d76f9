//! Error category classification.
//!
//! Categories give callers a coarse handle on a failure so they can decide
//! whether to reconnect, surface the problem, or give up.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS, TLS or timeout failures.
    /// Generally transient and retryable.
    Network,

    /// The server ended or refused the stream.
    /// Generally transient and retryable after a delay.
    Server,

    /// The stream carried bytes this client cannot interpret.
    /// Not retryable without a server-side fix.
    Protocol,

    /// Invalid session configuration (empty URL, zero capacities, bad env).
    /// Not retryable until the configuration is corrected.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and a new connection attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns a user-friendly description of the category.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Network connectivity issue",
            ErrorCategory::Server => "Server-side issue",
            ErrorCategory::Protocol => "Malformed event stream",
            ErrorCategory::Configuration => "Configuration problem",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
