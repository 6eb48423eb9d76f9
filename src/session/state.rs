//! Connection state of an event stream session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a session's connection.
///
/// `Closed` is both the initial state and the terminal state of every
/// connection attempt, whether it ended by `stop()`, a clean server close,
/// or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Closed,
    Connecting,
    Open,
}

impl ConnectionState {
    /// True while a connection attempt is in flight.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Short label suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_closed() {
        assert_eq!(ConnectionState::default(), ConnectionState::Closed);
    }

    #[test]
    fn test_is_active() {
        assert!(!ConnectionState::Closed.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Open.to_string(), "open");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
        let state: ConnectionState = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(state, ConnectionState::Open);
    }
}
