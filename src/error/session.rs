//! Errors published on a session's error channel.

use std::fmt;

use super::category::ErrorCategory;
use super::transport::TransportError;
use crate::sse::SseParseError;

/// Terminal error of one connection attempt.
///
/// Every variant closes the attempt; the session never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The transport failed to open the stream or reported a failed completion.
    Transport(TransportError),

    /// The stream carried bytes that are not valid UTF-8.
    Decode(SseParseError),
}

impl SessionError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::Transport(err) => err.category(),
            SessionError::Decode(_) => ErrorCategory::Protocol,
        }
    }

    /// Check if starting the session again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Transport(err) => err.is_retryable(),
            SessionError::Decode(_) => false,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Transport(err) => err.error_code(),
            SessionError::Decode(_) => "E_STREAM_DECODE",
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Transport(err) => err.user_message(),
            SessionError::Decode(_) => {
                "Received data from the server that could not be decoded.".to_string()
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Transport(err) => write!(f, "Transport error: {}", err),
            SessionError::Decode(err) => write!(f, "Decode error: {}", err),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(err) => Some(err),
            SessionError::Decode(err) => Some(err),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Transport(err)
    }
}

impl From<SseParseError> for SessionError {
    fn from(err: SseParseError) -> Self {
        SessionError::Decode(err)
    }
}
