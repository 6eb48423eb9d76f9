//! SSE line and frame types.

use std::fmt;
use std::time::Duration;

/// Represents a parsed SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Data payload (e.g., `data: {"name":"Pressure"}`)
    Data(String),
    /// Event type declaration (e.g., `event: measurement`)
    Event(String),
    /// Event id (e.g., `id: 42`)
    Id(String),
    /// Reconnection time in milliseconds, unvalidated (e.g., `retry: 3000`)
    Retry(String),
    /// Empty line - terminates the current frame
    Empty,
    /// Comment line (starts with ':')
    Comment(String),
    /// Field name this client does not know; ignored
    Unknown(String),
}

/// One complete frame, as delimited by a blank line.
///
/// `data` is `None` when the frame carried no `data` line at all, which is
/// different from a frame whose only line was an empty `data:`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: Option<String>,
    pub id: Option<String>,
    pub retry: Option<Duration>,
}

/// Errors that can occur during SSE parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseParseError {
    /// A line is not valid UTF-8; `valid_up_to` is the byte offset within
    /// the line where decoding failed.
    InvalidUtf8 { valid_up_to: usize },
}

impl fmt::Display for SseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SseParseError::InvalidUtf8 { valid_up_to } => write!(
                f,
                "Invalid UTF-8 in event stream line after {} bytes",
                valid_up_to
            ),
        }
    }
}

impl std::error::Error for SseParseError {}
