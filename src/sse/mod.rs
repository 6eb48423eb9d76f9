//! `text/event-stream` frame parsing.
//!
//! An event stream is a sequence of frames separated by blank lines:
//! - `data: <payload>` - payload line; repeated lines join with `\n`
//! - `event: <type>` - event type
//! - `id: <id>` - last event id
//! - `retry: <millis>` - reconnection hint
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - Line and frame types, parse errors
//! - `parser` - The incremental byte-level [`FrameParser`]

mod events;
mod parser;

pub use events::{SseFrame, SseLine, SseParseError};
pub use parser::{parse_sse_line, FrameParser};
