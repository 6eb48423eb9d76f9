//! Prelude module for convenient imports.
//!
//! ```ignore
//! use eventsource_session::prelude::*;
//! ```

pub use crate::adapters::{MockTransport, ReqwestTransport};
pub use crate::config::SessionConfig;
pub use crate::error::{ErrorCategory, SessionError, TransportError};
pub use crate::session::{ConnectionState, EventSourceSession};
pub use crate::sse::{FrameParser, SseFrame};
pub use crate::traits::{
    ResponseDisposition, ResponseMeta, StreamRequest, Transport, TransportConfig,
    TransportDelegate, TransportSession, TransportTask,
};
