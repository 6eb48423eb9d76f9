//! Streaming transport trait abstraction.
//!
//! A session never talks to an HTTP client directly. It asks a [`Transport`]
//! for a [`TransportSession`], issues one streaming GET through it, and
//! receives the response, body chunks and completion through a
//! [`TransportDelegate`]. Tests substitute a recording fake.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Session-wide transport settings.
///
/// `None` timeouts mean unbounded: an idle event stream stays open until the
/// server closes it or the caller cancels it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportConfig {
    /// Longest gap allowed between two body reads
    pub request_timeout: Option<Duration>,
    /// Longest total lifetime of one request
    pub resource_timeout: Option<Duration>,
    /// Headers sent with every request of the session
    pub headers: Headers,
}

impl TransportConfig {
    /// Configuration with no request or resource timeout.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Replace the session-wide headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// True when neither timeout is set.
    pub fn is_unbounded(&self) -> bool {
        self.request_timeout.is_none() && self.resource_timeout.is_none()
    }
}

/// A streaming GET request for an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub url: String,
    pub headers: Headers,
}

impl StreamRequest {
    /// Build a GET request with the headers an event stream expects.
    pub fn get(url: impl Into<String>) -> Self {
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers.insert("Cache-Control".to_string(), "no-cache".to_string());
        Self {
            url: url.into(),
            headers,
        }
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resume after the given event id, if any. Empty ids send nothing.
    pub fn with_last_event_id(self, last_event_id: Option<&str>) -> Self {
        match last_event_id {
            Some(id) if !id.is_empty() => self.with_header("Last-Event-ID", id),
            _ => self,
        }
    }
}

/// Response metadata handed to [`TransportDelegate::on_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: Headers,
}

impl ResponseMeta {
    /// Create response metadata without headers.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
        }
    }

    /// Create response metadata with headers.
    pub fn with_headers(status: u16, headers: Headers) -> Self {
        Self { status, headers }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `Content-Type` header, matched case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

/// What the transport should do after a response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// Keep reading the body.
    Allow,
    /// Stop reading and complete the request.
    Cancel,
}

/// Receiver of a running request's events.
///
/// Called from a context owned by the transport. `on_complete` fires at most
/// once per request and nothing follows it.
pub trait TransportDelegate: Send + Sync {
    /// Response headers arrived.
    fn on_response(&self, response: &ResponseMeta) -> ResponseDisposition;

    /// A body chunk arrived; chunk boundaries carry no meaning.
    fn on_data(&self, chunk: &[u8]);

    /// The request finished, cleanly (`None`) or with an error.
    fn on_complete(&self, error: Option<TransportError>);
}

/// A created but possibly not yet running request.
pub trait TransportTask: Send {
    /// Start (or resume) the request. Never blocks on network I/O.
    fn resume(&mut self);
}

/// A transport session holding the resources of one connection attempt.
pub trait TransportSession: Send {
    /// Create a streaming request whose events go to `delegate`.
    fn stream_request(
        &mut self,
        request: StreamRequest,
        delegate: Arc<dyn TransportDelegate>,
    ) -> Result<Box<dyn TransportTask>, TransportError>;

    /// Cancel every request of this session and refuse new ones.
    fn invalidate_and_cancel(&mut self);
}

/// Factory for transport sessions.
///
/// # Example
///
/// ```ignore
/// use eventsource_session::traits::{StreamRequest, Transport, TransportConfig};
///
/// let mut session = transport.create_session(TransportConfig::unbounded())?;
/// let mut task = session.stream_request(StreamRequest::get(url), delegate)?;
/// task.resume();
/// // later
/// session.invalidate_and_cancel();
/// ```
pub trait Transport: Send + Sync {
    /// Create a session with the given settings.
    fn create_session(
        &self,
        config: TransportConfig,
    ) -> Result<Box<dyn TransportSession>, TransportError>;
}
