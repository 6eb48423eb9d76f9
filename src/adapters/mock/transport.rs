//! Mock transport for testing.
//!
//! Records every call a session makes, in order, and keeps the delegate of
//! each request so tests can play the transport's side of the conversation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TransportError;
use crate::traits::{
    ResponseDisposition, ResponseMeta, StreamRequest, Transport, TransportConfig,
    TransportDelegate, TransportSession, TransportTask,
};

/// A call made against the mock, tagged with the index of the transport
/// session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateSession {
        session: usize,
        config: TransportConfig,
    },
    StreamRequest {
        session: usize,
        request: StreamRequest,
    },
    Resume {
        session: usize,
    },
    InvalidateAndCancel {
        session: usize,
    },
}

#[derive(Default)]
struct MockState {
    calls: Vec<TransportCall>,
    sessions_created: usize,
    delegates: Vec<Arc<dyn TransportDelegate>>,
    fail_next_session: Option<TransportError>,
    fail_next_request: Option<TransportError>,
}

/// Mock transport for testing.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use eventsource_session::adapters::mock::MockTransport;
/// use eventsource_session::{ConnectionState, EventSourceSession};
///
/// let transport = MockTransport::new();
/// let session = EventSourceSession::from_url("http://test.com", Arc::new(transport.clone()))?;
/// session.start();
///
/// transport.respond(200);
/// transport.send_data(b"data: hello\n\n");
/// assert_eq!(session.state(), ConnectionState::Open);
/// assert_eq!(transport.resume_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: TransportCall) {
        self.lock().calls.push(call);
    }

    /// Make the next `create_session` fail with `error`.
    pub fn fail_next_session(&self, error: TransportError) {
        self.lock().fail_next_session = Some(error);
    }

    /// Make the next `stream_request` fail with `error`.
    pub fn fail_next_request(&self, error: TransportError) {
        self.lock().fail_next_request = Some(error);
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Clear all recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of sessions created so far.
    pub fn sessions_created(&self) -> usize {
        self.lock().sessions_created
    }

    /// Configuration of the most recently created session.
    pub fn last_config(&self) -> Option<TransportConfig> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            TransportCall::CreateSession { config, .. } => Some(config.clone()),
            _ => None,
        })
    }

    /// The most recently issued request.
    pub fn last_request(&self) -> Option<StreamRequest> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            TransportCall::StreamRequest { request, .. } => Some(request.clone()),
            _ => None,
        })
    }

    /// Number of `resume` calls.
    pub fn resume_count(&self) -> usize {
        self.count(|call| matches!(call, TransportCall::Resume { .. }))
    }

    /// Number of `invalidate_and_cancel` calls.
    pub fn invalidate_count(&self) -> usize {
        self.count(|call| matches!(call, TransportCall::InvalidateAndCancel { .. }))
    }

    fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Delegate of the `index`-th request (0-based).
    pub fn delegate(&self, index: usize) -> Option<Arc<dyn TransportDelegate>> {
        self.lock().delegates.get(index).cloned()
    }

    /// Delegate of the most recent request.
    pub fn last_delegate(&self) -> Option<Arc<dyn TransportDelegate>> {
        self.lock().delegates.last().cloned()
    }

    /// Deliver a response with `status` to the latest request.
    ///
    /// Returns `None` when no request has been issued yet.
    pub fn respond(&self, status: u16) -> Option<ResponseDisposition> {
        let mut headers = crate::traits::Headers::new();
        headers.insert("content-type".to_string(), "text/event-stream".to_string());
        self.last_delegate()
            .map(|delegate| delegate.on_response(&ResponseMeta::with_headers(status, headers)))
    }

    /// Deliver a body chunk to the latest request.
    pub fn send_data(&self, chunk: &[u8]) {
        if let Some(delegate) = self.last_delegate() {
            delegate.on_data(chunk);
        }
    }

    /// Complete the latest request.
    pub fn complete(&self, error: Option<TransportError>) {
        if let Some(delegate) = self.last_delegate() {
            delegate.on_complete(error);
        }
    }
}

impl Transport for MockTransport {
    fn create_session(
        &self,
        config: TransportConfig,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        let mut state = self.lock();
        if let Some(error) = state.fail_next_session.take() {
            return Err(error);
        }
        let session = state.sessions_created;
        state.sessions_created += 1;
        state
            .calls
            .push(TransportCall::CreateSession { session, config });
        drop(state);

        Ok(Box::new(MockSession {
            index: session,
            transport: self.clone(),
        }))
    }
}

struct MockSession {
    index: usize,
    transport: MockTransport,
}

impl TransportSession for MockSession {
    fn stream_request(
        &mut self,
        request: StreamRequest,
        delegate: Arc<dyn TransportDelegate>,
    ) -> Result<Box<dyn TransportTask>, TransportError> {
        let mut state = self.transport.lock();
        if let Some(error) = state.fail_next_request.take() {
            return Err(error);
        }
        state.calls.push(TransportCall::StreamRequest {
            session: self.index,
            request,
        });
        state.delegates.push(delegate);
        drop(state);

        Ok(Box::new(MockTask {
            session: self.index,
            transport: self.transport.clone(),
        }))
    }

    fn invalidate_and_cancel(&mut self) {
        self.transport.record(TransportCall::InvalidateAndCancel {
            session: self.index,
        });
    }
}

struct MockTask {
    session: usize,
    transport: MockTransport,
}

impl TransportTask for MockTask {
    fn resume(&mut self) {
        self.transport.record(TransportCall::Resume {
            session: self.session,
        });
    }
}
