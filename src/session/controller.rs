//! Event stream session: the connection state machine.
//!
//! All mutable session state lives in one mutex-guarded [`SessionCore`].
//! Public calls and transport callbacks both go through it, and every
//! signal is published while the lock is held, so subscribers observe
//! events in the order they were accepted.
//!
//! Transport calls that may call back into the session (create, resume,
//! cancel) are made with the lock released. Each request's delegate carries
//! the generation it was issued under; callbacks from any other generation,
//! or arriving after the attempt already closed, are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::Stream;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{ConfigError, SessionError, TransportError};
use crate::session::signals::SignalPublisher;
use crate::session::state::ConnectionState;
use crate::sse::FrameParser;
use crate::traits::{
    Headers, ResponseDisposition, ResponseMeta, StreamRequest, Transport, TransportConfig,
    TransportDelegate, TransportSession,
};

/// State guarded by the session lock.
struct SessionCore {
    state: ConnectionState,
    generation: u64,
    parser: FrameParser,
    transport_session: Option<Box<dyn TransportSession>>,
    last_event_id: Option<String>,
    retry_hint: Option<Duration>,
}

impl SessionCore {
    /// Callbacks are only accepted for the live generation of an attempt
    /// that has not closed yet.
    fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.state.is_active()
    }
}

struct Shared {
    session_id: Uuid,
    url: String,
    headers: Headers,
    transport: Arc<dyn Transport>,
    signals: SignalPublisher,
    core: Mutex<SessionCore>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, core: &mut SessionCore, state: ConnectionState) {
        info!(
            session_id = %self.session_id,
            generation = core.generation,
            from = %core.state,
            to = %state,
            "Session state change"
        );
        core.state = state;
        self.signals.publish_state(state);
    }

    /// Close the current attempt and publish its terminal error, if any.
    ///
    /// Returns the transport session so the caller can dispose of it after
    /// releasing the lock.
    fn close_attempt(
        &self,
        core: &mut SessionCore,
        error: Option<SessionError>,
    ) -> Option<Box<dyn TransportSession>> {
        core.parser.reset();
        let transport_session = core.transport_session.take();
        self.transition(core, ConnectionState::Closed);
        if let Some(error) = error {
            warn!(
                session_id = %self.session_id,
                generation = core.generation,
                code = error.error_code(),
                "Session closed with error: {}",
                error
            );
            self.signals.publish_error(error);
        }
        transport_session
    }

    fn on_response_received(&self, generation: u64, response: &ResponseMeta) -> ResponseDisposition {
        let mut core = self.lock();
        if !core.accepts(generation) {
            debug!(
                session_id = %self.session_id,
                generation,
                current = core.generation,
                "Ignoring stale response"
            );
            return ResponseDisposition::Cancel;
        }
        debug!(
            session_id = %self.session_id,
            status = response.status,
            success = response.is_success(),
            content_type = response.content_type().unwrap_or("-"),
            "Response received"
        );
        self.transition(&mut core, ConnectionState::Open);
        ResponseDisposition::Allow
    }

    fn on_data_received(&self, generation: u64, chunk: &[u8]) {
        let mut core = self.lock();
        if !core.accepts(generation) {
            debug!(
                session_id = %self.session_id,
                generation,
                bytes = chunk.len(),
                "Ignoring stale data"
            );
            return;
        }
        trace!(session_id = %self.session_id, bytes = chunk.len(), "Data received");

        core.parser.push(chunk);
        loop {
            match core.parser.next_frame() {
                Ok(Some(frame)) => {
                    // An empty id clears the resume point
                    if let Some(id) = frame.id {
                        core.last_event_id = (!id.is_empty()).then_some(id);
                    }
                    if let Some(retry) = frame.retry {
                        core.retry_hint = Some(retry);
                    }
                    if let Some(data) = frame.data {
                        trace!(session_id = %self.session_id, len = data.len(), "Frame parsed");
                        self.signals.publish_data(data);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let stale = self.close_attempt(&mut core, Some(e.into()));
                    drop(core);
                    if let Some(mut transport_session) = stale {
                        transport_session.invalidate_and_cancel();
                    }
                    return;
                }
            }
        }
    }

    fn on_completed(&self, generation: u64, error: Option<TransportError>) {
        let mut core = self.lock();
        if !core.accepts(generation) {
            debug!(
                session_id = %self.session_id,
                generation,
                "Ignoring stale completion"
            );
            return;
        }
        if error.is_none() {
            info!(session_id = %self.session_id, "Server closed the event stream");
        }
        let finished = self.close_attempt(&mut core, error.map(SessionError::from));
        drop(core);
        drop(finished);
    }
}

/// Delegate handed to the transport for one generation.
struct GenerationDelegate {
    generation: u64,
    shared: Weak<Shared>,
}

impl TransportDelegate for GenerationDelegate {
    fn on_response(&self, response: &ResponseMeta) -> ResponseDisposition {
        match self.shared.upgrade() {
            Some(shared) => shared.on_response_received(self.generation, response),
            None => ResponseDisposition::Cancel,
        }
    }

    fn on_data(&self, chunk: &[u8]) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_data_received(self.generation, chunk);
        }
    }

    fn on_complete(&self, error: Option<TransportError>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_completed(self.generation, error);
        }
    }
}

/// A Server-Sent Events client session for one fixed URL.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use eventsource_session::{adapters::ReqwestTransport, EventSourceSession};
///
/// let session = EventSourceSession::from_url(
///     "https://example.com/events",
///     Arc::new(ReqwestTransport::new()?),
/// )?;
/// let mut data = session.subscribe_data();
/// session.start();
/// while let Ok(payload) = data.recv().await {
///     println!("{}", payload);
/// }
/// ```
pub struct EventSourceSession {
    shared: Arc<Shared>,
}

impl EventSourceSession {
    /// Create a closed session from a validated config.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;
        let session_id = Uuid::new_v4();
        debug!(%session_id, url = %config.url, "Creating event stream session");

        Ok(Self {
            shared: Arc::new(Shared {
                session_id,
                url: config.url,
                headers: config.headers,
                transport,
                signals: SignalPublisher::new(config.data_capacity, config.error_capacity),
                core: Mutex::new(SessionCore {
                    state: ConnectionState::Closed,
                    generation: 0,
                    parser: FrameParser::new(),
                    transport_session: None,
                    last_event_id: None,
                    retry_hint: None,
                }),
            }),
        })
    }

    /// Create a closed session for `url` with default settings.
    pub fn from_url(
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        Self::new(SessionConfig::new(url), transport)
    }

    /// Begin a new connection attempt.
    ///
    /// Returns once the request has been issued. Calling this while
    /// connecting or open restarts: the previous transport is cancelled and
    /// its callbacks are ignored from then on. Failure to issue the request
    /// closes the attempt and publishes the error.
    pub fn start(&self) {
        let shared = &self.shared;
        let (generation, request, superseded) = {
            let mut core = shared.lock();
            core.generation += 1;
            if core.state.is_active() {
                info!(
                    session_id = %shared.session_id,
                    generation = core.generation,
                    "Restarting active session"
                );
            }
            core.parser.reset();
            let superseded = core.transport_session.take();
            shared.transition(&mut core, ConnectionState::Connecting);
            let request = StreamRequest::get(shared.url.clone())
                .with_last_event_id(core.last_event_id.as_deref());
            (core.generation, request, superseded)
        };

        if let Some(mut transport_session) = superseded {
            transport_session.invalidate_and_cancel();
        }

        info!(
            session_id = %shared.session_id,
            generation,
            url = %shared.url,
            "Opening event stream"
        );
        let delegate: Arc<dyn TransportDelegate> = Arc::new(GenerationDelegate {
            generation,
            shared: Arc::downgrade(shared),
        });
        let config = TransportConfig::unbounded().with_headers(shared.headers.clone());

        let mut transport_session = match shared.transport.create_session(config) {
            Ok(transport_session) => transport_session,
            Err(e) => {
                self.fail_start(generation, e, None);
                return;
            }
        };
        let mut task = match transport_session.stream_request(request, delegate) {
            Ok(task) => task,
            Err(e) => {
                self.fail_start(generation, e, Some(transport_session));
                return;
            }
        };

        {
            let mut core = shared.lock();
            if core.generation != generation {
                drop(core);
                debug!(
                    session_id = %shared.session_id,
                    generation,
                    "Session moved on before the request started"
                );
                transport_session.invalidate_and_cancel();
                return;
            }
            core.transport_session = Some(transport_session);
        }

        task.resume();
    }

    fn fail_start(
        &self,
        generation: u64,
        error: TransportError,
        transport_session: Option<Box<dyn TransportSession>>,
    ) {
        if let Some(mut transport_session) = transport_session {
            transport_session.invalidate_and_cancel();
        }
        let mut core = self.shared.lock();
        if core.generation == generation {
            self.shared.close_attempt(&mut core, Some(error.into()));
        }
    }

    /// Close the session.
    ///
    /// Always publishes `Closed`, even if already closed. Callbacks from the
    /// cancelled transport are ignored from this point on.
    pub fn stop(&self) {
        let cancelled = {
            let mut core = self.shared.lock();
            core.generation += 1;
            info!(
                session_id = %self.shared.session_id,
                generation = core.generation,
                "Stopping session"
            );
            self.shared.close_attempt(&mut core, None)
        };
        if let Some(mut transport_session) = cancelled {
            transport_session.invalidate_and_cancel();
        }
    }

    /// Transport callback: response headers arrived for `generation`.
    pub fn on_response_received(
        &self,
        generation: u64,
        response: &ResponseMeta,
    ) -> ResponseDisposition {
        self.shared.on_response_received(generation, response)
    }

    /// Transport callback: a body chunk arrived for `generation`.
    pub fn on_data_received(&self, generation: u64, chunk: &[u8]) {
        self.shared.on_data_received(generation, chunk)
    }

    /// Transport callback: the request of `generation` finished.
    pub fn on_completed(&self, generation: u64, error: Option<TransportError>) {
        self.shared.on_completed(generation, error)
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.signals.current_state()
    }

    /// Current generation; advanced by every `start()` and `stop()`.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Id of the most recent frame that carried one.
    pub fn last_event_id(&self) -> Option<String> {
        self.shared.lock().last_event_id.clone()
    }

    /// Most recent `retry` hint from the server. Informational only.
    pub fn retry_hint(&self) -> Option<Duration> {
        self.shared.lock().retry_hint
    }

    /// Subscribe to state changes; the current state is readable immediately.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.signals.subscribe_state()
    }

    /// Subscribe to payloads published from now on.
    pub fn subscribe_data(&self) -> broadcast::Receiver<String> {
        self.shared.signals.subscribe_data()
    }

    /// Subscribe to errors published from now on.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SessionError> {
        self.shared.signals.subscribe_errors()
    }

    pub fn state_stream(&self) -> impl Stream<Item = ConnectionState> + Send + 'static {
        self.shared.signals.state_stream()
    }

    pub fn data_stream(&self) -> impl Stream<Item = String> + Send + 'static {
        self.shared.signals.data_stream()
    }

    pub fn error_stream(&self) -> impl Stream<Item = SessionError> + Send + 'static {
        self.shared.signals.error_stream()
    }
}

impl Drop for EventSourceSession {
    fn drop(&mut self) {
        let live = self.shared.lock().transport_session.is_some();
        if live {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockTransport;

    fn session() -> (EventSourceSession, MockTransport) {
        let transport = MockTransport::new();
        let session =
            EventSourceSession::from_url("http://test.com", Arc::new(transport.clone())).unwrap();
        (session, transport)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = EventSourceSession::from_url("", Arc::new(MockTransport::new()));
        assert!(matches!(result, Err(ConfigError::EmptyUrl)));
    }

    #[test]
    fn test_generation_advances_on_start_and_stop() {
        let (session, _transport) = session();
        assert_eq!(session.generation(), 0);
        session.start();
        assert_eq!(session.generation(), 1);
        session.stop();
        assert_eq!(session.generation(), 2);
        session.stop();
        assert_eq!(session.generation(), 3);
    }

    #[test]
    fn test_direct_callbacks_respect_generation() {
        let (session, _transport) = session();
        session.start();
        let generation = session.generation();

        assert_eq!(
            session.on_response_received(generation + 1, &ResponseMeta::new(200)),
            ResponseDisposition::Cancel
        );
        assert_eq!(session.state(), ConnectionState::Connecting);

        assert_eq!(
            session.on_response_received(generation, &ResponseMeta::new(200)),
            ResponseDisposition::Allow
        );
        assert_eq!(session.state(), ConnectionState::Open);

        let mut data = session.subscribe_data();
        session.on_data_received(generation, b"data: a\n\n");
        assert_eq!(data.try_recv().unwrap(), "a");

        session.on_completed(generation, None);
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_data_after_completion_is_ignored() {
        let (session, transport) = session();
        let mut data = session.subscribe_data();
        session.start();
        transport.respond(200);
        transport.complete(None);
        transport.send_data(b"data: late\n\n");
        assert!(data.try_recv().is_err());
    }

    #[test]
    fn test_drop_cancels_live_transport() {
        let (session, transport) = session();
        session.start();
        drop(session);
        assert_eq!(transport.invalidate_count(), 1);
        assert_eq!(transport.respond(200), Some(ResponseDisposition::Cancel));
    }

    #[test]
    fn test_drop_of_closed_session_is_quiet() {
        let (session, transport) = session();
        drop(session);
        assert!(transport.calls().is_empty());
    }
}
