//! Signal channels of a session.
//!
//! - state: `watch` channel; new subscribers see the current value first
//! - data: `broadcast` channel of payload strings, no replay
//! - error: `broadcast` channel of [`SessionError`]s, no replay
//!
//! Publishing never waits for subscribers. A broadcast subscriber that falls
//! more than its channel capacity behind loses the oldest items.

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::warn;

use crate::error::SessionError;
use crate::session::state::ConnectionState;

/// Publisher side of the three session channels.
#[derive(Debug)]
pub struct SignalPublisher {
    state_tx: watch::Sender<ConnectionState>,
    data_tx: broadcast::Sender<String>,
    error_tx: broadcast::Sender<SessionError>,
}

impl SignalPublisher {
    /// Create the channels; the state starts out `Closed`.
    pub fn new(data_capacity: usize, error_capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        let (data_tx, _) = broadcast::channel(data_capacity.max(1));
        let (error_tx, _) = broadcast::channel(error_capacity.max(1));
        Self {
            state_tx,
            data_tx,
            error_tx,
        }
    }

    /// Store `state` and notify every state subscriber, even if unchanged.
    pub fn publish_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Emit one payload to current data subscribers.
    pub fn publish_data(&self, payload: String) {
        // No subscribers is fine
        let _ = self.data_tx.send(payload);
    }

    /// Emit one error to current error subscribers.
    pub fn publish_error(&self, error: SessionError) {
        let _ = self.error_tx.send(error);
    }

    /// The most recently published state.
    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes; the current state is readable immediately.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to payloads published from now on.
    pub fn subscribe_data(&self) -> broadcast::Receiver<String> {
        self.data_tx.subscribe()
    }

    /// Subscribe to errors published from now on.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SessionError> {
        self.error_tx.subscribe()
    }

    /// The current state followed by every later change.
    ///
    /// Intermediate states published faster than the stream is polled are
    /// coalesced; the latest one is always delivered.
    pub fn state_stream(&self) -> impl Stream<Item = ConnectionState> + Send + 'static {
        stream::unfold((self.subscribe_state(), true), |(mut rx, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let state = *rx.borrow_and_update();
            Some((state, (rx, false)))
        })
    }

    /// Payloads published from now on, as a stream.
    pub fn data_stream(&self) -> impl Stream<Item = String> + Send + 'static {
        lagging_stream(self.subscribe_data(), "data")
    }

    /// Errors published from now on, as a stream.
    pub fn error_stream(&self) -> impl Stream<Item = SessionError> + Send + 'static {
        lagging_stream(self.subscribe_errors(), "error")
    }
}

/// Adapt a broadcast receiver into a stream that skips over lag.
fn lagging_stream<T: Clone + Send + 'static>(
    rx: broadcast::Receiver<T>,
    channel: &'static str,
) -> impl Stream<Item = T> + Send + 'static {
    stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel, skipped, "Subscriber lagged; oldest items dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
