//! Common test utilities for integration tests.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;

use eventsource_session::{ConnectionState, EventSourceSession, SessionError};
use tokio::sync::{broadcast, watch};

pub const TEST_URL: &str = "http://test.com";

pub const PRESSURE_JSON: &str =
    r#"{"name":"Pressure","unit":"hPa","measurements":[],"_id":"58c15afe518ca70001b80345"}"#;

/// Creates a closed session backed by a fresh mock transport.
pub fn test_session() -> (EventSourceSession, MockTransport) {
    let transport = MockTransport::new();
    let session = EventSourceSession::from_url(TEST_URL, Arc::new(transport.clone()))
        .expect("valid test config");
    (session, transport)
}

/// Subscriptions to all three channels of a session, taken at creation.
pub struct Observer {
    pub state: watch::Receiver<ConnectionState>,
    pub data: broadcast::Receiver<String>,
    pub errors: broadcast::Receiver<SessionError>,
}

impl Observer {
    pub fn new(session: &EventSourceSession) -> Self {
        Self {
            state: session.subscribe_state(),
            data: session.subscribe_data(),
            errors: session.subscribe_errors(),
        }
    }

    /// Latest published state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Every payload received so far, in order.
    pub fn drain_data(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        while let Ok(payload) = self.data.try_recv() {
            payloads.push(payload);
        }
        payloads
    }

    /// Every error received so far, in order.
    pub fn drain_errors(&mut self) -> Vec<SessionError> {
        let mut errors = Vec::new();
        while let Ok(error) = self.errors.try_recv() {
            errors.push(error);
        }
        errors
    }
}

/// A single `data:` frame.
pub fn frame(payload: &str) -> String {
    format!("data: {}\n\n", payload)
}
