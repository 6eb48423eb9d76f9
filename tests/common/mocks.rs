//! Mock implementations for test fixtures.
//!
//! Re-exports the mock transport from `eventsource_session::adapters::mock`.

#![allow(unused_imports)]

pub use eventsource_session::adapters::mock::{MockTransport, TransportCall};
pub use eventsource_session::traits::{ResponseDisposition, StreamRequest, TransportConfig};
