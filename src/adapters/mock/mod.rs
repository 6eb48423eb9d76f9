//! Mock implementations for testing.
//!
//! These let session behaviour be exercised without any network access.
//!
//! # Available Mocks
//!
//! - [`MockTransport`] - Records transport calls and drives delegates

pub mod transport;

pub use transport::{MockTransport, TransportCall};
