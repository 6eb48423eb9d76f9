//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestTransport`] - Streaming transport using reqwest on tokio
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockTransport`] - Call recording and delegate injection

pub mod mock;
pub mod reqwest_transport;

pub use mock::MockTransport;
pub use reqwest_transport::ReqwestTransport;
