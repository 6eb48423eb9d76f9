//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`Transport`] - Creates transport sessions
//! - [`TransportSession`] - Issues streaming requests, cancels them
//! - [`TransportTask`] - A request that can be resumed
//! - [`TransportDelegate`] - Receives response, body and completion events

pub mod transport;

pub use transport::{
    Headers, ResponseDisposition, ResponseMeta, StreamRequest, Transport, TransportConfig,
    TransportDelegate, TransportSession, TransportTask,
};
