//! Server-Sent Events client session.
//!
//! Opens one long-lived `text/event-stream` connection through a pluggable
//! [`traits::Transport`], tracks its lifecycle as a [`ConnectionState`]
//! machine, parses frames out of arbitrarily chunked bytes, and publishes
//! state, payloads and terminal errors on three channels.

pub mod adapters;
pub mod config;
pub mod error;
pub mod prelude;
pub mod session;
pub mod sse;
pub mod traits;

pub use config::SessionConfig;
pub use error::{SessionError, TransportError};
pub use session::{ConnectionState, EventSourceSession};
