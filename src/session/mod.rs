//! Event stream session.
//!
//! - `state` - [`ConnectionState`] of a session
//! - `signals` - [`SignalPublisher`] with the state, data and error channels
//! - `controller` - [`EventSourceSession`], the connection state machine

mod controller;
mod signals;
mod state;

pub use controller::EventSourceSession;
pub use signals::SignalPublisher;
pub use state::ConnectionState;
