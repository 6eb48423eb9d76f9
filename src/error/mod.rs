//! Error handling for event stream sessions.
//!
//! - **Error Categories**: coarse classification for reconnect decisions
//! - **Transport Errors**: failures reported by a [`Transport`](crate::traits::Transport)
//! - **Session Errors**: what a session publishes on its error channel
//! - **Config Errors**: invalid or unloadable [`SessionConfig`](crate::config::SessionConfig)
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, DNS, TLS, timeout | Yes |
//! | Server | Stream ended or cancelled | Yes |
//! | Protocol | Undecodable stream bytes | No |
//! | Configuration | Bad URL, headers or settings | No |

mod category;
mod config;
mod session;
mod transport;

pub use category::ErrorCategory;
pub use config::ConfigError;
pub use session::SessionError;
pub use transport::{classify_reqwest_error, TransportError};
