//! Transport-level error types.
//!
//! These are the errors a [`Transport`](crate::traits::Transport) reports,
//! either synchronously while setting up a request or through the completion
//! callback of a running stream.

use std::fmt;

use super::category::ErrorCategory;

/// Transport-specific error variants.
///
/// Messages are carried as strings so the error stays `Clone` and can be
/// fanned out to every error-channel subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection to the server failed.
    ConnectionFailed { url: String, message: String },

    /// No bytes arrived within the configured idle window, or the whole
    /// request exceeded its resource timeout.
    Timeout { message: String },

    /// TLS/SSL error.
    Tls { message: String },

    /// The request URL could not be parsed.
    InvalidUrl { url: String, message: String },

    /// A configured header name or value is not valid HTTP.
    InvalidHeader { name: String },

    /// Reading the response body failed mid-stream.
    Io { message: String },

    /// The request was cancelled before it completed.
    Cancelled,

    /// No tokio runtime was available to drive the request.
    NoRuntime { message: String },

    /// Generic transport error.
    Other { message: String },
}

impl TransportError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransportError::ConnectionFailed { .. }
            | TransportError::Timeout { .. }
            | TransportError::Tls { .. } => ErrorCategory::Network,
            TransportError::Io { .. } | TransportError::Cancelled => ErrorCategory::Server,
            TransportError::InvalidUrl { .. }
            | TransportError::InvalidHeader { .. }
            | TransportError::NoRuntime { .. } => ErrorCategory::Configuration,
            TransportError::Other { .. } => ErrorCategory::Network,
        }
    }

    /// Check if a fresh connection attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. }
                | TransportError::Timeout { .. }
                | TransportError::Io { .. }
        )
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::ConnectionFailed { .. } => "E_TRANSPORT_CONN",
            TransportError::Timeout { .. } => "E_TRANSPORT_TIMEOUT",
            TransportError::Tls { .. } => "E_TRANSPORT_TLS",
            TransportError::InvalidUrl { .. } => "E_TRANSPORT_URL",
            TransportError::InvalidHeader { .. } => "E_TRANSPORT_HEADER",
            TransportError::Io { .. } => "E_TRANSPORT_IO",
            TransportError::Cancelled => "E_TRANSPORT_CANCELLED",
            TransportError::NoRuntime { .. } => "E_TRANSPORT_RUNTIME",
            TransportError::Other { .. } => "E_TRANSPORT_OTHER",
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::ConnectionFailed { url, .. } => {
                format!("Could not connect to {}.", url)
            }
            TransportError::Timeout { .. } => {
                "The event stream timed out. The connection may have been lost.".to_string()
            }
            TransportError::Tls { .. } => {
                "A secure connection to the server could not be established.".to_string()
            }
            TransportError::InvalidUrl { url, .. } => format!("'{}' is not a valid URL.", url),
            TransportError::InvalidHeader { name } => {
                format!("The request header '{}' is not valid.", name)
            }
            TransportError::Io { .. } => "The event stream was interrupted.".to_string(),
            TransportError::Cancelled => "The event stream was cancelled.".to_string(),
            TransportError::NoRuntime { .. } => {
                "No async runtime is available to open the event stream.".to_string()
            }
            TransportError::Other { message } => format!("Transport error: {}", message),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionFailed { url, message } => {
                write!(f, "Connection to {} failed: {}", url, message)
            }
            TransportError::Timeout { message } => write!(f, "Request timeout: {}", message),
            TransportError::Tls { message } => write!(f, "TLS error: {}", message),
            TransportError::InvalidUrl { url, message } => {
                write!(f, "Invalid URL '{}': {}", url, message)
            }
            TransportError::InvalidHeader { name } => write!(f, "Invalid header: {}", name),
            TransportError::Io { message } => write!(f, "IO error: {}", message),
            TransportError::Cancelled => write!(f, "Request cancelled"),
            TransportError::NoRuntime { message } => {
                write!(f, "No tokio runtime available: {}", message)
            }
            TransportError::Other { message } => write!(f, "Transport error: {}", message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Classify a reqwest error into a [`TransportError`].
pub fn classify_reqwest_error(err: &reqwest::Error, url: &str) -> TransportError {
    if err.is_connect() {
        TransportError::ConnectionFailed {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if err.is_timeout() {
        TransportError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_builder() {
        TransportError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if err.is_body() || err.is_decode() {
        TransportError::Io {
            message: err.to_string(),
        }
    } else {
        let err_str = err.to_string().to_lowercase();
        if err_str.contains("tls") || err_str.contains("ssl") || err_str.contains("certificate") {
            TransportError::Tls {
                message: err.to_string(),
            }
        } else {
            TransportError::Other {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::ConnectionFailed {
                url: "http://test.com".to_string(),
                message: "refused".to_string()
            }
            .to_string(),
            "Connection to http://test.com failed: refused"
        );
        assert_eq!(TransportError::Cancelled.to_string(), "Request cancelled");
        assert_eq!(
            TransportError::InvalidHeader {
                name: "bad header".to_string()
            }
            .to_string(),
            "Invalid header: bad header"
        );
    }

    #[test]
    fn test_transport_error_category() {
        assert_eq!(
            TransportError::Timeout {
                message: "idle".to_string()
            }
            .category(),
            ErrorCategory::Network
        );
        assert_eq!(TransportError::Cancelled.category(), ErrorCategory::Server);
        assert_eq!(
            TransportError::InvalidUrl {
                url: "nope".to_string(),
                message: "relative URL without a base".to_string()
            }
            .category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_transport_error_retryable() {
        assert!(TransportError::ConnectionFailed {
            url: "u".to_string(),
            message: "m".to_string()
        }
        .is_retryable());
        assert!(TransportError::Io {
            message: "reset".to_string()
        }
        .is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::InvalidUrl {
            url: "u".to_string(),
            message: "m".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_transport_error_codes_are_distinct() {
        let codes = [
            TransportError::Cancelled.error_code(),
            TransportError::Io {
                message: String::new(),
            }
            .error_code(),
            TransportError::Other {
                message: String::new(),
            }
            .error_code(),
        ];
        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
    }

    #[test]
    fn test_user_message_mentions_url() {
        let err = TransportError::ConnectionFailed {
            url: "http://test.com".to_string(),
            message: "refused".to_string(),
        };
        assert!(err.user_message().contains("http://test.com"));
    }

    #[tokio::test]
    async fn test_classify_connection_refused() {
        let url = "http://127.0.0.1:59999/events";
        let err = reqwest::get(url).await.unwrap_err();
        let classified = classify_reqwest_error(&err, url);
        assert!(matches!(
            classified,
            TransportError::ConnectionFailed { .. } | TransportError::Other { .. }
        ));
    }
}
