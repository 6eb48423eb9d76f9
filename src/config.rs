//! Session configuration.
//!
//! A [`SessionConfig`] names the stream to open and sizes the signal
//! channels. It can be built in code, read from the environment, or loaded
//! from a JSON document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::traits::Headers;

/// Environment variable holding the stream URL.
pub const ENV_URL: &str = "EVENTSOURCE_URL";
/// Environment variable overriding [`SessionConfig::data_capacity`].
pub const ENV_DATA_CAPACITY: &str = "EVENTSOURCE_DATA_CAPACITY";
/// Environment variable overriding [`SessionConfig::error_capacity`].
pub const ENV_ERROR_CAPACITY: &str = "EVENTSOURCE_ERROR_CAPACITY";

pub const DEFAULT_DATA_CAPACITY: usize = 256;
pub const DEFAULT_ERROR_CAPACITY: usize = 16;

fn default_data_capacity() -> usize {
    DEFAULT_DATA_CAPACITY
}

fn default_error_capacity() -> usize {
    DEFAULT_ERROR_CAPACITY
}

/// Configuration for one event stream session.
///
/// # Example
///
/// ```ignore
/// use eventsource_session::SessionConfig;
///
/// let config = SessionConfig::new("https://example.com/events")
///     .with_header("Authorization", "Bearer token")
///     .with_data_capacity(1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stream endpoint; fixed for the life of the session
    pub url: String,
    /// Extra headers sent with every request (e.g. Authorization)
    #[serde(default)]
    pub headers: Headers,
    /// Payloads a data subscriber may fall behind before losing the oldest
    #[serde(default = "default_data_capacity")]
    pub data_capacity: usize,
    /// Errors an error subscriber may fall behind before losing the oldest
    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,
}

impl SessionConfig {
    /// Create a config for `url` with default capacities.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Headers::new(),
            data_capacity: DEFAULT_DATA_CAPACITY,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the data channel capacity.
    pub fn with_data_capacity(mut self, capacity: usize) -> Self {
        self.data_capacity = capacity;
        self
    }

    /// Set the error channel capacity.
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.data_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "data_capacity",
            });
        }
        if self.error_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "error_capacity",
            });
        }
        Ok(())
    }

    /// Build a config from `EVENTSOURCE_*` environment variables.
    ///
    /// `EVENTSOURCE_URL` is required; the capacity variables are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(ENV_URL).map_err(|_| ConfigError::MissingEnv {
            var: ENV_URL.to_string(),
        })?;
        let mut config = Self::new(url);
        if let Some(capacity) = capacity_from_env(ENV_DATA_CAPACITY)? {
            config.data_capacity = capacity;
        }
        if let Some(capacity) = capacity_from_env(ENV_ERROR_CAPACITY)? {
            config.error_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&contents)
    }
}

fn capacity_from_env(var: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
