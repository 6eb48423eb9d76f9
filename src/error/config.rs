//! Configuration error types.

use std::fmt;

use super::category::ErrorCategory;

/// Errors raised while loading or validating a [`SessionConfig`](crate::config::SessionConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The target URL is empty.
    EmptyUrl,

    /// A channel capacity is zero.
    ZeroCapacity { field: &'static str },

    /// A required environment variable is not set.
    MissingEnv { var: String },

    /// An environment variable holds an unparsable value.
    InvalidEnv { var: String, value: String },

    /// The config file could not be read.
    Io { path: String, message: String },

    /// The config document is not valid JSON for a session config.
    Json { message: String },
}

impl ConfigError {
    /// Configuration errors always belong to the configuration category.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::EmptyUrl => "E_CONFIG_URL",
            ConfigError::ZeroCapacity { .. } => "E_CONFIG_CAPACITY",
            ConfigError::MissingEnv { .. } => "E_CONFIG_ENV_MISSING",
            ConfigError::InvalidEnv { .. } => "E_CONFIG_ENV_INVALID",
            ConfigError::Io { .. } => "E_CONFIG_IO",
            ConfigError::Json { .. } => "E_CONFIG_JSON",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyUrl => write!(f, "Session URL must not be empty"),
            ConfigError::ZeroCapacity { field } => {
                write!(f, "Channel capacity '{}' must be greater than zero", field)
            }
            ConfigError::MissingEnv { var } => {
                write!(f, "Environment variable {} is not set", var)
            }
            ConfigError::InvalidEnv { var, value } => {
                write!(f, "Environment variable {} has invalid value '{}'", var, value)
            }
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read config {}: {}", path, message)
            }
            ConfigError::Json { message } => write!(f, "Invalid config JSON: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json {
            message: err.to_string(),
        }
    }
}
