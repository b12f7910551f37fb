//! Error types for regsweep-core

use thiserror::Error;

/// Result type alias using regsweep-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for regsweep
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid retention policy parameters; raised before any image is examined
    #[error("Invalid retention policy: {message}")]
    Configuration { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a retention policy configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error came from policy validation
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let err = Error::configuration("keep-per-prefix must be at least 1 (got 0)");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Invalid retention policy: keep-per-prefix must be at least 1 (got 0)"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(!err.is_configuration());
        assert!(err.to_string().starts_with("IO error"));
    }
}
