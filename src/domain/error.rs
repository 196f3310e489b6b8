//! Domain error types

use thiserror::Error;

/// Error when an endpoint string is not a WebSocket URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid endpoint: \"{input}\". Expected a ws:// or wss:// URL (e.g. ws://localhost:8765)")]
pub struct InvalidEndpoint {
    pub input: String,
}

/// Error when a coordinate pair is out of range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("Latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Accuracy {0} must be a non-negative number of meters")]
    InvalidAccuracy(f64),
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
