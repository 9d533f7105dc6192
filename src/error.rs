//! Error types for knockstream.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnockstreamError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Sensor errors
    #[error("Sensor not found: {sensor}")]
    SensorNotFound { sensor: String },

    #[error("Sensor read failed: {message}")]
    SensorRead { message: String },

    // Batching errors
    #[error("Batch is full ({capacity} samples), flush before appending")]
    BatchFull { capacity: usize },

    // Transport errors
    #[error("Transport connection failed: {message}")]
    TransportConnect { message: String },

    #[error("Transport send failed: {message}")]
    TransportSend { message: String },

    // Wire input errors
    #[error("Malformed record: {line:?}")]
    MalformedRecord { line: String },

    // Classification errors
    #[error("Classification failed: {message}")]
    Classification { message: String },

    #[error("Window size mismatch: classifier needs {expected} values, got {actual}")]
    WindowSizeMismatch { expected: usize, actual: usize },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KnockstreamError>;
