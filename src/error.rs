//! Unified Error Handling System
//!
//! This module defines centralized error types for the whole paas fabric,
//! shared by the relay, the mirror, the renderer and the client front ends.

use thiserror::Error;

/// Enumeration of all error types in the application
#[derive(Error, Debug)]
pub enum PaasError {
    /// Socket bind/connect/send/receive failure on a message channel
    #[error("Transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// A frame or payload that does not follow the wire format
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid arguments error
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Configuration file could not be read or understood
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent store could not be loaded or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Output surface refused a frame
    #[error("Surface error {surface}: {message}")]
    Surface {
        surface: String,
        message: String,
    },

    /// System I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data conversion error
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl PaasError {
    /// Shorthand for a transport failure on a given endpoint
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        PaasError::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::string::FromUtf8Error> for PaasError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        PaasError::Conversion(error.to_string())
    }
}

impl From<std::str::Utf8Error> for PaasError {
    fn from(error: std::str::Utf8Error) -> Self {
        PaasError::Conversion(error.to_string())
    }
}

impl From<toml::ser::Error> for PaasError {
    fn from(error: toml::ser::Error) -> Self {
        PaasError::Config(error.to_string())
    }
}

impl From<toml::de::Error> for PaasError {
    fn from(error: toml::de::Error) -> Self {
        PaasError::Config(error.to_string())
    }
}

impl From<zmq::Error> for PaasError {
    fn from(error: zmq::Error) -> Self {
        PaasError::transport("zmq", error)
    }
}

impl From<zeromq::ZmqError> for PaasError {
    fn from(error: zeromq::ZmqError) -> Self {
        PaasError::transport("zeromq", error)
    }
}

/// Standardized result type for the entire application
pub type Result<T> = std::result::Result<T, PaasError>;
