//! Error types for ensemble connections

use thiserror::Error;

/// Result type alias using the ensemble Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every ensemble crate
#[derive(Error, Debug)]
pub enum Error {
    // Argument errors
    #[error("Precondition violated: {argument} must be provided")]
    Precondition { argument: &'static str },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid connect string {connect_string:?}: {reason}")]
    InvalidConnectString {
        connect_string: String,
        reason: String,
    },

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    // Client errors
    #[error("Client {client_id} cannot be started more than once")]
    AlreadyStarted { client_id: String },

    #[error("Connection to {address} timed out after {timeout_ms}ms")]
    ConnectionTimeout { address: String, timeout_ms: u64 },

    #[error("Connection to {address} failed: {message}")]
    Connection { address: String, message: String },

    #[error("Compression error on {path}: {message}")]
    Compression { path: String, message: String },

    // Host errors
    #[error("Lifecycle error in {component}: {message}")]
    Lifecycle { component: String, message: String },

    #[error("A health check named {name} already exists")]
    HealthCheckExists { name: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
