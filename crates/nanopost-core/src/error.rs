//! Unified error types for nanopost

use thiserror::Error;

/// Unified error type for all nanopost operations
#[derive(Error, Debug)]
pub enum NanopostError {
    // Remote API errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Generation returned no content")]
    EmptyResponse,

    // Startup errors
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using NanopostError
pub type Result<T> = std::result::Result<T, NanopostError>;
