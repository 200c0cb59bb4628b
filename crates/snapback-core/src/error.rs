//! Unified error types for snapback

use thiserror::Error;

/// Unified error type for all snapback operations
#[derive(Error, Debug)]
pub enum SnapbackError {
    // Startup errors
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Session errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Session resume failed: {0}")]
    SessionResume(String),

    #[error("Session persist failed: {0}")]
    SessionPersist(String),

    // Reply pipeline errors
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("API error: {0}")]
    Api(String),

    // Feed errors
    #[error("Subscription error: {0}")]
    Subscription(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SnapbackError {
    /// Process exit status for errors that must terminate the process
    ///
    /// Missing credentials end the process quietly with status 0; a broken
    /// config file or a rejected login end it with status 1. Everything else
    /// is isolated to the event or operation that raised it and yields `None`.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SnapbackError::ConfigMissing(_) => Some(0),
            SnapbackError::Config(_) | SnapbackError::Auth(_) => Some(1),
            _ => None,
        }
    }
}

/// Result type alias using SnapbackError
pub type Result<T> = std::result::Result<T, SnapbackError>;
