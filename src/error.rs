//! Error types for the checkpointer
//!
//! All fallible operations in this crate return [`Result`], built on the
//! [`CheckpointerError`] enum. Backend failures are recoverable by design:
//! a failed load is retried lazily on the next command, a failed store is
//! logged and masked by the next successful flush.

use thiserror::Error;

/// Result type alias for checkpointer operations
pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Errors produced by the checkpointer
#[derive(Error, Debug)]
pub enum CheckpointerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Corrupted checkpoint data: {0}")]
    CorruptedData(String),

    #[error("Agent unavailable: {0}")]
    Agent(String),
}

impl CheckpointerError {
    /// Construct a backend error from a message
    pub fn backend_msg(msg: impl Into<String>) -> Self {
        CheckpointerError::Backend(msg.into())
    }

    /// Construct a configuration error from a message
    pub fn config_msg(msg: impl Into<String>) -> Self {
        CheckpointerError::Config(msg.into())
    }
}
