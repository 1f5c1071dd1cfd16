//! Error types for checkpoint sinks.

use thiserror::Error;

/// Result type alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors that can occur while persisting a checkpoint value.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open checkpoint target: {0}")]
    Open(String),

    #[error("failed to encode checkpoint value: {0}")]
    Encode(String),

    #[error("failed to write checkpoint value: {0}")]
    Write(String),

    #[error("failed to sync checkpoint to durable storage: {0}")]
    Sync(String),
}
