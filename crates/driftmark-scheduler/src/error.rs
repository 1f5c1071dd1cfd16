//! Error types for the coalescing scheduler.

use driftmark_sink::SinkError;
use thiserror::Error;

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can terminate the scheduler.
///
/// Channel closure is not represented here: it is the normal shutdown
/// signal and makes `run` return `Ok` after draining.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The sink failed to persist a value under the fatal failure policy.
    #[error("checkpoint flush failed: {0}")]
    Flush(#[from] SinkError),
}
