//! Log-line checkpoint sink.

use std::fmt::Debug;

use tracing::info;

use crate::error::SinkResult;
use crate::sink::CheckpointSink;

/// Emits each flushed value as a human-readable log line instead of
/// persisting it. Useful for demos and dry runs.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a log sink.
    pub fn new() -> Self {
        Self
    }
}

impl<T> CheckpointSink<T> for LogSink
where
    T: Debug + Send + Sync,
{
    async fn flush(&mut self, value: &T) -> SinkResult<()> {
        info!(?value, "checkpoint");
        Ok(())
    }
}
