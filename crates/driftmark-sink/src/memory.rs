//! In-memory checkpoint sink.
//!
//! Records every flushed value instead of persisting it. Clones share
//! storage, so a test can hold a probe handle while the scheduler owns
//! the sink itself.

use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use crate::error::SinkResult;
use crate::sink::CheckpointSink;

/// One recorded flush.
#[derive(Debug, Clone)]
pub struct Flush<T> {
    /// The flushed value.
    pub value: T,
    /// When the flush happened.
    pub at: Instant,
}

/// Sink that keeps flushed values in memory (for testing).
#[derive(Debug, Clone)]
pub struct MemorySink<T> {
    flushes: Arc<Mutex<Vec<Flush<T>>>>,
}

impl<T> MemorySink<T> {
    /// Create an empty in-memory sink.
    pub fn new() -> Self {
        Self {
            flushes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of flushes recorded so far.
    pub fn len(&self) -> usize {
        self.flushes.lock().expect("sink mutex poisoned").len()
    }

    /// True when nothing has been flushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> MemorySink<T> {
    /// All recorded flushes, in flush order.
    pub fn flushes(&self) -> Vec<Flush<T>> {
        self.flushes.lock().expect("sink mutex poisoned").clone()
    }

    /// All flushed values, in flush order.
    pub fn values(&self) -> Vec<T> {
        self.flushes()
            .into_iter()
            .map(|flush| flush.value)
            .collect()
    }

    /// The most recently flushed value, if any.
    pub fn last(&self) -> Option<T> {
        self.flushes()
            .last()
            .map(|flush| flush.value.clone())
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CheckpointSink<T> for MemorySink<T>
where
    T: Clone + Send + Sync,
{
    async fn flush(&mut self, value: &T) -> SinkResult<()> {
        self.flushes
            .lock()
            .expect("sink mutex poisoned")
            .push(Flush {
                value: value.clone(),
                at: Instant::now(),
            });
        Ok(())
    }
}
