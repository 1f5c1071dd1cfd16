//! The sink contract.

use std::future::Future;

use crate::error::SinkResult;

/// Destination for coalesced checkpoint values.
///
/// The scheduler hands a sink the most recent pending value and clears
/// its slot only after `flush` returns `Ok`, so a failed flush leaves
/// the value eligible for a later retry. A flush that returns `Ok` must
/// mean the value is persisted as durably as the sink can make it.
pub trait CheckpointSink<T>: Send {
    /// Persist `value`. Called at most once per coalescing round; every
    /// call fully replaces whatever the sink recorded before.
    fn flush(&mut self, value: &T) -> impl Future<Output = SinkResult<()>> + Send;
}
