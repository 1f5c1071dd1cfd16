//! File-backed checkpoint sink.
//!
//! Each flush rewrites a single JSON record: open-or-create with
//! truncation, encode through a buffered writer, flush the buffer, then
//! fsync so the record survives power loss. The file only ever holds
//! the latest value.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{SinkError, SinkResult};
use crate::sink::CheckpointSink;

/// Convert any `Display` error into a `SinkError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| SinkError::$variant(e.to_string())
    };
}

/// Persists the most recent checkpoint value as a single JSON record.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink targeting `path`. The file is created on first flush.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// The checkpoint file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> CheckpointSink<T> for FileSink
where
    T: Serialize + Send + Sync,
{
    async fn flush(&mut self, value: &T) -> SinkResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(map_err!(Open))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value).map_err(map_err!(Encode))?;
        writer.flush().map_err(map_err!(Write))?;
        writer.get_ref().sync_all().map_err(map_err!(Sync))?;

        debug!(path = ?self.path, "checkpoint record written");
        Ok(())
    }
}
