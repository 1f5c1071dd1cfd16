//! driftmarkd: the driftmark daemon.
//!
//! Single binary that assembles the checkpoint pipeline:
//! - a producer task emitting values at a random cadence
//! - the coalescing scheduler, which keeps only the most recent value
//!   and flushes it at a bounded rate
//! - a sink persisting one JSON record (or logging a line in log mode)
//!
//! # Usage
//!
//! ```text
//! driftmarkd --checkpoint-path checkpoint.json --max-wait-ms 1000 --min-gap-ms 100
//! ```

mod producer;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::{mpsc, watch};
use tracing::info;

use driftmark_scheduler::{CoalescingScheduler, FailurePolicy, SchedulerConfig};
use driftmark_sink::{CheckpointSink, FileSink, LogSink};

use crate::producer::{Checkpoint, produce};

/// Where flushed values go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// Persist a single JSON record, fsynced on every flush.
    File,
    /// Emit a log line per flush.
    Log,
}

/// What to do when a flush fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FailureMode {
    /// Stop the daemon on the first failed flush.
    Fatal,
    /// Keep the value and retry on a later pass.
    Retry,
}

#[derive(Parser)]
#[command(name = "driftmarkd", about = "driftmark daemon")]
struct Cli {
    /// Checkpoint file path (file sink only).
    #[arg(long, default_value = "checkpoint.json")]
    checkpoint_path: PathBuf,

    /// Upper bound in milliseconds before a pending value is force-flushed.
    #[arg(long, default_value = "1000")]
    max_wait_ms: u64,

    /// Idle poll backoff in milliseconds.
    #[arg(long, default_value = "100")]
    min_gap_ms: u64,

    /// Producer channel capacity.
    #[arg(long, default_value = "100")]
    capacity: usize,

    /// Upper bound in milliseconds of the producer's random inter-arrival delay.
    #[arg(long, default_value = "30")]
    producer_max_interval_ms: u64,

    /// Where flushed values go.
    #[arg(long, value_enum, default_value_t = SinkKind::File)]
    sink: SinkKind,

    /// What to do when a flush fails.
    #[arg(long, value_enum, default_value_t = FailureMode::Fatal)]
    on_flush_error: FailureMode,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,driftmarkd=debug,driftmark=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config = SchedulerConfig::default()
        .with_max_wait(Duration::from_millis(cli.max_wait_ms))
        .with_min_gap(Duration::from_millis(cli.min_gap_ms))
        .with_capacity(cli.capacity)
        .with_failure_policy(match cli.on_flush_error {
            FailureMode::Fatal => FailurePolicy::Fatal,
            FailureMode::Retry => FailurePolicy::Retry,
        });
    let producer_max_interval = Duration::from_millis(cli.producer_max_interval_ms);

    match cli.sink {
        SinkKind::File => {
            info!(path = ?cli.checkpoint_path, "using file sink");
            let sink = FileSink::new(&cli.checkpoint_path);
            run(config, sink, producer_max_interval).await
        }
        SinkKind::Log => {
            info!("using log sink");
            run(config, LogSink::new(), producer_max_interval).await
        }
    }
}

/// Assemble the pipeline and run it until ctrl-c.
async fn run<S>(
    config: SchedulerConfig,
    sink: S,
    producer_max_interval: Duration,
) -> anyhow::Result<()>
where
    S: CheckpointSink<Checkpoint>,
{
    let (tx, rx) = mpsc::channel(config.capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let producer_handle = tokio::spawn(produce(tx, producer_max_interval, shutdown_rx));
    let scheduler = CoalescingScheduler::new(rx, sink, config);

    // ── Shutdown wiring ────────────────────────────────────────
    //
    // ctrl-c stops the producer; the dropped sender closes the channel,
    // which the scheduler takes as its signal to drain and stop.
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run().await?;
    producer_handle.await?;

    info!("driftmarkd stopped");
    Ok(())
}
