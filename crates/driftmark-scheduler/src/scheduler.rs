//! The coalescing scheduler core.
//!
//! `CoalescingScheduler` sits between a burst-prone producer and a slow,
//! rate-sensitive sink. It absorbs values from a bounded channel into a
//! single pending slot (newest wins) and decides when to hand the
//! slot's content to the sink:
//!
//! - while values keep arriving, it absorbs them without flushing
//! - a periodic timer forces a flush at least every `max_wait`
//! - an otherwise idle pass flushes a lone pending value immediately
//! - with nothing to do at all, it sleeps `min_gap` between polls
//!
//! The pending slot is owned by the scheduler task alone, so nothing on
//! the hot path takes a lock.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use driftmark_sink::CheckpointSink;

use crate::config::{FailurePolicy, SchedulerConfig};
use crate::error::SchedulerResult;
use crate::timer::FlushTimer;

/// Coalesces a stream of values down to the most recent one and flushes
/// it to the sink at a bounded rate.
///
/// At most one value is pending at a time; a newer arrival replaces an
/// unflushed older one, which is discarded for good. The sink observes
/// recency, not completeness.
pub struct CoalescingScheduler<T, S> {
    rx: mpsc::Receiver<T>,
    sink: S,
    config: SchedulerConfig,
    /// Most recently received, not yet flushed value.
    pending: Option<T>,
}

impl<T, S> CoalescingScheduler<T, S>
where
    T: Send,
    S: CheckpointSink<T>,
{
    /// Create a scheduler consuming `rx` and flushing into `sink`.
    pub fn new(rx: mpsc::Receiver<T>, sink: S, config: SchedulerConfig) -> Self {
        Self {
            rx,
            sink,
            config,
            pending: None,
        }
    }

    /// Run until the producer side of the channel closes.
    ///
    /// Every iteration evaluates a strict three-way priority: absorb an
    /// available value, else honor a due forced-flush tick, else flush
    /// opportunistically or back off `min_gap` when idle. On channel
    /// closure the pending value (if any) is flushed once before
    /// returning; no further ticks are honored after closure.
    pub async fn run(mut self) -> SchedulerResult<()> {
        info!(
            max_wait_ms = self.config.max_wait.as_millis() as u64,
            min_gap_ms = self.config.min_gap.as_millis() as u64,
            "coalescing scheduler started"
        );
        let mut timer = FlushTimer::new(self.config.max_wait, Instant::now());

        loop {
            match self.rx.try_recv() {
                // Newest wins; an unflushed predecessor is discarded.
                Ok(value) => {
                    self.pending = Some(value);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            if timer.is_due(Instant::now()) {
                if self.pending.is_some() {
                    self.flush_pending().await?;
                } else {
                    trace!("forced flush tick with nothing to write");
                }
                continue;
            }

            if self.pending.is_some() {
                // Opportunistic flush: an isolated value goes out as soon
                // as the scheduler finds itself idle, not at the next tick.
                self.flush_pending().await?;
                continue;
            }

            tokio::time::sleep(self.config.min_gap).await;
        }

        // Producer closed the channel: drain what is left and stop.
        if self.pending.is_some() {
            debug!("draining pending checkpoint before shutdown");
            self.flush_pending().await?;
        }
        info!("coalescing scheduler stopped");
        Ok(())
    }

    /// Flush the pending value, clearing the slot on success.
    ///
    /// On failure, `Fatal` propagates the sink error and `Retry` keeps
    /// the value in the slot and backs off `min_gap` so a broken sink is
    /// not hammered in a tight loop.
    async fn flush_pending(&mut self) -> SchedulerResult<()> {
        let Some(value) = self.pending.as_ref() else {
            return Ok(());
        };
        match self.sink.flush(value).await {
            Ok(()) => {
                self.pending = None;
                debug!("checkpoint flushed");
                Ok(())
            }
            Err(err) => match self.config.on_failure {
                FailurePolicy::Fatal => Err(err.into()),
                FailurePolicy::Retry => {
                    warn!(error = %err, "checkpoint flush failed, will retry");
                    tokio::time::sleep(self.config.min_gap).await;
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use driftmark_sink::{MemorySink, SinkError, SinkResult};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::error::SchedulerError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Point(u64);

    /// Sink that fails the first `remaining` flushes, then delegates.
    struct FailingSink {
        remaining: u32,
        inner: MemorySink<Point>,
    }

    impl CheckpointSink<Point> for FailingSink {
        async fn flush(&mut self, value: &Point) -> SinkResult<()> {
            if self.remaining > 0 {
                self.remaining -= 1;
                return Err(SinkError::Write("injected failure".to_string()));
            }
            self.inner.flush(value).await
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_max_wait(Duration::from_millis(1000))
            .with_min_gap(Duration::from_millis(100))
    }

    fn spawn_scheduler(
        capacity: usize,
        config: SchedulerConfig,
    ) -> (
        mpsc::Sender<Point>,
        MemorySink<Point>,
        JoinHandle<SchedulerResult<()>>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let sink = MemorySink::new();
        let probe = sink.clone();
        let handle = tokio::spawn(CoalescingScheduler::new(rx, sink, config).run());
        (tx, probe, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_to_latest_value() {
        let (tx, rx) = mpsc::channel(16);
        for n in 1..=3 {
            tx.send(Point(n)).await.unwrap();
        }
        let sink = MemorySink::new();
        let probe = sink.clone();
        let handle = tokio::spawn(CoalescingScheduler::new(rx, sink, config()).run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        // The whole burst collapses into a single flush of the last value.
        assert_eq!(probe.values(), vec![Point(3)]);

        drop(tx);
        handle.await.unwrap().unwrap();
        assert_eq!(probe.values(), vec![Point(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn isolated_push_flushes_within_min_gap() {
        let (tx, probe, handle) = spawn_scheduler(16, config());

        // Let the scheduler settle into idle polling first.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(probe.is_empty());

        let sent_at = Instant::now();
        tx.send(Point(7)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let flushes = probe.flushes();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].value, Point(7));
        // Flushed on the next idle poll, not at the next forced tick.
        assert!(flushes[0].at - sent_at <= Duration::from_millis(100));

        drop(tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn never_flushes_without_values() {
        let (tx, probe, handle) = spawn_scheduler(16, config());

        // Many forced-flush ticks elapse with nothing pending.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(probe.is_empty());

        drop(tx);
        handle.await.unwrap().unwrap();
        assert!(probe.is_empty());
    }

    #[tokio::test]
    async fn drains_pending_value_on_close() {
        let (tx, rx) = mpsc::channel(16);
        tx.send(Point(42)).await.unwrap();
        drop(tx);

        let sink = MemorySink::new();
        let probe = sink.clone();
        CoalescingScheduler::new(rx, sink, config())
            .run()
            .await
            .unwrap();

        // Exactly one flush, carrying the value that was still queued.
        assert_eq!(probe.values(), vec![Point(42)]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_order_is_fifo_across_rounds() {
        let (tx, probe, handle) = spawn_scheduler(16, config());

        tx.send(Point(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(Point(2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        drop(tx);
        handle.await.unwrap().unwrap();
        assert_eq!(probe.values(), vec![Point(1), Point(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_load_is_coalesced_and_bounded() {
        let (tx, probe, handle) = spawn_scheduler(100, config());

        // Five seconds of pushes, one every 50ms: well inside max_wait
        // and faster than the idle poll cadence.
        let mut last = Point(0);
        for n in 0..100u64 {
            last = Point(n);
            tx.send(last).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        drop(tx);
        handle.await.unwrap().unwrap();

        let flushes = probe.flushes();
        // Strictly fewer sink calls than pushes, and the final value
        // survives to the sink.
        assert!(
            flushes.len() < 100,
            "expected coalescing, got {} flushes",
            flushes.len()
        );
        assert!(flushes.len() >= 5);
        assert_eq!(flushes.last().unwrap().value, last);
        // The forced-flush path bounds the gap between consecutive
        // flushes to max_wait (plus one idle poll of slack).
        for pair in flushes.windows(2) {
            assert!(pair[1].at - pair[0].at <= Duration::from_millis(1100));
        }
    }

    #[tokio::test]
    async fn flush_failure_is_fatal_by_default() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Point(1)).await.unwrap();
        drop(tx);

        let sink = FailingSink {
            remaining: u32::MAX,
            inner: MemorySink::new(),
        };
        let result = CoalescingScheduler::new(rx, sink, config()).run().await;
        assert!(matches!(result, Err(SchedulerError::Flush(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_failure_terminates_mid_run() {
        let (tx, rx) = mpsc::channel(4);
        let sink = FailingSink {
            remaining: u32::MAX,
            inner: MemorySink::new(),
        };
        let handle = tokio::spawn(CoalescingScheduler::new(rx, sink, config()).run());

        tx.send(Point(1)).await.unwrap();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SchedulerError::Flush(_))));
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_retries_until_sink_recovers() {
        let retry = config().with_failure_policy(FailurePolicy::Retry);
        let (tx, rx) = mpsc::channel(4);
        let inner = MemorySink::new();
        let probe = inner.clone();
        let sink = FailingSink {
            remaining: 2,
            inner,
        };
        let handle = tokio::spawn(CoalescingScheduler::new(rx, sink, retry).run());

        tx.send(Point(9)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(probe.values(), vec![Point(9)]);

        drop(tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn retry_prefers_a_newer_value() {
        let retry = config().with_failure_policy(FailurePolicy::Retry);
        let (tx, rx) = mpsc::channel(4);
        let inner = MemorySink::new();
        let probe = inner.clone();
        let sink = FailingSink {
            remaining: 2,
            inner,
        };
        let handle = tokio::spawn(CoalescingScheduler::new(rx, sink, retry).run());

        tx.send(Point(1)).await.unwrap();
        // While the sink is still failing, a newer value arrives and
        // replaces the retained one.
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(Point(2)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Point(1) was coalesced away during the retry window.
        assert_eq!(probe.values(), vec![Point(2)]);

        drop(tx);
        handle.await.unwrap().unwrap();
    }
}
