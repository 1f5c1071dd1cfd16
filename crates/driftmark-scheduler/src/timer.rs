//! Forced-flush timing.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks when the next forced flush is due.
///
/// Missed ticks coalesce: however late a due check arrives, it fires
/// once and rearms a full period from the observation, so no backlog of
/// ticks ever accumulates. Only "is a tick due now" matters, never "how
/// many ticks have passed".
#[derive(Debug)]
pub(crate) struct FlushTimer {
    period: Duration,
    next_due: Instant,
}

impl FlushTimer {
    /// Create a timer whose first tick is due one full period from `now`.
    pub(crate) fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// True when a forced flush is due. A due observation rearms the timer.
    pub(crate) fn is_due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }
}
