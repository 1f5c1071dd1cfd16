//! Scheduler configuration.

use std::time::Duration;

/// Default upper bound before a pending value is force-flushed.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(1000);

/// Default idle poll backoff.
pub const DEFAULT_MIN_GAP: Duration = Duration::from_millis(100);

/// Default producer channel capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// What the scheduler does when a sink flush fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Terminate the scheduler with an error. A dropped checkpoint write
    /// means the persisted state can no longer be trusted.
    #[default]
    Fatal,
    /// Log the failure, keep the value in the pending slot, and retry on
    /// a later pass. A newer arrival still replaces the retained value.
    Retry,
}

/// Tuning knobs for [`crate::CoalescingScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on how long a pending value may wait before a forced
    /// flush. Bounds worst-case staleness under sustained load.
    pub max_wait: Duration,
    /// Idle backoff between polls when there is nothing to write. Never
    /// delays the flush of a pending value.
    pub min_gap: Duration,
    /// Bounded producer channel capacity. A producer that outruns the
    /// scheduler by more than this blocks until space frees up.
    pub capacity: usize,
    /// Flush failure policy.
    pub on_failure: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            min_gap: DEFAULT_MIN_GAP,
            capacity: DEFAULT_CAPACITY,
            on_failure: FailurePolicy::Fatal,
        }
    }
}

impl SchedulerConfig {
    /// Set the forced-flush interval.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the idle poll backoff.
    pub fn with_min_gap(mut self, min_gap: Duration) -> Self {
        self.min_gap = min_gap;
        self
    }

    /// Set the producer channel capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the flush failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }
}
