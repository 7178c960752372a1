//! # Exponential Backoff
//!
//! Per-resource retry delays for transient reconciliation failures. The delay
//! doubles on every consecutive error, starting at `min` and capped at `max`,
//! and resets after a successful reconcile.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min: Duration,
    max: Duration,
    next: Duration,
}

impl ExponentialBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = min.max(Duration::from_millis(1));
        let max = max.max(min);
        Self { min, max, next: min }
    }

    /// Delay to wait before the next attempt
    pub fn next_backoff(&mut self) -> Duration {
        let current = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        current
    }

    pub fn reset(&mut self) {
        self.next = self.min;
    }
}

/// Backoff bookkeeping for one resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            backoff: ExponentialBackoff::new(min, max),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}
