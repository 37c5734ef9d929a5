//! Per-transfer retry bookkeeping
//!
//! One `RetryState` belongs to one in-flight fetch. It counts attempts and
//! hands out the exponential backoff delay (`base * 2^attempt`) between them.

use std::time::Duration;

/// Attempt counter and backoff schedule for a single fetch
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryState {
    /// Create a state allowing `max_attempts` attempts (at least one)
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Zero-based index of the current attempt
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay that follows a failure of the given attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Record a failed attempt
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt + 1 >= self.max_attempts {
            return None;
        }

        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
