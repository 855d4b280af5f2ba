//! Bounded exponential backoff for automatic reconnects.

use std::time::Duration;

/// Attempt counter plus the delay schedule derived from it.
///
/// Delay for attempt `k` (1-based) is `base * 2^(k-1)`. The counter only
/// advances while below `max_attempts` and resets on a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectState {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl ReconnectState {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Attempts scheduled since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Advance the counter and return the delay before the next attempt,
    /// or `None` once the bound is reached (the counter then stays frozen).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for_attempt(self.attempts))
    }

    /// `base * 2^(attempt-1)`, saturating instead of overflowing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
