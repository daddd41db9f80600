use crate::types::constants::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_CAP_DELAY};
use std::time::Duration;

/// Backoff parameters for automatic reconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub base_delay: Duration,
    pub cap_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(RECONNECT_BASE_DELAY),
            cap_delay: Duration::from_millis(RECONNECT_CAP_DELAY),
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Reconnection bookkeeping with capped exponential backoff.
///
/// `delay = min(base_delay * 2^attempt, cap_delay)`. The attempt counter is
/// bumped before each delay is computed, so the first retry waits
/// `2 * base_delay`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempt: u32,
    config: ReconnectConfig,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { attempt: 0, config }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Delay for the current attempt
    pub fn delay(&self) -> Duration {
        self.delay_for(self.attempt)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.config
            .base_delay
            .saturating_mul(factor)
            .min(self.config.cap_delay)
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.config.max_attempts
    }

    /// Records a failed attempt and returns how long to wait before the next
    /// one, or `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt += 1;
        Some(self.delay())
    }

    /// Reset after a successful connect or an explicit disconnect
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}
