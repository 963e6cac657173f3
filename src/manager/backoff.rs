//! Reconnect-with-backoff policy.
//!
//! The delay before reconnect attempt `n` (1-based) is
//! `base_delay * min(n, cap_factor)`: linear growth, then flat.
//!
//! With the defaults (1000 ms, cap 5, 10 attempts) the schedule is
//! 1s, 2s, 3s, 4s, 5s, 5s, 5s, 5s, 5s, 5s, then give up.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay unit between reconnect attempts.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default multiplier cap.
const DEFAULT_CAP_FACTOR: u32 = 5;

/// Default number of consecutive attempts before giving up.
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Reconnect schedule configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay unit.
    pub base_delay: Duration,
    /// Largest multiple of `base_delay` ever waited.
    pub cap_factor: u32,
    /// Consecutive failed attempts before the terminal error.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            cap_factor: DEFAULT_CAP_FACTOR,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Sets the delay unit.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the multiplier cap.
    #[inline]
    #[must_use]
    pub fn with_cap_factor(mut self, cap_factor: u32) -> Self {
        self.cap_factor = cap_factor;
        self
    }

    /// Sets the attempt limit.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the delay before the given 1-based attempt.
    #[inline]
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.min(self.cap_factor))
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Attempt counter driven by the connection task.
///
/// Incremented on every scheduled attempt, reset on every successful
/// registration.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    /// Creates a counter at zero attempts.
    #[inline]
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Schedules the next attempt.
    ///
    /// Returns `None` once `max_attempts` attempts have been scheduled
    /// without an intervening [`reset`](Self::reset).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay_for(self.attempts))
    }

    /// Clears the counter after a successful registration.
    #[inline]
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Number of attempts scheduled since the last reset.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The policy in effect.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}

// ============================================================================
// Tests
// ============================================================================
