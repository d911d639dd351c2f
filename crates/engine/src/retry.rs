//! Retry policy for optimistic merges
//!
//! A merge that loses a check-and-put race reloads the tree and tries again
//! after a jittered exponential backoff. The policy bounds both the number
//! of attempts and the longest sleep.

use chaintree_core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts before giving up with `Error::Conflict`, including the first
    pub max_attempts: u32,
    /// Sleep after the first conflict
    pub initial_backoff_ms: u64,
    /// Upper bound for any sleep
    pub max_backoff_ms: u64,
    /// Randomize each sleep within `[backoff / 2, backoff]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 16,
            initial_backoff_ms: 1,
            max_backoff_ms: 50,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            jitter: false,
        }
    }

    /// Sleep before attempt `attempt + 1`, given `attempt` failed (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let ceiling = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        let millis = if self.jitter && ceiling > 1 {
            rand::thread_rng().gen_range(ceiling / 2..=ceiling)
        } else {
            ceiling
        };
        Duration::from_millis(millis)
    }

    /// Reject policies that can never succeed
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfiguration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::InvalidConfiguration(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}
