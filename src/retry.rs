//! Retry-with-backoff policy for flaky page probes.

use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Exponential backoff with random jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff_ms: u64,
    /// Factor applied to the delay after each retry
    pub multiplier: f64,
    /// Upper bound for a single delay (before jitter)
    pub max_backoff_ms: u64,
    /// Random jitter added to each delay (0 to this value)
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 5000,
            jitter_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_attempts: 1, initial_backoff_ms: 0, multiplier: 1.0, max_backoff_ms: 0, jitter_ms: 0 }
    }

    /// Returns true if another attempt is allowed after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);

        Duration::from_millis(millis.max(0.0) as u64)
    }

    /// Sleeps for the backoff of retry number `retry` plus jitter.
    pub async fn wait(&self, retry: u32) {
        let jitter = if self.jitter_ms > 0 { rand::rng().random_range(0..=self.jitter_ms) } else { 0 };

        let total = self.backoff(retry) + Duration::from_millis(jitter);
        if total.is_zero() {
            return;
        }

        debug!("Retrying in {}ms", total.as_millis());
        tokio::time::sleep(total).await;
    }
}
