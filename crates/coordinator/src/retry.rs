//! Retry policy around the planning call.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use synapse_common::PlanningError;
use tracing::warn;

/// Exponential backoff for planning attempts.
///
/// Only [`PlanningError::Unreachable`] is retried; a reply that was malformed
/// or invalid will not improve by asking again with the same prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retry
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(retry as i32);
        let jitter = (base * 0.1 * jitter_fraction(retry)) as u64;
        let delay = (base as u64).saturating_add(jitter);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. The closure receives the 1-based attempt
    /// number.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, PlanningError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PlanningError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut number = 1;
        loop {
            match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && number < max_attempts => {
                    let delay = self.delay_for(number - 1);
                    warn!(
                        attempt = number,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying planning"
                    );
                    tokio::time::sleep(delay).await;
                    number += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Deterministic jitter in [0, 1) derived from the retry number.
fn jitter_fraction(retry: u32) -> f64 {
    let x = retry.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}
