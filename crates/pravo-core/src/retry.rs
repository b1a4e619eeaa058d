//! Retry with jittered exponential backoff.
//!
//! Only errors the taxonomy marks retryable (`UNAVAILABLE`,
//! `RESOURCE_EXHAUSTED`) are retried; everything else propagates on the
//! first attempt.

use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff parameters.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), with up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        let jitter = rand::rng().random_range(0.0..0.25);
        exp.mul_f64(1.0 + jitter)
    }
}

/// Runs `op` until it succeeds, fails non-retryably, or attempts exhaust.
/// On exhaustion the last error is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    op = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Maps an HTTP status from an upstream provider onto the error taxonomy.
pub fn classify_status(status: u16, body: &str) -> Error {
    match status {
        429 => Error::ResourceExhausted(format!("upstream throttled: {body}")),
        500..=599 => Error::Unavailable(format!("upstream {status}: {body}")),
        _ => Error::Internal(anyhow::anyhow!("upstream {status}: {body}")),
    }
}
