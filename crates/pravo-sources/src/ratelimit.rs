//! Per-adapter rate limiting.
//!
//! Each adapter instance carries one token bucket enforcing a minimum
//! interval between outbound calls. The bucket is shared across every
//! concurrent caller of that adapter; bursts above the interval are not
//! possible. Acquisition suspends the task, never the thread.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// Token bucket with a minimum inter-call interval.
pub struct AdapterLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl AdapterLimiter {
    /// Creates a limiter allowing one call per `min_interval`.
    pub fn new(min_interval: Duration) -> Self {
        let interval = min_interval.max(Duration::from_millis(1));
        let quota = Quota::with_period(interval)
            .expect("non-zero interval")
            .allow_burst(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Waits until the next call is allowed.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_interval_enforced_across_callers() {
        let limiter = std::sync::Arc::new(AdapterLimiter::new(Duration::from_millis(40)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        // Three acquisitions need at least two full intervals.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
