// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::error::{Error, Result};

/// Request quota for the web service: at most `max_requests` admissions
/// per `interval`, refilled continuously.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    interval: Duration,
    max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(interval: Duration, max_requests: u32) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidRateLimit("interval must be greater than zero"));
        }
        if max_requests == 0 {
            return Err(Error::InvalidRateLimit(
                "max_requests must be greater than zero",
            ));
        }
        Ok(Self {
            interval,
            max_requests,
        })
    }

    fn max(&self) -> f64 {
        f64::from(self.max_requests)
    }

    /// Seconds of refill needed for one whole token.
    fn seconds_per_token(&self) -> f64 {
        self.interval.as_secs_f64() / self.max()
    }
}

impl Default for RateLimitPolicy {
    /// The MusicBrainz guideline: one request per second.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_requests: 1,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    policy: RateLimitPolicy,
    enabled: bool,
    /// Unset until the first admission; the bucket then starts full.
    remaining: Option<f64>,
    last_refill: Instant,
}

impl Bucket {
    /// Credit tokens for the time elapsed since the last refill, clamped
    /// to the bucket capacity, and return the new balance.
    fn refill(&mut self, now: Instant) -> f64 {
        let remaining = match self.remaining {
            None => self.policy.max(),
            Some(tokens) => {
                let elapsed = now.duration_since(self.last_refill).as_secs_f64();
                (tokens + elapsed * self.policy.max() / self.policy.interval.as_secs_f64())
                    .min(self.policy.max())
            }
        };
        self.remaining = Some(remaining);
        self.last_refill = now;
        remaining
    }
}

/// Token-bucket gate in front of every web service call.
///
/// One caller at a time passes through the accounting critical section;
/// a caller finding the bucket empty sleeps until enough budget has
/// accumulated, holding its place in line. Bursts up to the bucket
/// capacity are admitted immediately after idle periods; the sustained
/// rate converges to `max_requests / interval`. The protected call runs
/// after the gate is released, so only accounting is serialized.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_state(policy, true)
    }

    /// A limiter that admits every caller immediately.
    pub fn disabled() -> Self {
        Self::with_state(RateLimitPolicy::default(), false)
    }

    fn with_state(policy: RateLimitPolicy, enabled: bool) -> Self {
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                policy,
                enabled,
                remaining: None,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Replace the quota. Takes effect on the next refill computation;
    /// tokens already in the bucket are not rescaled.
    pub async fn set_policy(&self, policy: RateLimitPolicy) {
        let mut bucket = self.bucket.lock().await;
        bucket.policy = policy;
        bucket.enabled = true;
    }

    pub async fn disable(&self) {
        self.bucket.lock().await.enabled = false;
    }

    /// Block until the quota admits one more request.
    ///
    /// Waits are transparent delays: they are never surfaced as errors
    /// and never time out on their own.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        if !bucket.enabled {
            return;
        }

        let mut remaining = bucket.refill(Instant::now());
        while remaining < 0.999 {
            let wait = (1.0 - remaining) * bucket.policy.seconds_per_token();
            trace!(target: "musicbrainz", "rate limiting: waiting {:.3}s", wait);
            sleep(Duration::from_secs_f64(wait)).await;
            remaining = bucket.refill(Instant::now());
        }
        bucket.remaining = Some(remaining - 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(interval_ms: u64, max_requests: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(Duration::from_millis(interval_ms), max_requests).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn first_admission_is_immediate() {
        let limiter = RateLimiter::new(policy(1000, 1));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_admissions_pay_full_intervals() {
        let limiter = RateLimiter::new(policy(1000, 1));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(2),
            "expected >= 2s between first and third admission, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_the_bucket() {
        let limiter = RateLimiter::new(policy(1000, 1));
        limiter.acquire().await;

        sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_up_to_capacity_after_idle() {
        let limiter = RateLimiter::new(policy(1000, 3));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed().is_zero());

        // The fourth admission has to wait for a refill.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_limiter_never_delays() {
        let limiter = RateLimiter::disabled();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_takes_effect_for_queued_history() {
        let limiter = RateLimiter::new(policy(1000, 1));
        limiter.acquire().await;
        limiter.disable().await;

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn policy_change_applies_to_future_refills() {
        let limiter = RateLimiter::new(policy(1000, 1));
        limiter.acquire().await;

        // Ten requests per second from now on.
        limiter.set_policy(policy(1000, 10)).await;

        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        // One token accrues in ~100ms instead of a full second.
        assert!(elapsed <= Duration::from_millis(200), "got {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_each_admitted_once() {
        let limiter = RateLimiter::new(policy(100, 1));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Four admissions at 1 per 100ms: the last pays three intervals.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn rejects_degenerate_policies() {
        assert!(RateLimitPolicy::new(Duration::ZERO, 1).is_err());
        assert!(RateLimitPolicy::new(Duration::from_secs(1), 0).is_err());
    }
}
