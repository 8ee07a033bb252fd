//! Pacing for outgoing API calls.
//!
//! A token bucket refilled at a fixed rate. Every lookup takes one token, so
//! consecutive calls are spaced out regardless of whether they succeed.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// A token bucket rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    tokens: f64,
    max_tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_update: Instant,
    /// False when the configured rate is 0 (unlimited)
    enabled: bool,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` calls per second.
    /// A rate of 0 disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let enabled = requests_per_second > 0.0;
        let max_tokens = if enabled {
            // Burst of at most one second worth of calls, and never less than one call
            requests_per_second.max(1.0)
        } else {
            f64::INFINITY
        };

        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate: requests_per_second,
            last_update: Instant::now(),
            enabled,
        }
    }

    fn refill(&mut self) {
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_update = now;
    }

    /// Try to take a token, returning how long to wait if none is available
    pub fn try_acquire(&mut self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }

        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let wait_secs = (1.0 - self.tokens) / self.refill_rate;
            Some(Duration::from_secs_f64(wait_secs))
        }
    }

    /// Take a token, sleeping until one is available
    pub async fn acquire(&mut self) {
        while let Some(wait_duration) = self.try_acquire() {
            debug!("Rate limiter waiting {:?} for token", wait_duration);
            sleep(wait_duration).await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Rate limiter usable through a shared reference
#[derive(Debug, Clone)]
pub struct SharedRateLimiter {
    inner: Arc<Mutex<RateLimiter>>,
}

impl SharedRateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiter::new(requests_per_second))),
        }
    }

    pub async fn acquire(&self) {
        let mut limiter = self.inner.lock().await;
        limiter.acquire().await;
    }

    pub async fn is_enabled(&self) -> bool {
        self.inner.lock().await.is_enabled()
    }
}
