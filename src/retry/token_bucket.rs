//! Per-partition retry token bucket
//!
//! Every retry debits the bucket; successes refund it; the bucket also
//! refills over time. A drained bucket stops retries for the whole partition
//! so a struggling service is not hammered by every client at once.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Token bucket settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBucketConfig {
    /// Maximum (and initial) number of tokens
    pub capacity: u32,
    /// Cost of retrying after a throttling or server error
    pub retry_cost: u32,
    /// Cost of retrying after a transient (network/timeout) error
    pub timeout_retry_cost: u32,
    /// Extra tokens returned on success
    pub success_refund: u32,
    /// Tokens regained per second
    pub refill_per_second: f64,
    /// Fail immediately instead of waiting when the bucket is drained
    pub circuit_breaker: bool,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            retry_cost: 5,
            timeout_retry_cost: 10,
            success_refund: 1,
            refill_per_second: 10.0,
            circuit_breaker: true,
        }
    }
}

impl TokenBucketConfig {
    pub const fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub const fn with_retry_cost(mut self, cost: u32) -> Self {
        self.retry_cost = cost;
        self
    }

    pub const fn with_timeout_retry_cost(mut self, cost: u32) -> Self {
        self.timeout_retry_cost = cost;
        self
    }

    pub const fn with_success_refund(mut self, refund: u32) -> Self {
        self.success_refund = refund;
        self
    }

    /// Set the refill rate. Negative or non-finite rates disable refill.
    pub fn with_refill_per_second(mut self, rate: f64) -> Self {
        self.refill_per_second = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            0.0
        };
        self
    }

    pub const fn with_circuit_breaker(mut self, enabled: bool) -> Self {
        self.circuit_breaker = enabled;
        self
    }
}

/// The bucket could not supply the requested tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("token bucket drained: needed {needed}, {available} available")]
pub struct BucketDrained {
    pub needed: u32,
    pub available: u32,
}

#[derive(Debug)]
struct BucketState {
    available: f64,
    last_refill: Instant,
}

/// Thread-safe token bucket shared by all operations of one partition.
#[derive(Debug)]
pub struct TokenBucket {
    config: TokenBucketConfig,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            state: Mutex::new(BucketState {
                available: f64::from(config.capacity),
                last_refill: Instant::now(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &TokenBucketConfig {
        &self.config
    }

    /// Whole tokens currently available.
    pub fn available(&self) -> u32 {
        let mut state = self.lock();
        self.refill(&mut state);
        state.available as u32
    }

    /// Take `cost` tokens, waiting for refill unless the circuit breaker is on.
    pub async fn acquire(&self, cost: u32) -> Result<(), BucketDrained> {
        self.wait_for(cost, true).await
    }

    /// Wait until at least one token is available without taking any.
    pub async fn admit(&self) -> Result<(), BucketDrained> {
        self.wait_for(1, false).await
    }

    /// Take `cost` tokens if they are available right now.
    pub fn try_acquire(&self, cost: u32) -> bool {
        let mut state = self.lock();
        self.refill(&mut state);
        if state.available >= f64::from(cost) {
            state.available -= f64::from(cost);
            true
        } else {
            false
        }
    }

    /// Return tokens, capped at capacity.
    pub fn release(&self, amount: u32) {
        let mut state = self.lock();
        self.refill(&mut state);
        state.available =
            (state.available + f64::from(amount)).min(f64::from(self.config.capacity));
    }

    async fn wait_for(&self, needed: u32, debit: bool) -> Result<(), BucketDrained> {
        loop {
            let wait = {
                let mut state = self.lock();
                self.refill(&mut state);
                let missing = f64::from(needed) - state.available;
                if missing <= 0.0 {
                    if debit {
                        state.available -= f64::from(needed);
                    }
                    return Ok(());
                }

                let drained = BucketDrained {
                    needed,
                    available: state.available as u32,
                };
                let rate = self.config.refill_per_second;
                let refills = rate.is_finite() && rate > 0.0;
                if self.config.circuit_breaker || !refills || needed > self.config.capacity {
                    return Err(drained);
                }
                match Duration::try_from_secs_f64(missing / rate) {
                    Ok(wait) => wait,
                    Err(_) => return Err(drained),
                }
            };

            tracing::trace!(
                target: "siumai::runtime",
                needed,
                wait_ms = wait.as_millis() as u64,
                "waiting for retry tokens"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;
        if elapsed > 0.0 && self.config.refill_per_second > 0.0 {
            state.available = (state.available + elapsed * self.config.refill_per_second)
                .min(f64::from(self.config.capacity));
        }
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_refill(capacity: u32) -> TokenBucketConfig {
        TokenBucketConfig::default()
            .with_capacity(capacity)
            .with_refill_per_second(0.0)
    }

    #[tokio::test(start_paused = true)]
    async fn debits_and_refunds() {
        let bucket = TokenBucket::new(no_refill(10));
        bucket.acquire(5).await.unwrap();
        assert_eq!(bucket.available(), 5);

        bucket.release(20);
        assert_eq!(bucket.available(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn circuit_breaker_fails_fast() {
        let bucket = TokenBucket::new(no_refill(4));
        let err = bucket.acquire(5).await.unwrap_err();
        assert_eq!(
            err,
            BucketDrained {
                needed: 5,
                available: 4
            }
        );
        assert!(!bucket.try_acquire(5));
        assert!(bucket.try_acquire(4));
        assert!(bucket.admit().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_refill_without_circuit_breaker() {
        let config = TokenBucketConfig::default()
            .with_capacity(10)
            .with_refill_per_second(10.0)
            .with_circuit_breaker(false);
        let bucket = TokenBucket::new(config);
        assert!(bucket.try_acquire(10));

        let start = Instant::now();
        bucket.acquire(5).await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(500), "{waited:?}");
        assert!(waited < Duration::from_millis(600), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_refill_wait_fails_instead_of_panicking() {
        let mut config = TokenBucketConfig::default()
            .with_capacity(10)
            .with_circuit_breaker(false);
        config.refill_per_second = 1e-300;
        let bucket = TokenBucket::new(config);
        assert!(bucket.try_acquire(10));

        let err = bucket.acquire(5).await.unwrap_err();
        assert_eq!(
            err,
            BucketDrained {
                needed: 5,
                available: 0
            }
        );
    }

    #[test]
    fn invalid_refill_rates_disable_refill() {
        assert_eq!(
            TokenBucketConfig::default()
                .with_refill_per_second(f64::NAN)
                .refill_per_second,
            0.0
        );
        assert_eq!(
            TokenBucketConfig::default()
                .with_refill_per_second(-1.0)
                .refill_per_second,
            0.0
        );
    }
}
