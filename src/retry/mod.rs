//! Retry
//!
//! - `classifier.rs`: turning failed attempts into [`ErrorInfo`]
//! - `backoff.rs`: exponential backoff with jitter
//! - `token_bucket.rs`: per-partition retry budget
//! - `strategy.rs`: [`StandardRetryStrategy`]
//!
//! The orchestrator drives a [`RetryStrategy`] through one token per attempt:
//! `acquire_initial_token` before the first attempt, `schedule_retry` after
//! each failure (yielding the next token and the delay to wait), and
//! `record_success` exactly once when an attempt succeeds.

pub mod backoff;
pub mod classifier;
pub mod strategy;
pub mod token_bucket;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use backoff::ExponentialBackoff;
pub use classifier::{
    ClassifyRetry, ErrorInfo, HttpStatusCodeClassifier, ModeledErrorClassifier, RetryClassifiers,
    TransportErrorClassifier, parse_retry_after,
};
pub use strategy::{StandardRetryConfig, StandardRetryStrategy};
pub use token_bucket::{BucketDrained, TokenBucket, TokenBucketConfig};

/// Permission to run one attempt within a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryToken {
    partition: Arc<str>,
    attempt: u32,
    delay: Duration,
    checked_out: u32,
}

impl RetryToken {
    /// Token for the first attempt.
    pub fn new(partition: impl Into<Arc<str>>) -> Self {
        Self {
            partition: partition.into(),
            attempt: 1,
            delay: Duration::ZERO,
            checked_out: 0,
        }
    }

    /// Token for the following attempt, after waiting `delay`, holding `cost`
    /// more budget.
    pub fn next(&self, delay: Duration, cost: u32) -> Self {
        Self {
            partition: self.partition.clone(),
            attempt: self.attempt + 1,
            delay,
            checked_out: self.checked_out.saturating_add(cost),
        }
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// 1-based number of the attempt this token admits.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// How long to wait before the attempt starts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Budget debited by retries so far.
    pub fn checked_out(&self) -> u32 {
        self.checked_out
    }
}

/// Reasons a strategy refuses to (re)attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("retry attempts exhausted after {attempts} attempt(s)")]
    Exhausted { attempts: u32 },

    #[error("error is not retryable")]
    NotRetryable,

    #[error("retry capacity exceeded for partition `{partition}`")]
    CapacityExceeded { partition: String },
}

/// Pluggable retry decision maker, shared across concurrent operations.
#[async_trait]
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    /// Admit the first attempt; may wait on a shared limiter.
    async fn acquire_initial_token(&self, partition: &str) -> Result<RetryToken, RetryError>;

    /// Decide whether to retry after `error` and return the next token.
    async fn schedule_retry(
        &self,
        token: RetryToken,
        error: &ErrorInfo,
    ) -> Result<RetryToken, RetryError>;

    /// Report a successful attempt. Called once per successful operation.
    fn record_success(&self, token: RetryToken);

    fn max_attempts(&self) -> u32;
}

pub type SharedRetryStrategy = Arc<dyn RetryStrategy>;

/// Runs a single attempt and never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetryStrategy;

#[async_trait]
impl RetryStrategy for NeverRetryStrategy {
    async fn acquire_initial_token(&self, partition: &str) -> Result<RetryToken, RetryError> {
        Ok(RetryToken::new(partition))
    }

    async fn schedule_retry(
        &self,
        token: RetryToken,
        _error: &ErrorInfo,
    ) -> Result<RetryToken, RetryError> {
        Err(RetryError::Exhausted {
            attempts: token.attempt(),
        })
    }

    fn record_success(&self, _token: RetryToken) {}

    fn max_attempts(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn never_retry_refuses_second_attempt() {
        let strategy = NeverRetryStrategy;
        let token = strategy.acquire_initial_token("p").await.unwrap();
        assert_eq!(token.attempt(), 1);

        let err = strategy
            .schedule_retry(token, &ErrorInfo::new(ErrorKind::ServerError))
            .await
            .unwrap_err();
        assert_eq!(err, RetryError::Exhausted { attempts: 1 });
    }

    #[test]
    fn next_token_accumulates_cost() {
        let token = RetryToken::new("p");
        let next = token.next(Duration::from_millis(100), 5).next(Duration::from_millis(200), 10);
        assert_eq!(next.attempt(), 3);
        assert_eq!(next.checked_out(), 15);
        assert_eq!(next.delay(), Duration::from_millis(200));
        assert_eq!(next.partition(), "p");
    }
}
