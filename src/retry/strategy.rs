//! Standard retry strategy

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    ErrorInfo, ExponentialBackoff, RetryError, RetryStrategy, RetryToken, TokenBucket,
    TokenBucketConfig,
};
use crate::error::{BuildError, ErrorKind};

/// Serializable settings for [`StandardRetryStrategy`]. Durations are in
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardRetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub initial_throttling_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub jitter_factor: f64,
    pub token_bucket: TokenBucketConfig,
}

impl Default for StandardRetryConfig {
    fn default() -> Self {
        let backoff = ExponentialBackoff::default();
        Self {
            max_attempts: 3,
            initial_backoff_ms: backoff.initial_backoff.as_millis() as u64,
            initial_throttling_backoff_ms: backoff.initial_throttling_backoff.as_millis() as u64,
            max_backoff_ms: backoff.max_backoff.as_millis() as u64,
            backoff_multiplier: backoff.multiplier,
            jitter: backoff.use_jitter,
            jitter_factor: backoff.jitter_factor,
            token_bucket: TokenBucketConfig::default(),
        }
    }
}

impl StandardRetryConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new()
            .with_initial_backoff(Duration::from_millis(self.initial_backoff_ms))
            .with_initial_throttling_backoff(Duration::from_millis(
                self.initial_throttling_backoff_ms,
            ))
            .with_max_backoff(Duration::from_millis(self.max_backoff_ms))
            .with_multiplier(self.backoff_multiplier)
            .with_jitter(self.jitter)
            .with_jitter_factor(self.jitter_factor)
    }
}

/// Retries retryable errors with exponential backoff, bounded by an attempt
/// limit and a per-partition token bucket.
///
/// One strategy instance is meant to be shared by every orchestrator of a
/// client so that partitions share their budget.
#[derive(Debug)]
pub struct StandardRetryStrategy {
    max_attempts: u32,
    backoff: ExponentialBackoff,
    bucket_config: TokenBucketConfig,
    buckets: Mutex<HashMap<String, Arc<TokenBucket>>>,
}

impl Default for StandardRetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: ExponentialBackoff::default(),
            bucket_config: TokenBucketConfig::default(),
            buckets: Mutex::new(HashMap::new()),
        }
    }
}

impl StandardRetryStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StandardRetryConfig) -> Result<Self, BuildError> {
        if config.max_attempts == 0 {
            return Err(BuildError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if config.backoff_multiplier.is_nan() || config.backoff_multiplier < 1.0 {
            return Err(BuildError::InvalidConfig(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                config.backoff_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&config.jitter_factor) {
            return Err(BuildError::InvalidConfig(format!(
                "jitter_factor must be within 0.0..=1.0, got {}",
                config.jitter_factor
            )));
        }
        let refill = config.token_bucket.refill_per_second;
        if !refill.is_finite() || refill < 0.0 {
            return Err(BuildError::InvalidConfig(format!(
                "token_bucket.refill_per_second must be finite and >= 0, got {refill}"
            )));
        }
        Ok(Self {
            max_attempts: config.max_attempts,
            backoff: config.backoff(),
            bucket_config: config.token_bucket.clone(),
            buckets: Mutex::new(HashMap::new()),
        })
    }

    /// Set the attempt limit (values below 1 are raised to 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_token_bucket(mut self, config: TokenBucketConfig) -> Self {
        self.bucket_config = config;
        self
    }

    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }

    /// Tokens left in a partition's bucket.
    pub fn available_capacity(&self, partition: &str) -> u32 {
        self.bucket(partition).available()
    }

    fn bucket(&self, partition: &str) -> Arc<TokenBucket> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets
            .entry(partition.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(self.bucket_config.clone())))
            .clone()
    }

    fn retry_cost(&self, kind: ErrorKind) -> u32 {
        match kind {
            ErrorKind::TransientError => self.bucket_config.timeout_retry_cost,
            _ => self.bucket_config.retry_cost,
        }
    }
}

#[async_trait]
impl RetryStrategy for StandardRetryStrategy {
    async fn acquire_initial_token(&self, partition: &str) -> Result<RetryToken, RetryError> {
        self.bucket(partition).admit().await.map_err(|drained| {
            tracing::debug!(
                target: "siumai::runtime",
                partition,
                %drained,
                "initial retry token refused"
            );
            RetryError::CapacityExceeded {
                partition: partition.to_string(),
            }
        })?;
        Ok(RetryToken::new(partition))
    }

    async fn schedule_retry(
        &self,
        token: RetryToken,
        error: &ErrorInfo,
    ) -> Result<RetryToken, RetryError> {
        if !error.is_retryable() {
            return Err(RetryError::NotRetryable);
        }
        if token.attempt() >= self.max_attempts {
            return Err(RetryError::Exhausted {
                attempts: token.attempt(),
            });
        }

        let cost = self.retry_cost(error.kind());
        self.bucket(token.partition())
            .acquire(cost)
            .await
            .map_err(|drained| {
                tracing::debug!(
                    target: "siumai::runtime",
                    partition = token.partition(),
                    %drained,
                    "retry budget exhausted"
                );
                RetryError::CapacityExceeded {
                    partition: token.partition().to_string(),
                }
            })?;

        let throttling = error.kind() == ErrorKind::ThrottlingError;
        let computed = self.backoff.delay(token.attempt(), throttling);
        let delay = error
            .retry_after()
            .map(|hint| hint.min(self.backoff.max_backoff))
            .unwrap_or(computed);

        tracing::debug!(
            target: "siumai::runtime",
            partition = token.partition(),
            attempt = token.attempt() + 1,
            kind = %error.kind(),
            delay_ms = delay.as_millis() as u64,
            "scheduling retry"
        );
        Ok(token.next(delay, cost))
    }

    fn record_success(&self, token: RetryToken) {
        let refund = token
            .checked_out()
            .saturating_add(self.bucket_config.success_refund);
        self.bucket(token.partition()).release(refund);
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
