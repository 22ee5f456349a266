//! Exponential backoff with jitter

use std::time::Duration;

use rand::Rng;

/// Backoff schedule for retries.
///
/// The n-th retry waits `initial_backoff * multiplier^(n-1)`, capped at
/// `max_backoff`. Throttling errors start from `initial_throttling_backoff`
/// instead. With jitter enabled, the delay is drawn uniformly from
/// `[delay * (1 - jitter_factor), delay]`.
///
/// Successive delays never shrink while `jitter_factor <= 1 - 1 / multiplier`
/// (0.5 for the default multiplier); the default factor of 0.1 stays well
/// inside that bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Base delay of the first retry
    pub initial_backoff: Duration,
    /// Base delay of the first retry after a throttling error
    pub initial_throttling_backoff: Duration,
    /// Upper bound of any single delay
    pub max_backoff: Duration,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Whether to randomize delays
    pub use_jitter: bool,
    /// Fraction of the delay that may be shaved off (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            initial_throttling_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(20),
            multiplier: 2.0,
            use_jitter: true,
            jitter_factor: 0.1,
        }
    }
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    pub const fn with_initial_throttling_backoff(mut self, delay: Duration) -> Self {
        self.initial_throttling_backoff = delay;
        self
    }

    pub const fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub const fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`. Non-finite values
    /// disable jitter.
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = sanitize_factor(factor);
        self
    }

    /// Delay before the given retry (1 = first retry).
    pub fn delay(&self, retry: u32, throttling: bool) -> Duration {
        let initial = if throttling {
            self.initial_throttling_backoff
        } else {
            self.initial_backoff
        };
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = initial.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.max_backoff.as_millis() as f64);
        let delay = Duration::from_millis(capped_ms.max(0.0) as u64);

        if self.use_jitter {
            self.add_jitter(delay)
        } else {
            delay
        }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        let upper = delay.as_millis() as f64;
        let lower = upper * (1.0 - sanitize_factor(self.jitter_factor));
        if lower >= upper {
            return delay;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(lower..=upper) as u64)
    }
}

fn sanitize_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_and_caps() {
        let backoff = ExponentialBackoff::new()
            .with_jitter(false)
            .with_max_backoff(Duration::from_millis(350));

        assert_eq!(backoff.delay(1, false), Duration::from_millis(100));
        assert_eq!(backoff.delay(2, false), Duration::from_millis(200));
        assert_eq!(backoff.delay(3, false), Duration::from_millis(350));
        assert_eq!(backoff.delay(30, false), Duration::from_millis(350));
    }

    #[test]
    fn throttling_uses_its_own_base() {
        let backoff = ExponentialBackoff::new()
            .with_jitter(false)
            .with_initial_throttling_backoff(Duration::from_millis(500));
        assert_eq!(backoff.delay(1, true), Duration::from_millis(500));
        assert_eq!(backoff.delay(2, true), Duration::from_millis(1000));
    }

    #[test]
    fn default_jitter_keeps_delays_growing() {
        let backoff = ExponentialBackoff::default();
        assert!(backoff.use_jitter);
        for _ in 0..500 {
            let first = backoff.delay(1, false);
            let second = backoff.delay(2, false);
            assert!(second > first, "{first:?} then {second:?}");
            assert!(first >= Duration::from_millis(90), "{first:?}");
        }
    }

    #[test]
    fn non_finite_jitter_factor_disables_jitter() {
        let backoff = ExponentialBackoff::new().with_jitter_factor(f64::NAN);
        assert_eq!(backoff.jitter_factor, 0.0);
        assert_eq!(backoff.delay(1, false), Duration::from_millis(100));

        let mut backoff = ExponentialBackoff::new();
        backoff.jitter_factor = f64::INFINITY;
        assert_eq!(backoff.delay(2, false), Duration::from_millis(200));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let backoff = ExponentialBackoff::new().with_jitter_factor(0.5);
        for _ in 0..100 {
            let delay = backoff.delay(2, false);
            assert!(delay >= Duration::from_millis(100), "{delay:?}");
            assert!(delay <= Duration::from_millis(200), "{delay:?}");
        }
    }
}
