//! Retry Policy
//!
//! Attempt budget and backoff schedule shared by every upstream call.

use std::time::Duration;

use rand::Rng;

use crate::error::{Result, WeatherError};

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_MAX_DELAY_SECS: f64 = 10.0;
pub const DEFAULT_JITTER_SECS: f64 = 0.5;

// == Retry Policy ==
/// Backoff configuration, read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry)
    pub base_delay: Duration,
    /// Upper bound on any single delay, jitter included
    pub max_delay: Duration,
    /// Upper bound of the uniform random delay added to each wait
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs_f64(DEFAULT_BASE_DELAY_SECS),
            max_delay: Duration::from_secs_f64(DEFAULT_MAX_DELAY_SECS),
            jitter: Duration::from_secs_f64(DEFAULT_JITTER_SECS),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy without jitter.
    ///
    /// # Arguments
    /// * `max_retries` - Retries after the first attempt
    /// * `base_delay_secs` - First backoff delay, must be > 0
    /// * `max_delay_secs` - Delay cap, must be >= `base_delay_secs`
    pub fn new(max_retries: u32, base_delay_secs: f64, max_delay_secs: f64) -> Result<Self> {
        let base_delay = positive_seconds("base retry delay", base_delay_secs)?;
        let max_delay = positive_seconds("max retry delay", max_delay_secs)?;
        if max_delay < base_delay {
            return Err(WeatherError::Config(format!(
                "max retry delay ({max_delay_secs}s) must not be below \
                 base retry delay ({base_delay_secs}s)"
            )));
        }

        Ok(Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: Duration::ZERO,
        })
    }

    /// Sets the jitter bound in seconds; 0 disables jitter.
    pub fn with_jitter(mut self, jitter_secs: f64) -> Result<Self> {
        self.jitter = Duration::try_from_secs_f64(jitter_secs).map_err(|_| {
            WeatherError::Config(format!("retry jitter must be >= 0, got {jitter_secs}"))
        })?;
        Ok(self)
    }

    /// Total number of attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    // == Delay Schedule ==
    /// Delay before retry number `retry` (1-based), without jitter.
    ///
    /// `min(base * 2^(retry - 1), max)`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Adds uniform random jitter to `delay`, keeping it within `max_delay`.
    pub fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter.is_zero() {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(Duration::ZERO..=self.jitter);
        delay.saturating_add(extra).min(self.max_delay)
    }
}

fn positive_seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| WeatherError::Config(format!("{name} must be > 0, got {secs}")))
}
