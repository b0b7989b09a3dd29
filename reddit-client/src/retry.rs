//! Retries for a single Reddit request.
//!
//! Whether a failure is worth repeating comes from [`ErrorExt::is_transient`];
//! this module only decides how long to wait and how often.

use monitor_core::{CoreError, ErrorExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Exponential backoff with additive jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts in total, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Up to this fraction of the computed delay is added at random.
    pub jitter: f64,
}

impl RetryConfig {
    pub fn reddit() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }

    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::reddit()
        }
    }

    /// Wait before retry number `retry` (0 for the first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let scaled_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let scaled = Duration::from_millis(scaled_ms as u64).min(self.max_delay);
        let jitter_ms = (scaled.as_millis() as f64 * self.jitter) as u64;
        let jittered = scaled + Duration::from_millis(fastrand::u64(0..=jitter_ms));
        jittered.min(self.max_delay)
    }

    /// `None` when `error` is permanent. A delay named by the server wins
    /// over the computed backoff.
    pub fn delay_before_retry(&self, error: &CoreError, retry: u32) -> Option<Duration> {
        if !error.is_transient() {
            return None;
        }
        Some(error.retry_after().unwrap_or_else(|| self.backoff(retry)))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::reddit()
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` until it succeeds, fails permanently or runs out of
    /// attempts. The last error is returned exactly as produced.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut retry = 0;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!("{} succeeded on attempt {}", what, retry + 1);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let attempts_left = retry + 1 < self.config.max_attempts;
            let delay = match self.config.delay_before_retry(&error, retry) {
                Some(delay) if attempts_left => delay,
                _ => return Err(error),
            };

            warn!(
                "{} failed on attempt {}/{} ({}), retrying in {:?}",
                what,
                retry + 1,
                self.config.max_attempts,
                error,
                delay
            );
            sleep(delay).await;
            retry += 1;
        }
    }
}
