//! Retry logic.
//!
//! # State Machine
//! ```text
//! ATTEMPT → SUCCESS
//!         → RETRYABLE_FAILURE → (sleep backoff) → ATTEMPT
//!         → TERMINAL_FAILURE
//! ```
//!
//! A failure is retryable iff its status code is in the configured transient set
//! and the attempt budget is not spent.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::error::{ResourceManagerError, Result};
use crate::observability::metrics;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Default)]
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

    /// Whether `err` is transient under this policy.
    pub fn is_retryable(&self, err: &ResourceManagerError) -> bool {
        err.code()
            .is_some_and(|code| self.config.retryable_codes.contains(&code))
    }

    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// `base_delay_ms * 2^(attempt - 1)`, capped at `max_delay_ms`, plus up to
    /// 10% jitter on top of the capped value.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let Some(exponent) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let delay_ms = self
            .config
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.config.max_delay_ms);
        let jitter_ms = match delay_ms / 10 {
            0 => 0,
            spread => rand::thread_rng().gen_range(0..spread),
        };
        Duration::from_millis(delay_ms + jitter_ms)
    }

    /// Run `call` until it succeeds, fails terminally, or the attempt budget is spent.
    ///
    /// On exhaustion the error of the final attempt is returned.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            metrics::record_call(operation);

            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && self.is_retryable(&err) => {
                    let delay = self.backoff_delay(attempt);
                    tracing::info!(
                        operation,
                        attempt,
                        code = ?err.code(),
                        delay = ?delay,
                        error = %err,
                        "Retrying call after transient failure"
                    );
                    metrics::record_retry(operation);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::debug!(
                        operation,
                        attempt,
                        code = ?err.code(),
                        error = %err,
                        "Call failed"
                    );
                    metrics::record_failure(operation, err.code());
                    return Err(err);
                }
            }
        }
    }
}
