//! Bounded retries with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::FusionError;

/// Retry budget for one operation.
///
/// `max_retries = 3` means up to four attempts. The delay before retry `n`
/// (1-based) is `base_delay * 2^(n-1)`, without jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts allowed, first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff after failed attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// budget is spent. `op` receives the 1-based attempt number.
    ///
    /// Exhaustion returns the last error unchanged. Cancelling `cancel`
    /// during a backoff sleep also returns the last error; no further
    /// attempt starts.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, FusionError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FusionError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= max_attempts || cancel.is_cancelled() {
                return Err(err);
            }

            let delay = self.delay_for_attempt(attempt);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay = ?delay,
                error = %err,
                "attempt failed, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(err),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
