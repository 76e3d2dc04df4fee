//! Bounded retry with exponential backoff for rate-limited calls.
//!
//! Only failures carrying the rate-limit signal are retried. Delays are
//! `initial_delay * 2^(attempt - 1)` with no jitter and no cap; every
//! other failure is returned to the caller unchanged on first sight.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use reelgen_models::FailureSignal;
use tracing::{debug, warn};

use crate::metrics::record_retry;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles for each later attempt.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Delay after failed attempt `attempt` (counted from 1).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    fn attempt_cap(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Execute an async operation, retrying while it reports rate limiting.
///
/// Attempts run strictly one after another. The error from the last
/// attempt is returned as is.
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::default();
/// let script = with_retry(&policy, "script_generate", || client.generate(&prompt)).await?;
/// ```
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: FailureSignal + Display,
{
    let max_attempts = policy.attempt_cap();
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_rate_limit() && attempt < max_attempts => {
                let delay = policy.delay_after_attempt(attempt);
                warn!(
                    operation = %operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, retrying: {}",
                    e
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    operation = %operation,
                    attempts = attempt,
                    rate_limited = e.is_rate_limit(),
                    "Operation failed: {}",
                    e
                );
                return Err(e);
            }
        }
    }
}
