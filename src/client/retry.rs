//! Bounded retry with a fixed backoff schedule.
//!
//! Epistemic foundation:
//! - K_i: Registries fail transiently (5xx, dropped connections, timeouts)
//! - K_i: Anything else (not found, validation, parse) will fail the same way again
//! - I^B: Whether the next attempt succeeds is unknowable → bounded retries
//!
//! Every registry call and every token request goes through
//! [`execute_with_retry`]. The executor knows nothing about samples.

use crate::models::{ErrorKind, ResolverError};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Classification hook for errors passed through the executor.
pub trait Retryable {
    fn error_kind(&self) -> ErrorKind;
}

impl Retryable for ResolverError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

/// Attempt budget and backoff schedule.
///
/// The default is 7 attempts (1 initial + 6 retries) waiting
/// 1s, 3s, 5s, 5s, 5s, 5s between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Growth factor between consecutive waits
    pub multiplier: u32,
    /// Upper bound for a single wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            initial_backoff: Duration::from_secs(1),
            multiplier: 3,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based). Not jittered.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// State handed to the retry hook.
#[derive(Debug)]
pub struct RetryContext<'a, E> {
    /// Number of the retry about to start (1 for the second attempt)
    pub retry_count: u32,
    /// Failure of the previous attempt
    pub last_error: &'a E,
}

/// Run `operation` until it succeeds, fails with an error kind outside
/// `retry_on`, or the attempt budget is spent.
///
/// `on_retry` runs before every attempt except the first. On exhaustion the
/// last failure is returned unchanged.
pub async fn execute_with_retry<T, E, Op, Fut, OnRetry>(
    policy: &RetryPolicy,
    mut operation: Op,
    mut on_retry: OnRetry,
    retry_on: &[ErrorKind],
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    OnRetry: FnMut(&RetryContext<'_, E>),
    E: Retryable,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut retry_count = 0u32;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let kind = error.error_kind();
        if !retry_on.contains(&kind) || retry_count + 1 >= max_attempts {
            return Err(error);
        }

        retry_count += 1;
        let backoff = policy.backoff(retry_count);
        debug!(
            retry = retry_count,
            kind = ?kind,
            backoff_ms = backoff.as_millis() as u64,
            "Attempt failed, backing off"
        );
        tokio::time::sleep(backoff).await;

        on_retry(&RetryContext {
            retry_count,
            last_error: &error,
        });
    }
}
