//! Fixed-delay retry for backend calls.
//!
//! Every store operation (append, read-recent, read-stats, publish) goes through
//! the same policy: up to `max_attempts` tries with a constant pause between
//! them. Only after the last attempt fails is the error surfaced.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use super::backend::BackendError;

/// Configuration for fixed-delay retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Never less than 1.
    pub max_attempts: u32,

    /// Pause between consecutive attempts.
    pub delay: Duration,
}

/// All attempts of an operation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed after {attempts} attempts: {last_error}")]
pub struct RetriesExhausted {
    /// Name of the operation, for logs and error messages.
    pub operation: &'static str,
    /// Number of attempts made.
    pub attempts: u32,
    /// The error from the final attempt.
    #[source]
    pub last_error: BackendError,
}

impl RetryPolicy {
    /// 3 attempts, 1 second apart.
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        delay: Duration::from_secs(1),
    };

    /// Single attempt, no waiting.
    pub const NO_RETRY: Self = Self {
        max_attempts: 1,
        delay: Duration::ZERO,
    };

    /// Creates a policy. `max_attempts` of 0 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `operation` until it succeeds or attempts run out.
    ///
    /// Each failed attempt is logged at warn level. There is no sleep after the
    /// final attempt.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt_fn: F,
    ) -> Result<T, RetriesExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Backend operation failed"
                    );
                    if attempt >= max_attempts {
                        return Err(RetriesExhausted {
                            operation,
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
