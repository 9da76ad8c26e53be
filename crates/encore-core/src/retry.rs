use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Backoff policy for remote embedding/generation calls. Part of the config
/// so deployments behind flaky networks can raise the attempt count without
/// a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Delay before the first retry; doubles on each subsequent one.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> usize {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: usize, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Run `f`, retrying transient failures with exponential backoff.
    /// Non-transient errors and the final transient failure are returned
    /// unchanged.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    // capped shift keeps the doubling from overflowing
                    let delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let attempts = AtomicUsize::new(0);
        let result = RetryPolicy::new(3, 1)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, EncoreError>(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_transient_error_no_retry() {
        let attempts = AtomicUsize::new(0);
        let result = RetryPolicy::new(3, 1)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(EncoreError::Config("bad config".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_retries_up_to_max() {
        let attempts = AtomicUsize::new(0);
        let result = RetryPolicy::new(2, 1)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(EncoreError::Embedding("HTTP 503 unavailable".into())) }
            })
            .await;
        assert!(result.is_err());
        // initial attempt + 2 retries = 3 total
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_error_succeeds_on_retry() {
        let attempts = AtomicUsize::new(0);
        let result = RetryPolicy::new(3, 1)
            .run(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err::<i32, _>(EncoreError::Embedding("HTTP 503 unavailable".into()))
                    } else {
                        Ok(99)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_fails_fast() {
        let attempts = AtomicUsize::new(0);
        let result = RetryPolicy::new(0, 1)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(EncoreError::Embedding("HTTP 503 unavailable".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay_ms, 200);
    }
}
