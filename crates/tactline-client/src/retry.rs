//! Retry policy with exponential backoff

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Bounded exponential backoff for transient transport failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any delay
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Read `TACTLINE_MAX_RETRIES` and `TACTLINE_RETRY_BACKOFF_MS`
    ///
    /// Missing or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("TACTLINE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            initial_backoff: std::env::var("TACTLINE_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.initial_backoff, Duration::from_millis),
            ..defaults
        }
    }

    /// Delay before retry number `retry` (zero based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(64) as i32);
        Duration::from_secs_f64(
            (self.initial_backoff.as_secs_f64() * factor).min(self.max_backoff.as_secs_f64()),
        )
    }

    /// Run `f` until it succeeds, fails permanently or retries run out
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.should_retry() || attempt >= self.max_attempts => {
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    tracing::warn!("Attempt {} failed: {}, retrying in {:?}", attempt, e, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_backoff_growth_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(20), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TransportError::Status {
                            status: 503,
                            path: "config/aa/bb/x".to_string(),
                        })
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_on_permanent_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TransportError::NotFound("data/aa/bb/x".to_string()))
                }
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bounded_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast(2)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TransportError::Status {
                        status: 500,
                        path: String::new(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
