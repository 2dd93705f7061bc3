use std::future::Future;
use std::time::Duration;

use crate::error::AppResult;

/// Capped exponential backoff for calls to the rating platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A single attempt and no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
        }
    }
}

/// Runs `op` until it succeeds, fails permanently or runs out of attempts
///
/// Only errors reported as transient by `AppError::is_transient` are retried.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "{} failed, retrying",
                    what
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 500,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(80), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(quick_policy(3), "fetch", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::UpstreamStatus {
                    status: 503,
                    body: String::new(),
                })
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = with_retry(quick_policy(2), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::UpstreamStatus {
                status: 503,
                body: String::new(),
            })
        })
        .await;

        assert!(matches!(result, Err(AppError::UpstreamStatus { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = with_retry(quick_policy(5), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::InvalidInput("bad id".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_status_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = with_retry(quick_policy(5), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::UpstreamStatus {
                status: 401,
                body: "bad key".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(AppError::UpstreamStatus { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
