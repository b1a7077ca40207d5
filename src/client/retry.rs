use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::FetchError;

/// Exponential backoff for transient upstream failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1000, multiplier: 2 }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = (self.multiplier.max(1) as u64).saturating_pow(retry);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The returned error records the retries used.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut retries = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || retries + 1 >= max_attempts {
                    return Err(err.with_retries(retries));
                }
                let delay = policy.delay_for(retries);
                warn!(
                    endpoint = %err.endpoint,
                    status = ?err.status,
                    attempt = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy { max_attempts: 3, base_delay_ms: 1, multiplier: 2 }
    }

    #[test]
    fn test_delay_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::from_secs(1));
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FetchError::from_status(503, "/x", "busy"))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_reports_retries() {
        let err = retry_with_backoff(&fast(), || async {
            Err::<(), _>(FetchError::new(FetchErrorKind::Offline, "/x", "down"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.retries, 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = retry_with_backoff(&fast(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(FetchError::from_status(404, "/x", "missing"))
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.retries, 0);
        assert_eq!(err.status, Some(404));
    }
}
