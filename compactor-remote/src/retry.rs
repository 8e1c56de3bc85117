//! Exponential backoff retry for remote scorer calls.

use std::future::Future;
use std::time::Duration;

use compactor_common::{CompactionError, RemoteOptions};
use tracing::warn;

/// Retry `operation` up to `options.max_retries` times, waiting
/// `options.backoff_base_ms * 2^attempt` between attempts. Only errors for
/// which [`CompactionError::is_retryable`] returns true are retried; any
/// other error is returned immediately.
pub async fn with_retry<T, F, Fut>(adapter: &'static str, options: &RemoteOptions, mut operation: F) -> Result<T, CompactionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CompactionError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < options.max_retries => {
                let delay = Duration::from_millis(options.backoff_base_ms * 2u64.pow(attempt as u32));
                warn!(adapter, attempt, delay_ms = delay.as_millis() as u64, "retrying after remote scorer failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_immediately_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = RemoteOptions { max_retries: 3, backoff_base_ms: 1, ..Default::default() };
        let calls2 = calls.clone();
        let result: Result<u32, CompactionError> = with_retry("test", &options, || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.expect("ok"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = RemoteOptions { max_retries: 3, backoff_base_ms: 1, ..Default::default() };
        let calls2 = calls.clone();
        let result: Result<u32, CompactionError> = with_retry("test", &options, || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CompactionError::RemoteScorerError { adapter: "test", message: "transient".to_string() })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.expect("ok"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = RemoteOptions { max_retries: 2, backoff_base_ms: 1, ..Default::default() };
        let calls2 = calls.clone();
        let result: Result<u32, CompactionError> = with_retry("test", &options, || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CompactionError::RemoteScorerError { adapter: "test", message: "down".to_string() })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = RemoteOptions { max_retries: 5, backoff_base_ms: 1, ..Default::default() };
        let calls2 = calls.clone();
        let result: Result<u32, CompactionError> = with_retry("test", &options, || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CompactionError::UnknownMethod { method: "x".to_string() })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
