//! Retry Harness (`spec.md` §4.4): retries a fallible operation up to ten
//! times (eleven attempts total), sleeping `2^(k-1)` seconds before retry
//! `k`, capped at thirty seconds, and gives up immediately on a
//! non-retryable [`SrctlError`] or on cancellation.

use srctl_core::SrctlError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const MAX_RETRIES: u32 = 10;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Runs `op` until it succeeds, returns a non-retryable error, exhausts its
/// retry budget, or `cancel` fires. `op` is called fresh on every attempt —
/// callers typically close over cloned `Arc`s in a non-`move` closure that
/// builds a new future each time it is invoked.
pub async fn with_retry<F, Fut>(mut op: F, cancel: &CancellationToken) -> Result<(), SrctlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), SrctlError>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(SrctlError::Cancelled);
        }

        match op().await {
            Ok(()) => {
                if attempt > 0 {
                    info!(attempt, "apply succeeded after retry");
                }
                return Ok(());
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    warn!(attempt, error = %e, "apply failed, retry budget exhausted");
                    return Err(e);
                }

                let backoff = Duration::from_secs(1u64 << attempt).min(MAX_BACKOFF);
                warn!(
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    error = %e,
                    "apply failed, retrying"
                );
                attempt += 1;

                tokio::select! {
                    _ = cancel.cancelled() => return Err(SrctlError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srctl_core::ClientErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let result = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
            &cancel,
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let calls2 = Arc::clone(&calls);
        let result = with_retry(
            move || {
                let n = calls2.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(SrctlError::Transient("boom".to_string()))
                    } else {
                        Ok(())
                    }
                }
            },
            &cancel,
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let calls2 = Arc::clone(&calls);
        let result = with_retry(
            move || {
                calls2.fetch_add(1, Ordering::SeqCst);
                async { Err(SrctlError::ClientError(ClientErrorKind::BadRequest, "nope".to_string())) }
            },
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(SrctlError::ClientError(ClientErrorKind::BadRequest, _))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_at_eleven_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let calls2 = Arc::clone(&calls);
        let result = with_retry(
            move || {
                calls2.fetch_add(1, Ordering::SeqCst);
                async { Err(SrctlError::Transient("always".to_string())) }
            },
            &cancel,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_aborts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let calls2 = Arc::clone(&calls);
        let cancel2 = cancel.clone();
        let handle = tokio::spawn(async move {
            with_retry(
                move || {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    async { Err(SrctlError::Transient("boom".to_string())) }
                },
                &cancel2,
            )
            .await
        });
        tokio::task::yield_now().await;
        cancel.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SrctlError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
