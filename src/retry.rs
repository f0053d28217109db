//! Retry/backoff wrapper for remote calls.
//!
//! [`call_with_retry`] is the single chokepoint through which all remote
//! calls flow: every attempt first takes a slot from the shared
//! [`RateLimiter`], throttling errors are retried with the service-suggested
//! backoff, and anything else propagates immediately. Classification is a
//! match over [`RemoteError`]; the provider module has already decided what
//! kind of failure this is.

use crate::error::{ReferatError, Result};
use crate::limiter::RateLimiter;
use crate::remote::{RemoteError, RemoteResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Extra second on top of the suggested wait, matching the safety margin the
/// limiter applies at the window edge.
const BACKOFF_MARGIN: Duration = Duration::from_secs(1);

/// Retry budget and fallback delay for one logical call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Wait used when a throttling error carries no delay hint.
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_delay: Duration::from_secs(60),
        }
    }
}

/// Invoke `call` until it succeeds, the retry budget is exhausted, a fatal
/// error occurs, or the run is cancelled.
///
/// Rate-limited errors sleep for the suggested delay (or the policy default)
/// plus a one-second margin, then retry. Both the limiter wait and the
/// backoff sleep race the cancellation token.
pub async fn call_with_retry<T, F, Fut>(
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReferatError::Cancelled),
            _ = limiter.acquire() => {}
        }

        match call().await {
            Ok(value) => return Ok(value),
            Err(RemoteError::RateLimited {
                retry_after,
                message,
            }) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    return Err(ReferatError::RetriesExhausted {
                        attempts: policy.max_retries,
                        message,
                    });
                }

                let delay = retry_after.unwrap_or(policy.default_delay) + BACKOFF_MARGIN;
                warn!(
                    "Rate limited (retry {}/{}), waiting {:.1}s",
                    attempt,
                    policy.max_retries,
                    delay.as_secs_f64()
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ReferatError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(RemoteError::Fatal(message)) => {
                return Err(ReferatError::RemoteCall(message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn throttled(retry_after: Option<Duration>) -> RemoteError {
        RemoteError::RateLimited {
            retry_after,
            message: "quota exceeded".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_throttles_then_success() {
        let limiter = RateLimiter::new(100);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = call_with_retry(&limiter, &policy, &cancel, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(throttled(Some(Duration::from_secs(5))))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Exactly two backoff sleeps of 5s + 1s margin each.
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_propagates_immediately() {
        let limiter = RateLimiter::new(100);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = call_with_retry(&limiter, &policy, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RemoteError::Fatal("bad request".into())) }
        })
        .await;

        assert!(matches!(result, Err(ReferatError::RemoteCall(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion() {
        let limiter = RateLimiter::new(100);
        let policy = RetryPolicy {
            max_retries: 2,
            default_delay: Duration::from_secs(60),
        };
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<()> = call_with_retry(&limiter, &policy, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(throttled(Some(Duration::from_secs(1)))) }
        })
        .await;

        match result {
            Err(ReferatError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {:?}", other.err()),
        }
        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_delay_when_no_hint() {
        let limiter = RateLimiter::new(100);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = call_with_retry(&limiter, &policy, &cancel, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(throttled(None))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(start.elapsed(), Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_passes_through_limiter() {
        // Cap of 1 per window: the retry cannot fire until the first call's
        // timestamp ages out, regardless of the short backoff.
        let limiter = RateLimiter::new(1);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = call_with_retry(&limiter, &policy, &cancel, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(throttled(Some(Duration::from_secs(1))))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_short_circuits() {
        let limiter = RateLimiter::new(100);
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<()> = call_with_retry(&limiter, &policy, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(matches!(result, Err(ReferatError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
