//! Retry of transient fetch failures.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use tokio_retry::RetryIf;

use crate::config::RetryPolicy;
use crate::error_handling::LoaderError;

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up.
///
/// Only transient failures (`LoaderError::is_transient`) are retried, after
/// the delays from `RetryPolicy::delays`. When every attempt failed
/// transiently the result is `RetryBudgetExhausted` carrying the last error;
/// permanent failures are returned as they are.
pub async fn retry_transient<T, F, Fut>(
    url: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, LoaderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LoaderError>>,
{
    if policy.attempts == 0 {
        return Err(LoaderError::RetryBudgetExhausted {
            url: url.to_string(),
            attempts: 0,
            source: None,
        });
    }

    let attempts = AtomicUsize::new(0);
    let result = RetryIf::start(
        policy.delays(),
        || {
            attempts.fetch_add(1, Ordering::Relaxed);
            operation()
        },
        |e: &LoaderError| {
            let retry = e.is_transient() && attempts.load(Ordering::Relaxed) < policy.attempts;
            if retry {
                warn!(
                    "Attempt {}/{} for {url} failed, retrying: {e}",
                    attempts.load(Ordering::Relaxed),
                    policy.attempts
                );
            }
            retry
        },
    )
    .await;

    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_transient() => Err(LoaderError::RetryBudgetExhausted {
            url: url.to_string(),
            attempts: attempts.load(Ordering::Relaxed),
            source: Some(Box::new(e)),
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn instant_policy(attempts: usize) -> RetryPolicy {
        RetryPolicy {
            attempts,
            cooldown: Duration::ZERO,
            backoff: 1.5,
        }
    }

    fn connection_error() -> LoaderError {
        LoaderError::Connection {
            url: "http://example.com".to_string(),
            source: "connection refused".into(),
        }
    }

    #[tokio::test]
    async fn test_always_transient_uses_exact_budget() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient("http://example.com", &instant_policy(3), || {
            calls.set(calls.get() + 1);
            async { Err(connection_error()) }
        })
        .await;

        assert_eq!(calls.get(), 3);
        match result {
            Err(LoaderError::RetryBudgetExhausted {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(source.as_deref(), Some(LoaderError::Connection { .. })));
            }
            other => panic!("expected RetryBudgetExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient("http://example.com", &instant_policy(3), || {
            calls.set(calls.get() + 1);
            async {
                Err(LoaderError::EmptyResponse {
                    url: "http://example.com".to_string(),
                })
            }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(LoaderError::EmptyResponse { .. })));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = Cell::new(0);
        let result = retry_transient("http://example.com", &instant_policy(3), || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt < 2 {
                    Err(connection_error())
                } else {
                    Ok("body")
                }
            }
        })
        .await;

        assert_eq!(calls.get(), 2);
        assert_eq!(result.unwrap(), "body");
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient("http://example.com", &instant_policy(0), || {
            calls.set(calls.get() + 1);
            async { Ok(()) }
        })
        .await;

        assert_eq!(calls.get(), 0);
        assert!(matches!(
            result,
            Err(LoaderError::RetryBudgetExhausted {
                attempts: 0,
                source: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_single_attempt_budget() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient("http://example.com", &instant_policy(1), || {
            calls.set(calls.get() + 1);
            async { Err(connection_error()) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(
            result,
            Err(LoaderError::RetryBudgetExhausted { attempts: 1, .. })
        ));
    }
}
