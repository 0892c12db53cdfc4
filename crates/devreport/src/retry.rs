//! Shared retry utilities for remote API calls.
//!
//! Retries use exponential backoff with a doubling delay. The attempt count is
//! tracked so callers can report exactly how many requests were issued.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::progress::{FetchProgress, ProgressCallback, emit};

/// Initial backoff delay in milliseconds (2s, then 4s, 8s, ...).
pub const INITIAL_BACKOFF_MS: u64 = 2_000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 120_000;

/// Maximum retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Maximum number of retries (total attempts is this plus one).
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }
}

/// The last error of a retried operation and how many attempts were made.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub error: E,
}

/// Execute an operation, retrying errors accepted by `is_retryable`.
///
/// Every retry is logged at debug level and reported as
/// [`FetchProgress::RetryBackoff`] before the backoff sleep starts.
///
/// # Example
///
/// ```ignore
/// use devreport::retry::{RetryConfig, with_retry};
///
/// let result = with_retry(
///     || async { transport.send(request.clone()).await },
///     &RetryConfig::default(),
///     |e| e.is_retryable(),
///     "list/123/task",
///     None,
/// ).await;
/// ```
pub async fn with_retry<T, E, F, Fut, W>(
    mut operation: F,
    config: &RetryConfig,
    is_retryable: W,
    target: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    W: Fn(&E) -> bool,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    let result = retry_op
        .retry(config.clone().into_backoff())
        .notify(|err: &E, dur: Duration| {
            let current_attempt = attempt.load(Ordering::SeqCst);
            emit(
                on_progress,
                FetchProgress::RetryBackoff {
                    target: target.to_string(),
                    attempt: current_attempt,
                    delay_ms: dur.as_millis() as u64,
                    error: err.to_string(),
                },
            );
            tracing::debug!(
                target_path = %target,
                attempt = current_attempt,
                delay = ?dur,
                error = %err,
                "Retrying after transient failure"
            );
        })
        .when(is_retryable)
        .await;

    result.map_err(|error| RetryFailure {
        attempts: attempt.load(Ordering::SeqCst),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay, Duration::from_secs(2));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_retry_config_with_max_retries() {
        let config = RetryConfig::default().with_max_retries(7);

        assert_eq!(config.min_delay, Duration::from_secs(2));
        assert_eq!(config.max_retries, 7);
    }

    #[derive(Debug, Clone)]
    struct TestError {
        message: &'static str,
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<FetchProgress>>>) {
        let events: Arc<Mutex<Vec<FetchProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            capture
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
        });
        (callback, events)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_with_doubling_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let (callback, events) = recorder();

        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(TestError {
                        message: "unavailable",
                        transient: true,
                    })
                } else {
                    Ok(42u32)
                }
            }
        };

        let result = with_retry(
            operation,
            &RetryConfig::default(),
            |e: &TestError| e.transient,
            "list/1/task",
            Some(&callback),
        )
        .await;

        assert_eq!(result.expect("eventually succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let delays: Vec<u64> = events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter_map(|e| match e {
                FetchProgress::RetryBackoff { delay_ms, .. } => Some(*delay_ms),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![2_000, 4_000, 8_000]);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError {
                    message: "boom",
                    transient: false,
                })
            }
        };

        let failure = with_retry(
            operation,
            &RetryConfig::default(),
            |e: &TestError| e.transient,
            "user",
            None,
        )
        .await
        .expect_err("expected error");

        assert_eq!(failure.error.to_string(), "boom");
        assert_eq!(failure.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_attempt_count_when_retries_run_out() {
        let operation = || async {
            Err::<(), _>(TestError {
                message: "still down",
                transient: true,
            })
        };

        let failure = with_retry(
            operation,
            &RetryConfig::default().with_max_retries(2),
            |e: &TestError| e.transient,
            "user",
            None,
        )
        .await
        .expect_err("expected exhaustion");

        assert_eq!(failure.attempts, 3);
    }
}
