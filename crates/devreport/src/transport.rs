//! Rate-limited, retrying wrapper around an [`HttpTransport`].
//!
//! Every attempt takes one token from the shared limiter before it is sent.
//! Responses with status 429 or 5xx, and network failures, are retried with
//! exponential backoff; everything else is handed back to the caller as-is.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::progress::ProgressCallback;
use crate::rate_limit::{AcquireCancelled, ApiRateLimiter};
use crate::retry::{RetryConfig, with_retry};

/// Errors surfaced by [`RateLimitedTransport::send`].
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failure, timeout, or other I/O problem.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered 429.
    #[error("Rate limited by server: {body}")]
    RateLimited { body: String },

    /// The server answered with a 5xx status.
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// The cancellation signal fired while waiting for a rate limit token.
    #[error("Cancelled while waiting for rate limiter")]
    Cancelled,

    /// Every attempt failed with a retryable error.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// Whether another attempt may succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimited { .. } | Self::Server { .. }
        )
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<AcquireCancelled> for TransportError {
    fn from(_: AcquireCancelled) -> Self {
        Self::Cancelled
    }
}

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Classify a raw response into success or a retryable failure.
fn classify(response: HttpResponse) -> Result<HttpResponse, TransportError> {
    match response.status {
        429 => Err(TransportError::RateLimited {
            body: response.body_text(),
        }),
        status @ 500..=599 => Err(TransportError::Server {
            status,
            body: response.body_text(),
        }),
        _ => Ok(response),
    }
}

/// Strip scheme, host, and query from a URL for log output.
fn request_target(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split('?').next().unwrap_or(url).to_string())
}

/// An [`HttpTransport`] decorated with a shared token bucket and retries.
///
/// Clones share the limiter, the cancellation token, and the inner transport.
#[derive(Clone)]
pub struct RateLimitedTransport {
    inner: Arc<dyn HttpTransport>,
    limiter: ApiRateLimiter,
    retry: RetryConfig,
    cancel: CancellationToken,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl RateLimitedTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, limiter: ApiRateLimiter, retry: RetryConfig) -> Self {
        Self {
            inner,
            limiter,
            retry,
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Abort limiter waits when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report retry backoffs through `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_deref()
    }

    /// Send `request`, waiting for a token before each attempt.
    ///
    /// Returns any non-429, non-5xx response unchanged, including 4xx.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let target = request_target(&request.url);

        let result = with_retry(
            || {
                let request = request.clone();
                async move {
                    self.limiter.acquire(&self.cancel).await?;
                    let response = self.inner.send(request).await?;
                    classify(response)
                }
            },
            &self.retry,
            TransportError::is_retryable,
            &target,
            self.progress(),
        )
        .await;

        result.map_err(|failure| {
            if failure.error.is_retryable() {
                tracing::warn!(
                    target_path = %target,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Giving up after retries"
                );
                TransportError::RetriesExhausted {
                    attempts: failure.attempts,
                    last: Box::new(failure.error),
                }
            } else {
                failure.error
            }
        })
    }
}
