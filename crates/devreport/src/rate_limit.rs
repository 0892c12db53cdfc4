//! Token-bucket rate limiting for outbound API calls.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request budget for the ClickUp API.
pub mod rate_limits {
    /// ClickUp allows 100 requests per minute per token on most plans.
    pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;
    /// Tokens available up front before pacing kicks in.
    pub const DEFAULT_BURST: u32 = 10;
}

/// Returned when the cancellation signal fires while waiting for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled while waiting for a rate limit token")]
pub struct AcquireCancelled;

/// A shared API rate limiter using the governor crate.
///
/// Cloning is cheap and every clone draws from the same bucket, so one
/// instance is built per client and handed to every worker.
///
/// # Example
///
/// ```ignore
/// use devreport::rate_limit::ApiRateLimiter;
/// use tokio_util::sync::CancellationToken;
///
/// let limiter = ApiRateLimiter::per_minute(100, 10);
/// limiter.acquire(&CancellationToken::new()).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_minute` with an initial `burst`.
    ///
    /// Zero values are clamped to 1.
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        let quota = Quota::per_minute(non_zero(requests_per_minute)).allow_burst(non_zero(burst));
        Self::from_quota(quota)
    }

    /// Create a limiter that replenishes one token every `period`.
    ///
    /// Falls back to one token per second for a zero period.
    pub fn with_period(period: Duration, burst: u32) -> Self {
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(non_zero(burst));
        Self::from_quota(quota)
    }

    pub fn from_quota(quota: Quota) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until a token is available or `cancel` fires.
    ///
    /// Waiting never spins; the task is parked until the bucket refills.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), AcquireCancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcquireCancelled),
            _ = self.inner.until_ready() => Ok(()),
        }
    }
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        Self::per_minute(
            rate_limits::DEFAULT_REQUESTS_PER_MINUTE,
            rate_limits::DEFAULT_BURST,
        )
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}
