//! Client-wide request rate limiting.

use std::fmt;
use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, UpwindError};

/// Token-bucket gate shared by every request of a client.
///
/// The bucket refills at `rate` permits per second with a burst equal to
/// `rate`. A rate of zero disables limiting entirely.
pub struct RateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
    rate: u32,
}

impl RateLimiter {
    /// Create a limiter allowing `per_second` requests per second.
    pub fn new(per_second: u32) -> Self {
        let limiter = NonZeroU32::new(per_second)
            .map(|rate| governor::RateLimiter::direct(Quota::per_second(rate)));
        Self {
            limiter,
            rate: per_second,
        }
    }

    /// A limiter that never waits.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured requests per second (0 when disabled).
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Wait until a request slot is available.
    ///
    /// # Errors
    ///
    /// Returns [`UpwindError::Cancelled`] as soon as `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UpwindError::Cancelled),
            _ = limiter.until_ready() => Ok(()),
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
