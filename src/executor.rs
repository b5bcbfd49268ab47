//! Resilient request execution.
//!
//! [`Executor::execute`] runs one logical request: per attempt it takes a
//! rate-limiter slot, obtains a token, sends the request on the current
//! transport, and classifies the outcome. Transport errors, 401, 429 and
//! 5xx responses are retried with deterministic exponential backoff until
//! the attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::TokenManager;
use crate::error::{Result, UpwindError};
use crate::rate_limit::RateLimiter;
use crate::transport::TransportManager;

const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(100);

/// An immutable description of one HTTP request.
///
/// The executor builds a new request from it on every attempt, so retries
/// never observe headers added by an earlier attempt.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Attach a JSON body and the matching content type.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` can't be serialized.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }
}

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles each attempt.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }

    /// Server-directed delay from a `Retry-After` header given in seconds.
    pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
        let secs: f64 = value.parse().ok()?;
        // negative, NaN and out-of-range values fall back to backoff
        Duration::try_from_secs_f64(secs).ok()
    }
}

/// How a response status is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Unauthorized,
    RateLimited,
    ServerError,
    NotFound,
    ClientError,
}

impl StatusClass {
    /// Whether the executor retries this class (budget permitting).
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            StatusClass::Unauthorized | StatusClass::RateLimited | StatusClass::ServerError
        )
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: StatusCode) -> StatusClass {
    match status {
        s if s.is_success() => StatusClass::Success,
        StatusCode::UNAUTHORIZED => StatusClass::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => StatusClass::RateLimited,
        StatusCode::NOT_FOUND => StatusClass::NotFound,
        s if s.is_server_error() => StatusClass::ServerError,
        _ => StatusClass::ClientError,
    }
}

/// Sleep for `delay` unless cancelled first.
pub(crate) async fn sleep_cancellable(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(UpwindError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Executes requests with rate limiting, authentication and retries.
#[derive(Debug, Clone)]
pub struct Executor {
    tokens: Arc<TokenManager>,
    limiter: Arc<RateLimiter>,
    transport: Arc<TransportManager>,
    in_flight: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl Executor {
    pub fn new(
        tokens: Arc<TokenManager>,
        limiter: Arc<RateLimiter>,
        transport: Arc<TransportManager>,
        max_concurrency: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            tokens,
            limiter,
            transport,
            in_flight: Arc::new(Semaphore::new(max_concurrency.max(1))),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }

    /// Execute one logical request.
    ///
    /// Makes at most `max_retries + 1` attempts. The final response is
    /// returned whatever its status, so callers inspect the status code.
    ///
    /// # Errors
    ///
    /// - [`UpwindError::Auth`] if no token can be obtained (not retried).
    /// - [`UpwindError::Transport`] if the last attempt failed at the network level.
    /// - [`UpwindError::Cancelled`] if `cancel` fires at any suspension point.
    #[tracing::instrument(skip_all, fields(method = %descriptor.method, url = %descriptor.url))]
    pub async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let is_last = attempt + 1 >= max_attempts;

            self.limiter.acquire(cancel).await?;
            let token = self.tokens.get_token(cancel).await?;

            tracing::debug!(attempt = attempt + 1, max_attempts, "sending request");
            let outcome = self.send(descriptor, &token, cancel).await?;

            let backoff = self.policy.backoff(attempt);
            let delay = match outcome {
                Err(err) => {
                    if is_last {
                        return Err(UpwindError::Transport(err));
                    }
                    tracing::warn!(error = %err, attempt = attempt + 1, "request failed, retrying");
                    backoff
                }
                Ok(response) => {
                    let status = response.status();
                    match classify_status(status) {
                        StatusClass::Unauthorized if !is_last => {
                            tracing::warn!("received 401, invalidating token and retrying");
                            self.tokens.invalidate().await;
                            backoff
                        }
                        StatusClass::RateLimited if !is_last => {
                            let delay =
                                RetryPolicy::retry_after(response.headers()).unwrap_or(backoff);
                            tracing::warn!(?delay, "rate limited (429), waiting before retry");
                            delay
                        }
                        StatusClass::ServerError if !is_last => {
                            tracing::warn!(status = status.as_u16(), "server error, retrying");
                            backoff
                        }
                        _ => return Ok(response),
                    }
                }
            };

            sleep_cancellable(delay, cancel).await?;
            attempt += 1;
        }
    }

    /// Send one attempt. The outer `Result` carries cancellation, the
    /// inner one the transport outcome.
    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<Response, reqwest::Error>> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpwindError::Cancelled),
            permit = self.in_flight.acquire() => permit.map_err(|_| {
                UpwindError::Config("in-flight request limit is closed".to_string())
            })?,
        };

        let http = self.transport.current().await;
        let mut request = http
            .request(descriptor.method.clone(), descriptor.url.clone())
            .headers(descriptor.headers.clone())
            .bearer_auth(token)
            .header(USER_AGENT, crate::client::USER_AGENT)
            .header(ACCEPT, "application/json");
        if let Some(body) = &descriptor.body {
            request = request.body(body.clone());
        }

        Ok(tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpwindError::Cancelled),
            result = request.send() => result,
        })
    }
}
