//! Upwind API client.
//!
//! Composes token management, rate limiting, the swappable transport and
//! the retrying executor. Resource operations are implemented via traits
//! on the model types.

use std::sync::Arc;

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{Credential, TokenManager};
use crate::config::Config;
use crate::error::{Result, UpwindError};
use crate::executor::{Executor, RequestDescriptor, RetryPolicy};
use crate::rate_limit::RateLimiter;
use crate::transport::{TransportManager, TransportSettings};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("upwind-rs/", env!("CARGO_PKG_VERSION"));

/// Upwind API client.
///
/// This struct is cheaply cloneable; clones share the token cache, the
/// rate limiter and the connection pool.
///
/// # Example
///
/// ```no_run
/// use upwind::{Config, UpwindClient};
///
/// # async fn example() -> upwind::Result<()> {
/// // From UPWIND_* environment variables
/// let client = UpwindClient::from_env()?;
///
/// // Or from an explicit configuration
/// let client = UpwindClient::new(Config {
///     client_id: "id".to_string(),
///     client_secret: "secret".to_string(),
///     organization_id: "org-123".to_string(),
///     ..Default::default()
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct UpwindClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    base_url: Url,
    tokens: Arc<TokenManager>,
    transport: Arc<TransportManager>,
    executor: Executor,
}

impl std::fmt::Debug for UpwindClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpwindClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("organization_id", &self.inner.config.organization_id)
            .finish_non_exhaustive()
    }
}

impl UpwindClient {
    /// Create a client from `UPWIND_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Create a client from a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be loaded or is invalid.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::new(Config::from_file(path)?)
    }

    /// Create a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP
    /// clients can't be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        // Ensure base URL ends with / so joins keep the version prefix
        let base = config.base_url();
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };

        let tokens = Arc::new(TokenManager::new(Credential::from_config(&config)?)?);
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_second));
        let transport = Arc::new(TransportManager::new(TransportSettings::from_config(
            &config,
        ))?);
        let executor = Executor::new(
            Arc::clone(&tokens),
            limiter,
            Arc::clone(&transport),
            config.max_concurrency,
            RetryPolicy::new(config.max_retries),
        );

        tracing::debug!(base_url = %base_url, region = %config.region, "created Upwind client");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                base_url,
                tokens,
                transport,
                executor,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn organization_id(&self) -> &str {
        &self.inner.config.organization_id
    }

    /// Default page size for paginated listings.
    pub fn page_size(&self) -> u32 {
        self.inner.config.page_size
    }

    /// Resolve `path` under `organizations/{org}/`.
    ///
    /// Path segments are used as given; escape user-supplied segments with
    /// [`urlencoding::encode`] first.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL is invalid.
    pub fn org_url(&self, path: &str) -> Result<Url> {
        let org = urlencoding::encode(&self.inner.config.organization_id);
        let path = path.trim_start_matches('/');
        let joined = if path.is_empty() {
            format!("organizations/{org}")
        } else {
            format!("organizations/{org}/{path}")
        };
        Ok(self.inner.base_url.join(&joined)?)
    }

    /// Execute a request through the retrying executor.
    ///
    /// The response is returned whatever its status.
    ///
    /// # Errors
    ///
    /// See [`Executor::execute`].
    pub async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.inner.executor.execute(descriptor, cancel).await
    }

    /// Swap in a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the new HTTP client can't be built.
    pub async fn refresh_transport(&self) -> Result<()> {
        self.inner.transport.refresh().await
    }

    /// Number of transport refreshes so far.
    pub fn transport_generation(&self) -> u64 {
        self.inner.transport.generation()
    }

    /// Drop the cached access token.
    pub async fn invalidate_token(&self) {
        self.inner.tokens.invalidate().await;
    }

    /// GET an organization-relative path and decode the JSON body.
    #[tracing::instrument(skip(self, query, cancel))]
    pub async fn get_json<T, Q>(
        &self,
        entity_type: &'static str,
        path: &str,
        query: &Q,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut url = self.org_url(path)?;
        let pairs = crate::pagination::query_pairs(query)?;
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let response = self.execute(&RequestDescriptor::get(url), cancel).await?;
        let response = expect_status(response, &[StatusCode::OK], entity_type, path).await?;
        decode(response).await
    }

    /// Send a JSON body and decode the JSON response.
    ///
    /// `expected` is the success status for the method (200 for PATCH,
    /// 201 for POST).
    #[tracing::instrument(skip(self, body, cancel))]
    pub async fn send_json<T, B>(
        &self,
        method: Method,
        entity_type: &'static str,
        path: &str,
        body: &B,
        expected: StatusCode,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.org_url(path)?;
        let descriptor = RequestDescriptor::new(method, url).with_json(body)?;

        let response = self.execute(&descriptor, cancel).await?;
        let response = expect_status(response, &[expected], entity_type, path).await?;
        decode(response).await
    }

    /// DELETE an organization-relative path, expecting 204.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete(
        &self,
        entity_type: &'static str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.org_url(path)?;
        let descriptor = RequestDescriptor::new(Method::DELETE, url);

        let response = self.execute(&descriptor, cancel).await?;
        expect_status(response, &[StatusCode::NO_CONTENT], entity_type, path).await?;
        Ok(())
    }
}

/// Pass `response` through if its status is one of `expected`, otherwise
/// convert it into the matching error.
pub(crate) async fn expect_status(
    response: Response,
    expected: &[StatusCode],
    entity_type: &'static str,
    id: &str,
) -> Result<Response> {
    let status = response.status();
    if expected.contains(&status) {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(UpwindError::NotFound {
            entity_type,
            id: id.to_string(),
        });
    }

    // Handle rate limiting
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        return Err(UpwindError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| format!("HTTP {status}"));

    if status.is_server_error() {
        Err(UpwindError::Server {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(UpwindError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
