//! OAuth2 client-credentials token management.
//!
//! A single [`TokenManager`] is shared by every request of a client. The
//! cached token sits behind an async mutex held across the whole
//! check-refresh-store sequence, so concurrent callers never issue
//! overlapping refresh calls.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::error::{Result, UpwindError};

/// Minimum remaining lifetime for a cached token to be reused.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest lifetime trusted from `expires_in`; larger values are clamped.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Client-credentials used for the token exchange.
#[derive(Clone)]
pub struct Credential {
    client_id: String,
    client_secret: String,
    token_url: Url,
    audience: String,
}

impl Credential {
    /// Create a credential.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_url` is not a valid URL.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: &str,
        audience: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: Url::parse(token_url)?,
            audience: audience.into(),
        })
    }

    /// Build the credential described by a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured token URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.token_url(),
            config.audience(),
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url.as_str())
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

struct Token {
    access_token: String,
    expires_at: Instant,
}

impl Token {
    fn is_usable(&self, now: Instant) -> bool {
        self.expires_at.saturating_duration_since(now) > TOKEN_REFRESH_MARGIN
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds; a missing value means the token is not reusable.
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Owns the cached access token and refreshes it on demand.
pub struct TokenManager {
    credential: Credential,
    http: reqwest::Client,
    cached: Mutex<Option<Token>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for the token endpoint can't be built.
    pub fn new(credential: Credential) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::client::USER_AGENT)
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UpwindError::Auth(format!("failed to build token client: {e}")))?;

        Ok(Self {
            credential,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Return a usable access token, refreshing it if needed.
    ///
    /// A cached token is reused while it has more than
    /// [`TOKEN_REFRESH_MARGIN`] left before expiry; otherwise exactly one
    /// client-credentials exchange is performed.
    ///
    /// # Errors
    ///
    /// Returns [`UpwindError::Auth`] if the exchange fails and
    /// [`UpwindError::Cancelled`] if `cancel` fires while waiting.
    pub async fn get_token(&self, cancel: &CancellationToken) -> Result<String> {
        let mut cached = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpwindError::Cancelled),
            guard = self.cached.lock() => guard,
        };

        if let Some(token) = cached.as_ref() {
            if token.is_usable(Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        tracing::info!(client_id = %self.credential.client_id, "refreshing OAuth2 token");
        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpwindError::Cancelled),
            token = self.exchange() => token?,
        };
        tracing::debug!("token refreshed");

        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next [`get_token`](Self::get_token) refreshes.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn exchange(&self) -> Result<Token> {
        let requested_at = Instant::now();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credential.client_id.as_str()),
            ("client_secret", self.credential.client_secret.as_str()),
            ("audience", self.credential.audience.as_str()),
        ];

        let response = self
            .http
            .post(self.credential.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| UpwindError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpwindError::Auth(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            return Err(UpwindError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| UpwindError::Auth(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(parsed.expires_in.unwrap_or(0)).min(MAX_TOKEN_LIFETIME);
        let expires_at = requested_at
            .checked_add(lifetime)
            .ok_or_else(|| UpwindError::Auth(format!("token lifetime out of range: {lifetime:?}")))?;
        Ok(Token {
            access_token: parsed.access_token,
            expires_at,
        })
    }
}
