//! Client configuration.
//!
//! Configuration is a plain value: the client consumes it but never
//! re-reads files or the environment after construction.

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpwindError};

const DEFAULT_TOKEN_URL: &str = "https://auth.upwind.io/oauth/token";
const MAX_PAGE_SIZE: u32 = 10_000;

/// Deployment region of the Upwind API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    Us,
    Eu,
    Me,
}

impl Region {
    /// Default API base URL for the region.
    pub fn base_url(self) -> &'static str {
        match self {
            Region::Us => "https://api.upwind.io/v1",
            Region::Eu => "https://api.eu.upwind.io/v1",
            Region::Me => "https://api.me.upwind.io/v1",
        }
    }

    /// Default OAuth2 audience for the region.
    pub fn audience(self) -> &'static str {
        match self {
            Region::Us => "https://api.upwind.io",
            Region::Eu => "https://api.eu.upwind.io",
            Region::Me => "https://api.me.upwind.io",
        }
    }
}

impl FromStr for Region {
    type Err = UpwindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Region::Us),
            "EU" => Ok(Region::Eu),
            "ME" => Ok(Region::Me),
            other => Err(UpwindError::Config(format!(
                "invalid region: {other} (must be US, EU, or ME)"
            ))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Us => "US",
            Region::Eu => "EU",
            Region::Me => "ME",
        };
        f.write_str(name)
    }
}

/// Configuration for [`UpwindClient`](crate::UpwindClient).
///
/// Construct it with [`Config::from_env`], [`Config::from_file`], or by
/// starting from `Config::default()` and filling in the credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Upwind organization ID.
    pub organization_id: String,
    /// API region.
    pub region: Region,
    /// Base URL override (defaults to the region's URL).
    pub base_url: Option<String>,
    /// Token endpoint override.
    pub token_url: Option<String>,
    /// Audience override (defaults to the region's audience).
    pub audience: Option<String>,
    /// Retries after the first attempt of a request.
    pub max_retries: u32,
    /// Maximum number of requests in flight at once.
    pub max_concurrency: usize,
    /// Default page size for paginated requests.
    pub page_size: u32,
    /// Requests per second ceiling (0 = no limit).
    pub rate_limit_per_second: u32,
    /// Timeout for a single HTTP attempt.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// How long idle pooled connections are kept open.
    #[serde(with = "duration_secs")]
    pub idle_conn_timeout: Duration,
    /// Force HTTP/1.1.
    pub disable_http2: bool,
    /// Pages fetched by one stream before the transport is recycled (0 = never).
    pub connection_refresh_pages: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            organization_id: String::new(),
            region: Region::Us,
            base_url: None,
            token_url: None,
            audience: None,
            max_retries: 3,
            max_concurrency: 10,
            page_size: 100,
            rate_limit_per_second: 10,
            request_timeout: Duration::from_secs(30),
            // Shorter than the usual 90s so stale multiplexed connections are dropped early.
            idle_conn_timeout: Duration::from_secs(30),
            disable_http2: false,
            connection_refresh_pages: 100,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("organization_id", &self.organization_id)
            .field("region", &self.region)
            .field("base_url", &self.base_url())
            .field("token_url", &self.token_url())
            .field("max_retries", &self.max_retries)
            .field("max_concurrency", &self.max_concurrency)
            .field("page_size", &self.page_size)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("request_timeout", &self.request_timeout)
            .field("idle_conn_timeout", &self.idle_conn_timeout)
            .field("disable_http2", &self.disable_http2)
            .field("connection_refresh_pages", &self.connection_refresh_pages)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from `UPWIND_*` environment variables.
    ///
    /// Unset variables keep their defaults. Numeric variables that fail to
    /// parse are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a JSON file, starting from defaults.
    ///
    /// Durations are given in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, isn't valid JSON, or
    /// describes an invalid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = var("UPWIND_CLIENT_ID") {
            config.client_id = v;
        }
        if let Some(v) = var("UPWIND_CLIENT_SECRET") {
            config.client_secret = v;
        }
        if let Some(v) = var("UPWIND_ORGANIZATION_ID") {
            config.organization_id = v;
        }
        if let Some(v) = var("UPWIND_REGION") {
            config.region = v.parse()?;
        }
        config.base_url = var("UPWIND_BASE_URL").or(config.base_url);
        config.token_url = var("UPWIND_TOKEN_URL").or(config.token_url);
        config.audience = var("UPWIND_AUDIENCE").or(config.audience);

        if let Some(n) = var("UPWIND_MAX_RETRIES").and_then(|v| v.trim().parse().ok()) {
            config.max_retries = n;
        }
        if let Some(n) = var("UPWIND_MAX_CONCURRENCY").and_then(|v| v.trim().parse().ok()) {
            config.max_concurrency = n;
        }
        if let Some(n) = var("UPWIND_PAGE_SIZE").and_then(|v| v.trim().parse().ok()) {
            config.page_size = n;
        }
        if let Some(n) = var("UPWIND_RATE_LIMIT").and_then(|v| v.trim().parse().ok()) {
            config.rate_limit_per_second = n;
        }
        if let Some(secs) = var("UPWIND_REQUEST_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = var("UPWIND_IDLE_CONN_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            config.idle_conn_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = var("UPWIND_DISABLE_HTTP2") {
            config.disable_http2 = v.eq_ignore_ascii_case("true");
        }
        if let Some(n) =
            var("UPWIND_CONNECTION_REFRESH_PAGES").and_then(|v| v.trim().parse().ok())
        {
            config.connection_refresh_pages = n;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to build a client.
    ///
    /// # Errors
    ///
    /// Returns [`UpwindError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(UpwindError::Config("client_id is required".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(UpwindError::Config("client_secret is required".to_string()));
        }
        if self.organization_id.is_empty() {
            return Err(UpwindError::Config("organization_id is required".to_string()));
        }
        if self.max_concurrency < 1 {
            return Err(UpwindError::Config("max_concurrency must be >= 1".to_string()));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(UpwindError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    /// API base URL: the override if set, otherwise the region default.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.region.base_url())
    }

    /// OAuth2 token endpoint.
    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    /// OAuth2 audience parameter.
    pub fn audience(&self) -> &str {
        self.audience
            .as_deref()
            .unwrap_or_else(|| self.region.audience())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> Config {
        Config {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            organization_id: "org".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.region, Region::Us);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.rate_limit_per_second, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_conn_timeout, Duration::from_secs(30));
        assert!(!config.disable_http2);
        assert_eq!(config.connection_refresh_pages, 100);
    }

    #[test]
    fn test_validate_requires_credentials() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.client_id.clear();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.client_secret.clear();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.organization_id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = valid();
        config.page_size = 0;
        assert!(config.validate().is_err());
        config.page_size = 10_001;
        assert!(config.validate().is_err());
        config.page_size = 10_000;
        assert!(config.validate().is_ok());

        config.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_region_urls() {
        let mut config = valid();
        assert_eq!(config.base_url(), "https://api.upwind.io/v1");
        assert_eq!(config.audience(), "https://api.upwind.io");

        config.region = Region::Eu;
        assert_eq!(config.base_url(), "https://api.eu.upwind.io/v1");
        assert_eq!(config.audience(), "https://api.eu.upwind.io");

        config.region = Region::Me;
        assert_eq!(config.base_url(), "https://api.me.upwind.io/v1");
        assert_eq!(config.token_url(), "https://auth.upwind.io/oauth/token");

        config.base_url = Some("http://localhost:9000/v1".to_string());
        config.token_url = Some("http://localhost:9000/token".to_string());
        assert_eq!(config.base_url(), "http://localhost:9000/v1");
        assert_eq!(config.token_url(), "http://localhost:9000/token");
        // audience still follows the region
        assert_eq!(config.audience(), "https://api.me.upwind.io");
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("UPWIND_CLIENT_ID", "id"),
            ("UPWIND_CLIENT_SECRET", "secret"),
            ("UPWIND_ORGANIZATION_ID", "org-1"),
            ("UPWIND_REGION", "eu"),
            ("UPWIND_MAX_RETRIES", "5"),
            ("UPWIND_PAGE_SIZE", "not-a-number"),
            ("UPWIND_REQUEST_TIMEOUT", "60"),
            ("UPWIND_DISABLE_HTTP2", "TRUE"),
            ("UPWIND_CONNECTION_REFRESH_PAGES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.client_id, "id");
        assert_eq!(config.organization_id, "org-1");
        assert_eq!(config.region, Region::Eu);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.disable_http2);
        assert_eq!(config.connection_refresh_pages, 0);
    }

    #[test]
    fn test_from_lookup_rejects_unknown_region() {
        let result = Config::from_lookup(lookup(&[
            ("UPWIND_CLIENT_ID", "id"),
            ("UPWIND_CLIENT_SECRET", "secret"),
            ("UPWIND_ORGANIZATION_ID", "org-1"),
            ("UPWIND_REGION", "APAC"),
        ]));
        assert!(matches!(result, Err(UpwindError::Config(_))));
    }

    #[test]
    fn test_deserialize_file_format() {
        let config: Config = serde_json::from_str(
            r#"{
                "client_id": "id",
                "client_secret": "secret",
                "organization_id": "org",
                "region": "ME",
                "request_timeout": 10,
                "rate_limit_per_second": 0
            }"#,
        )
        .unwrap();

        assert_eq!(config.region, Region::Me);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit_per_second, 0);
        // untouched fields keep defaults
        assert_eq!(config.page_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", valid());
        assert!(debug.contains("client"));
        assert!(!debug.contains("secret"));
    }
}
