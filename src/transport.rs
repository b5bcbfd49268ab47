//! HTTP transport lifecycle.
//!
//! Very long-lived multiplexed connections can be torn down by the peer
//! mid-stream. [`TransportManager`] owns the current connection pool and
//! can swap in a fresh one at any time; requests that already captured the
//! old client keep using it until they finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::RwLock;

use crate::client::USER_AGENT;
use crate::config::Config;
use crate::error::Result;

const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Settings used every time a transport is built.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// How long idle pooled connections are kept.
    pub idle_timeout: Duration,
    /// Force HTTP/1.1.
    pub disable_http2: bool,
    /// Idle connections kept per host.
    pub max_idle_per_host: usize,
}

impl TransportSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout,
            idle_timeout: config.idle_conn_timeout,
            disable_http2: config.disable_http2,
            max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
        }
    }

    fn build(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(self.request_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host);

        if self.disable_http2 {
            builder = builder.http1_only();
        }

        Ok(builder.build()?)
    }
}

/// Owns the swappable HTTP client.
#[derive(Debug)]
pub struct TransportManager {
    settings: TransportSettings,
    current: RwLock<Client>,
    generation: AtomicU64,
}

impl TransportManager {
    /// Build the initial transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be constructed.
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let client = settings.build()?;
        if settings.disable_http2 {
            tracing::debug!("HTTP/2 disabled, using HTTP/1.1");
        }
        Ok(Self {
            settings,
            current: RwLock::new(client),
            generation: AtomicU64::new(0),
        })
    }

    /// The transport requests should use right now.
    ///
    /// The lock is only held long enough to clone the handle.
    pub async fn current(&self) -> Client {
        self.current.read().await.clone()
    }

    /// Replace the transport with a freshly built one.
    ///
    /// The new client is built before the lock is taken, so the swap
    /// itself is a pointer replacement.
    ///
    /// # Errors
    ///
    /// Returns an error if the new HTTP client can't be constructed; the
    /// old transport stays in place.
    pub async fn refresh(&self) -> Result<()> {
        let fresh = self.settings.build()?;
        *self.current.write().await = fresh;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(generation, "HTTP transport refreshed");
        Ok(())
    }

    /// Number of refreshes performed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TransportSettings {
        TransportSettings {
            request_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(5),
            disable_http2: true,
            max_idle_per_host: 2,
        }
    }

    #[tokio::test]
    async fn test_refresh_bumps_generation() {
        let manager = TransportManager::new(settings()).unwrap();
        assert_eq!(manager.generation(), 0);

        manager.refresh().await.unwrap();
        manager.refresh().await.unwrap();
        assert_eq!(manager.generation(), 2);
    }

    #[tokio::test]
    async fn test_captured_client_survives_refresh() {
        let manager = TransportManager::new(settings()).unwrap();
        let captured = manager.current().await;

        manager.refresh().await.unwrap();

        // the old handle is still a working client
        let request = captured.get("http://localhost/").build();
        assert!(request.is_ok());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            request_timeout: Duration::from_secs(12),
            idle_conn_timeout: Duration::from_secs(7),
            disable_http2: true,
            ..Default::default()
        };
        let settings = TransportSettings::from_config(&config);
        assert_eq!(settings.request_timeout, Duration::from_secs(12));
        assert_eq!(settings.idle_timeout, Duration::from_secs(7));
        assert!(settings.disable_http2);
        assert_eq!(settings.max_idle_per_host, POOL_MAX_IDLE_PER_HOST);
    }
}
