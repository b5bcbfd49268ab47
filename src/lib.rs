//! Upwind API client library.
//!
//! An async client for the Upwind security platform API. Each resource
//! operation (Get, List, Create, Update, Delete) is a trait that the
//! resource model types implement, and every request goes through one
//! resilient executor that handles OAuth2 tokens, client-side rate limiting,
//! retries with backoff and connection refresh.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//! use upwind::{List, UpwindClient, VulnerabilityFinding, VulnerabilityFindingQuery};
//!
//! #[tokio::main]
//! async fn main() -> upwind::Result<()> {
//!     // Create client from UPWIND_* environment variables
//!     let client = UpwindClient::from_env()?;
//!     let cancel = CancellationToken::new();
//!
//!     // Stream critical findings page by page
//!     let query = VulnerabilityFindingQuery {
//!         severity: vec!["CRITICAL".to_string()],
//!         ..Default::default()
//!     };
//!     let mut findings = VulnerabilityFinding::list(&client, &query, &cancel)?;
//!     while let Some(finding) = findings.next().await {
//!         let finding = finding?;
//!         println!("{} {}", finding.id, finding.cve().unwrap_or("-"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`UpwindClient`] composes the token manager, rate limiter, swappable
//!   transport and retrying executor.
//! - [`List`] turns any endpoint into a [`ListStream`], whatever its
//!   pagination style (cursor, offset or a single unpaged response).
//! - [`Get`], [`Create`], [`Update`] and [`Delete`] cover single-entity
//!   operations.
//!
//! # Configuration
//!
//! See [`Config::from_env`] for the `UPWIND_*` environment variables and
//! [`Config::from_file`] for the JSON file format.

mod auth;
mod client;
mod config;
mod error;
mod executor;
mod models;
mod pagination;
mod rate_limit;
mod stream;
mod traits;
mod transport;

pub mod cli;
pub mod output;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use auth::{Credential, TokenManager};
pub use client::{UpwindClient, USER_AGENT};
pub use config::{Config, Region};
pub use error::{Result, UpwindError};
pub use executor::{classify_status, Executor, RequestDescriptor, RetryPolicy, StatusClass};
pub use pagination::{
    extract_next_link, next_page, page_token_from_link, query_pairs, Endpoint, Page, PageCursor,
};
pub use rate_limit::RateLimiter;
pub use stream::{
    list_stream, ChunkStream, Collected, ErrorSignal, ItemStream, ListStream, CHUNK_CAPACITY,
    STREAM_CAPACITY,
};
pub use transport::{TransportManager, TransportSettings};

// Re-export traits
pub use traits::{Create, Delete, Get, List, Update};

// Re-export models
pub use models::*;

// Re-export output helpers
pub use output::{render_table, JsonArrayWriter, PrettyPrint, TableRow};
