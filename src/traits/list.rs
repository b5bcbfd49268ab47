//! List trait for streaming collections of entities.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::pagination::{next_page, Endpoint, Page, PageCursor};
use crate::stream::{list_stream, ListStream};

/// List/filter entities.
///
/// Implementors only describe the endpoint and the first cursor; paging,
/// retries and buffering are shared. Every listing is a stream, even for
/// endpoints that return everything in one response.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use upwind::{List, UpwindClient, VulnerabilityFinding};
///
/// let client = UpwindClient::from_env()?;
/// let mut findings = VulnerabilityFinding::list(&client, &Default::default(), &cancel)?;
/// while let Some(finding) = findings.next().await {
///     println!("{}", finding?.id);
/// }
/// ```
#[async_trait]
pub trait List: DeserializeOwned + Send + Sized + 'static {
    /// Filter parameters.
    type Query: Default + Send + Sync;

    /// Endpoint and first page cursor for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query can't be turned into parameters.
    fn endpoint(client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)>;

    /// Stream every entity matching the query.
    ///
    /// Must be called inside a Tokio runtime; the pages are fetched by a
    /// background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint can't be built. Request errors are
    /// delivered through the stream.
    fn list(
        client: &UpwindClient,
        query: &Self::Query,
        cancel: &CancellationToken,
    ) -> Result<ListStream<Self>> {
        let (endpoint, first) = Self::endpoint(client, query)?;
        Ok(list_stream(client.clone(), endpoint, first, cancel))
    }

    /// Fetch a single page.
    ///
    /// Pass `None` for the first page, then the previous page's `next`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_page(
        client: &UpwindClient,
        query: &Self::Query,
        cursor: Option<PageCursor>,
        cancel: &CancellationToken,
    ) -> Result<Page<Self>> {
        let (endpoint, first) = Self::endpoint(client, query)?;
        let cursor = cursor.unwrap_or(first);
        next_page(client, &endpoint, &cursor, cancel).await
    }

    /// Fetch every entity into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error; items fetched before it are discarded.
    async fn list_all(
        client: &UpwindClient,
        query: &Self::Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<Self>> {
        Self::list(client, query, cancel)?
            .collect_all()
            .await
            .into_result()
    }
}
