//! Get trait for fetching single entities.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;

/// Fetch a single entity by ID.
///
/// # Example
///
/// ```ignore
/// use upwind::{Get, UpwindClient, Workflow};
/// use tokio_util::sync::CancellationToken;
///
/// let client = UpwindClient::from_env()?;
/// let workflow = Workflow::get(&client, "wf-123".to_string(), &CancellationToken::new()).await?;
/// ```
#[async_trait]
pub trait Get: Sized {
    /// Path identifier.
    type Id: Send;

    /// Fetch the entity by ID.
    ///
    /// # Errors
    ///
    /// Returns [`UpwindError::NotFound`](crate::UpwindError::NotFound) if
    /// the entity doesn't exist, or the request error otherwise.
    async fn get(client: &UpwindClient, id: Self::Id, cancel: &CancellationToken) -> Result<Self>;
}
