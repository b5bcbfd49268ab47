//! Create trait for new entities.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;

/// Create an entity with a `POST`; the API answers `201 Created`.
#[async_trait]
pub trait Create: Sized {
    /// Body of the create request.
    type Params: Send;

    /// Create the entity and return it as stored by the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the entity or the request fails.
    async fn create(
        client: &UpwindClient,
        params: Self::Params,
        cancel: &CancellationToken,
    ) -> Result<Self>;
}
