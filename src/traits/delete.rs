//! Delete trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;

/// Delete an entity; the API answers `204 No Content`.
#[async_trait]
pub trait Delete {
    /// Path identifier.
    type Id: Send;

    /// # Errors
    ///
    /// [`UpwindError::NotFound`](crate::UpwindError::NotFound) for an unknown id, or any transport failure.
    async fn delete(client: &UpwindClient, id: Self::Id, cancel: &CancellationToken)
        -> Result<()>;
}
