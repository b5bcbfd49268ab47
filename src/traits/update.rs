//! Update trait for modifying entities.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;

/// Update an existing entity with a `PATCH`.
///
/// # Example
///
/// ```ignore
/// use upwind::{ThreatDetection, ThreatDetectionUpdate, Update};
///
/// let updated = ThreatDetection::update(
///     &client,
///     "td-1".to_string(),
///     ThreatDetectionUpdate {
///         status: Some("ARCHIVED".to_string()),
///         ..Default::default()
///     },
///     &cancel,
/// ).await?;
/// ```
#[async_trait]
pub trait Update: Sized {
    /// Path identifier.
    type Id: Send;

    /// Fields to change.
    type Params: Send;

    /// Update the entity and return the updated version.
    ///
    /// # Errors
    ///
    /// [`UpwindError::NotFound`](crate::UpwindError::NotFound) for an unknown id, or any transport failure.
    async fn update(
        client: &UpwindClient,
        id: Self::Id,
        params: Self::Params,
        cancel: &CancellationToken,
    ) -> Result<Self>;
}
