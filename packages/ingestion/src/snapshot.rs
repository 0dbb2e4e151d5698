//! Point-in-time record counts.

use std::sync::Arc;

use async_trait::async_trait;
use solar_flares_api::{ApiClient, ApiError};
use solar_flares_flare_models::{DateRange, FlareRecord};
use solar_flares_ingestion_models::Snapshot;

/// A snapshot read that failed in a way a later attempt may not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("Transient read failure: {message}")]
    TransientReadFailure { message: String },
}

/// Reads the current cardinality of the record store.
///
/// Implementations must be read-only and safe to call repeatedly and
/// concurrently.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Counts the records visible now, restricted to `range` when given.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::TransientReadFailure`] if the store could
    /// not be read. An empty store is `Snapshot { count: 0 }`, not an
    /// error.
    async fn read_snapshot(&self, range: Option<&DateRange>) -> Result<Snapshot, SnapshotError>;
}

#[async_trait]
impl SnapshotReader for ApiClient {
    async fn read_snapshot(&self, range: Option<&DateRange>) -> Result<Snapshot, SnapshotError> {
        snapshot_from_listing(self.list_flares_once(range).await)
    }
}

#[async_trait]
impl<S: SnapshotReader + ?Sized> SnapshotReader for Arc<S> {
    async fn read_snapshot(&self, range: Option<&DateRange>) -> Result<Snapshot, SnapshotError> {
        (**self).read_snapshot(range).await
    }
}

/// Counts a listing response. A 404 means no rows.
///
/// # Errors
///
/// Any other API failure becomes [`SnapshotError::TransientReadFailure`].
pub fn snapshot_from_listing(
    listing: Result<Vec<FlareRecord>, ApiError>,
) -> Result<Snapshot, SnapshotError> {
    match listing {
        Ok(records) => Ok(Snapshot::new(
            u64::try_from(records.len()).unwrap_or(u64::MAX),
        )),
        Err(e) if e.is_not_found() => Ok(Snapshot::default()),
        Err(e) => Err(SnapshotError::TransientReadFailure {
            message: e.to_string(),
        }),
    }
}
