//! The single call that asks the backend to collect data.

use std::sync::Arc;

use async_trait::async_trait;
use solar_flares_api::{ApiClient, ApiError};
use solar_flares_flare_models::DateRange;
use solar_flares_ingestion_models::TriggerAcknowledgement;

/// Why a collection request was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    /// The backend answered 4xx. `detail` is its explanation, verbatim.
    #[error("Collection request rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },
    /// No usable answer: unreachable, timed out, or a 5xx.
    #[error("Collection service unavailable: {message}")]
    Unavailable { message: String },
}

/// Issues an asynchronous collection job for a range.
///
/// Implementations must send at most one request per call and never retry:
/// the backend has no idempotency key, so a retry could queue the job
/// twice.
#[async_trait]
pub trait IngestionTrigger: Send + Sync {
    /// Requests collection of `range`.
    ///
    /// A successful return only means the job was accepted; it says
    /// nothing about whether the job will insert anything.
    ///
    /// # Errors
    ///
    /// See [`TriggerError`].
    async fn trigger(&self, range: &DateRange) -> Result<TriggerAcknowledgement, TriggerError>;
}

#[async_trait]
impl IngestionTrigger for ApiClient {
    async fn trigger(&self, range: &DateRange) -> Result<TriggerAcknowledgement, TriggerError> {
        let started = self.start_data_collection(range).await.map_err(classify)?;
        Ok(TriggerAcknowledgement::from_status(started.status))
    }
}

#[async_trait]
impl<T: IngestionTrigger + ?Sized> IngestionTrigger for Arc<T> {
    async fn trigger(&self, range: &DateRange) -> Result<TriggerAcknowledgement, TriggerError> {
        (**self).trigger(range).await
    }
}

/// Maps an API failure onto the trigger's error categories.
#[must_use]
pub fn classify(error: ApiError) -> TriggerError {
    match error {
        ApiError::Status { status, detail } if (400..500).contains(&status) => {
            TriggerError::Rejected { status, detail }
        }
        other => TriggerError::Unavailable {
            message: other.to_string(),
        },
    }
}
