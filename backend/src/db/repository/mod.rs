//! Storage abstraction for per-trip metrics.

pub mod error;

use async_trait::async_trait;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use crate::models::{TripId, TripMetrics};

/// Keyed store of [`TripMetrics`] rows.
///
/// Implementations must be `Send + Sync`; the comparison job shares one
/// instance across concurrent detail fetches.
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Fetch the stored row for one trip, if any.
    async fn get_trip_metrics(&self, trip_id: TripId) -> RepositoryResult<Option<TripMetrics>>;

    /// Fetch stored rows for many trips at once. Missing ids are omitted.
    async fn get_many_trip_metrics(
        &self,
        trip_ids: &[TripId],
    ) -> RepositoryResult<Vec<TripMetrics>>;

    /// Insert or replace the row for `metrics.trip_id`.
    async fn upsert_trip_metrics(&self, metrics: TripMetrics) -> RepositoryResult<()>;

    /// Every stored row, ordered by trip id.
    async fn list_trip_metrics(&self) -> RepositoryResult<Vec<TripMetrics>>;

    /// Short name shown by the health endpoint.
    fn backend_name(&self) -> &'static str;
}
