//! Service functions over any [`TripRepository`].
//!
//! These sit between the comparison job and the store: they decide whether a
//! stored row can be reused and wrap repository calls with operation context.

use std::collections::HashMap;

use super::checksum::record_fingerprint;
use super::repository::{RepositoryResult, TripRepository};
use crate::models::{TripId, TripMetrics, TripRecord};

/// Outcome of comparing an export record against the stored row.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Stored analysis is current and can be used as is.
    Hit(TripMetrics),
    /// A row exists but was computed from different export fields or lacks analysis.
    Stale(TripMetrics),
    Missing,
}

impl CacheLookup {
    /// The stored row, if any, regardless of freshness.
    pub fn stored(&self) -> Option<&TripMetrics> {
        match self {
            CacheLookup::Hit(m) | CacheLookup::Stale(m) => Some(m),
            CacheLookup::Missing => None,
        }
    }
}

/// Classify a stored row against a fresh export record.
pub fn classify_cached(record: &TripRecord, stored: Option<TripMetrics>) -> CacheLookup {
    let Some(stored) = stored else {
        return CacheLookup::Missing;
    };
    let fingerprint = record_fingerprint(record);
    let fresh = stored.source_fingerprint.as_deref() == Some(fingerprint.as_str());
    if fresh && stored.has_analysis() {
        CacheLookup::Hit(stored)
    } else {
        CacheLookup::Stale(stored)
    }
}

/// Look up every record in one batch and classify it.
///
/// Results are returned in the order of `records`.
pub async fn lookup_cache(
    repo: &dyn TripRepository,
    records: &[TripRecord],
) -> RepositoryResult<Vec<(TripRecord, CacheLookup)>> {
    let ids: Vec<TripId> = records.iter().map(|r| r.trip_id).collect();
    let mut stored: HashMap<TripId, TripMetrics> = repo
        .get_many_trip_metrics(&ids)
        .await
        .map_err(|e| e.with_operation("lookup_cache"))?
        .into_iter()
        .map(|m| (m.trip_id, m))
        .collect();

    Ok(records
        .iter()
        .map(|record| {
            let lookup = classify_cached(record, stored.remove(&record.trip_id));
            (record.clone(), lookup)
        })
        .collect())
}

/// Health check through the repository.
pub async fn health_check(repo: &dyn TripRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}

pub async fn get_trip_metrics(
    repo: &dyn TripRepository,
    trip_id: TripId,
) -> RepositoryResult<Option<TripMetrics>> {
    repo.get_trip_metrics(trip_id)
        .await
        .map_err(|e| e.with_operation("get_trip_metrics"))
}

pub async fn store_trip_metrics(
    repo: &dyn TripRepository,
    metrics: TripMetrics,
) -> RepositoryResult<()> {
    repo.upsert_trip_metrics(metrics)
        .await
        .map_err(|e| e.with_operation("store_trip_metrics"))
}

pub async fn list_trip_metrics(repo: &dyn TripRepository) -> RepositoryResult<Vec<TripMetrics>> {
    repo.list_trip_metrics()
        .await
        .map_err(|e| e.with_operation("list_trip_metrics"))
}
