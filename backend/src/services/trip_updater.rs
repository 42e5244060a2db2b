//! Per-trip refresh: fetch detail, analyze, store.

use chrono::Utc;
use log::{debug, warn};

use crate::algorithms::{
    analyze_segments, calculate_expected_trip_quality, calculate_trip_time,
    determine_completed_by, QualityInputs,
};
use crate::db::checksum::record_fingerprint;
use crate::db::repository::{RepositoryError, TripRepository};
use crate::db::services as db_services;
use crate::models::{TripDetail, TripId, TripMetrics, TripRecord};
use crate::source::{SourceError, TripDataSource};

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("trip {trip_id}: {source}")]
    Source {
        trip_id: TripId,
        #[source]
        source: SourceError,
    },

    #[error("trip {trip_id}: {source}")]
    Repository {
        trip_id: TripId,
        #[source]
        source: RepositoryError,
    },
}

impl UpdateError {
    pub fn trip_id(&self) -> TripId {
        match self {
            UpdateError::Source { trip_id, .. } | UpdateError::Repository { trip_id, .. } => {
                *trip_id
            }
        }
    }
}

/// Combine an export record and its fetched detail into a metrics row.
///
/// `lack_of_accuracy` is set when either the export or the detail tags say so.
pub fn build_trip_metrics(record: &TripRecord, detail: &TripDetail) -> TripMetrics {
    let segments = analyze_segments(&detail.coordinates);
    let logs_count = detail.coordinates.len();
    let lack_of_accuracy = record.lack_of_accuracy || detail.lack_of_accuracy.unwrap_or(false);
    let calculated_distance = segments.total_distance;

    let inputs = QualityInputs {
        logs_count,
        lack_of_accuracy,
        medium_segments_count: segments.medium_segments_count,
        long_segments_count: segments.long_segments_count,
        short_dist_total: segments.short_segments_distance,
        medium_dist_total: segments.medium_segments_distance,
        long_dist_total: segments.long_segments_distance,
        calculated_distance,
    };

    TripMetrics {
        trip_id: record.trip_id,
        status: detail.status.clone(),
        logs_count: Some(logs_count),
        lack_of_accuracy,
        export_lack_of_accuracy: record.lack_of_accuracy,
        manual_distance: record.manual_distance,
        calculated_distance: Some(calculated_distance),
        segments: Some(segments),
        expected_trip_quality: calculate_expected_trip_quality(&inputs),
        completed_by: determine_completed_by(&detail.activity),
        trip_time_minutes: calculate_trip_time(&detail.activity),
        source_fingerprint: Some(record_fingerprint(record)),
        updated_at: Some(Utc::now()),
    }
}

/// Fetch, analyze and store one trip.
pub async fn refresh_trip(
    source: &dyn TripDataSource,
    repo: &dyn TripRepository,
    record: &TripRecord,
) -> Result<TripMetrics, UpdateError> {
    let trip_id = record.trip_id;
    let detail = source
        .fetch_trip_detail(trip_id)
        .await
        .map_err(|source| {
            warn!("Detail fetch failed for trip {}: {}", trip_id, source);
            UpdateError::Source { trip_id, source }
        })?;

    let metrics = build_trip_metrics(record, &detail);
    debug!(
        "Trip {}: {} logs, {:.2} km, {}",
        trip_id,
        detail.coordinates.len(),
        metrics.calculated_distance.unwrap_or_default(),
        metrics.expected_trip_quality
    );

    db_services::store_trip_metrics(repo, metrics.clone())
        .await
        .map_err(|source| UpdateError::Repository { trip_id, source })?;
    Ok(metrics)
}

/// Refresh a trip outside a comparison job.
///
/// Export fields are taken from the stored row when there is one, so a
/// refresh never loses the manual distance or accuracy flag.
pub async fn refresh_trip_by_id(
    source: &dyn TripDataSource,
    repo: &dyn TripRepository,
    trip_id: TripId,
) -> Result<TripMetrics, UpdateError> {
    let stored = db_services::get_trip_metrics(repo, trip_id)
        .await
        .map_err(|source| UpdateError::Repository { trip_id, source })?;
    let record = stored
        .as_ref()
        .map(TripRecord::from_metrics)
        .unwrap_or_else(|| TripRecord::bare(trip_id));
    refresh_trip(source, repo, &record).await
}
