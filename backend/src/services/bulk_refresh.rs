//! Background refresh of every stored trip.
//!
//! Each stored row is turned back into an export record and refreshed through
//! [`refresh_trip`], a few at a time. Rows that already carry an analysis are
//! skipped unless the request forces an update. A failing trip is tallied and
//! the refresh carries on.

use futures::stream::{self, StreamExt};
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::comparison_job::JobError;
use super::progress_store::{ProgressStore, RefreshCounts, RefreshOutcome};
use super::trip_updater::refresh_trip;
use crate::db::repository::TripRepository;
use crate::db::services as db_services;
use crate::models::{TripMetrics, TripRecord};
use crate::source::TripDataSource;

/// Options of a bulk refresh, read from the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRefreshRequest {
    #[serde(default)]
    pub force_update: bool,
}

/// Split stored rows into records to refresh and the number skipped.
fn select_for_refresh(rows: &[TripMetrics], force_update: bool) -> (Vec<TripRecord>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in rows {
        if force_update || !row.has_analysis() {
            records.push(TripRecord::from_metrics(row));
        } else {
            skipped += 1;
        }
    }
    (records, skipped)
}

/// Refresh stored trips and record the terminal state of `job_id`.
pub async fn run_bulk_refresh(
    source: &dyn TripDataSource,
    repo: &dyn TripRepository,
    progress: &ProgressStore,
    job_id: &str,
    request: &BulkRefreshRequest,
    concurrency: usize,
) -> Result<RefreshCounts, JobError> {
    info!(
        "Bulk refresh {} started (force_update={})",
        job_id, request.force_update
    );
    match refresh_all(source, repo, progress, job_id, request, concurrency).await {
        Ok(counts) => {
            info!(
                "Bulk refresh {} completed: {} updated, {} skipped, {} failed",
                job_id, counts.updated, counts.skipped, counts.failed
            );
            progress.finish_refresh_job(job_id);
            Ok(counts)
        }
        Err(err) => {
            error!("Bulk refresh {} failed: {}", job_id, err);
            progress.fail_refresh_job(job_id, err.to_string());
            Err(err)
        }
    }
}

async fn refresh_all(
    source: &dyn TripDataSource,
    repo: &dyn TripRepository,
    progress: &ProgressStore,
    job_id: &str,
    request: &BulkRefreshRequest,
    concurrency: usize,
) -> Result<RefreshCounts, JobError> {
    let rows = db_services::list_trip_metrics(repo).await?;
    let (records, skipped) = select_for_refresh(&rows, request.force_update);

    let mut counts = RefreshCounts {
        total: rows.len(),
        ..Default::default()
    };
    progress.start_refresh(job_id, counts.total);
    for _ in 0..skipped {
        counts.record(RefreshOutcome::Skipped);
        progress.record_refresh(job_id, RefreshOutcome::Skipped);
    }

    let mut updates = stream::iter(records.into_iter().map(|record| async move {
        match refresh_trip(source, repo, &record).await {
            Ok(_) => RefreshOutcome::Updated,
            Err(err) => RefreshOutcome::Failed(err.trip_id()),
        }
    }))
    .buffer_unordered(concurrency.max(1));

    while let Some(outcome) = updates.next().await {
        counts.record(outcome);
        progress.record_refresh(job_id, outcome);
    }
    counts.failed_trip_ids.sort();
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SegmentSummary, TripId};

    fn row(id: i64, analyzed: bool) -> TripMetrics {
        let bare = TripMetrics::unanalyzed(&TripRecord::bare(TripId::new(id)));
        if !analyzed {
            return bare;
        }
        TripMetrics {
            logs_count: Some(10),
            calculated_distance: Some(0.0),
            segments: Some(SegmentSummary::default()),
            ..bare
        }
    }

    #[test]
    fn test_select_skips_analyzed_rows_unless_forced() {
        let rows = vec![row(1, true), row(2, false), row(3, true)];

        let (records, skipped) = select_for_refresh(&rows, false);
        assert_eq!(skipped, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trip_id, TripId::new(2));

        let (records, skipped) = select_for_refresh(&rows, true);
        assert_eq!(skipped, 0);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_request_defaults_to_not_forced() {
        let request: BulkRefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.force_update);
    }
}
