//! Background comparison of fleet metrics between two date ranges.
//!
//! A job runs five ordered steps on one worker of the [`WorkerPool`]:
//!
//! 1. **Export**: fetch trip records for the base and comparison ranges
//! 2. **Analyze**: split trips into cache hits and trips needing fresh detail
//! 3. **Update**: fetch detail for stale or missing trips, a few at a time
//! 4. **Calculate**: aggregate metrics for each range
//! 5. **Generate**: compute deltas and attach the result
//!
//! An export failure ends the job with `error`. A detail failure for one trip
//! is logged and the trip is still counted from whatever data is available.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::bulk_refresh::{run_bulk_refresh, BulkRefreshRequest};
use super::compare::compute_deltas;
use super::metrics::compute_aggregate_metrics;
use super::progress_store::{ComparisonStep, LogLevel, ProgressStore};
use super::trip_updater::refresh_trip;
use super::worker_pool::{WorkerError, WorkerPool};
use crate::db::repository::{RepositoryError, TripRepository};
use crate::db::services::{self as db_services, CacheLookup};
use crate::models::{
    ComparisonResult, DateRange, TripId, TripMetrics, TripRecord, UpdateSummary,
};
use crate::source::{SourceError, TripDataSource};

/// Body of a comparison submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub base: DateRange,
    pub comparison: DateRange,
    #[serde(default)]
    pub force_update: bool,
}

impl ComparisonRequest {
    pub fn validate(&self) -> Result<(), String> {
        self.base.validate().map_err(|e| format!("base: {}", e))?;
        self.comparison
            .validate()
            .map_err(|e| format!("comparison: {}", e))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Export failed for {period} period ({range}): {source}")]
    Export {
        period: &'static str,
        range: DateRange,
        #[source]
        source: SourceError,
    },

    #[error("Storage failure: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of the analyze step.
#[derive(Debug, Default)]
struct CachePartition {
    /// Rows usable for aggregation without a fetch.
    ready: HashMap<TripId, TripMetrics>,
    /// Records needing a detail fetch, with the row to fall back on if it fails.
    pending: Vec<(TripRecord, TripMetrics)>,
}

/// Merge both exports into one record per trip, keeping first-seen order.
fn merge_records(base: &[TripRecord], comparison: &[TripRecord]) -> Vec<TripRecord> {
    let mut index: HashMap<TripId, usize> = HashMap::new();
    let mut merged: Vec<TripRecord> = Vec::with_capacity(base.len() + comparison.len());
    for record in base.iter().chain(comparison) {
        match index.get(&record.trip_id) {
            Some(&pos) => merged[pos] = record.clone(),
            None => {
                index.insert(record.trip_id, merged.len());
                merged.push(record.clone());
            }
        }
    }
    merged
}

/// The row to count a trip with when its detail fetch fails.
///
/// A stored analysis is kept, with export fields refreshed from the record;
/// otherwise only the export fields are used.
fn fallback_row(record: &TripRecord, stored: Option<&TripMetrics>) -> TripMetrics {
    match stored.filter(|m| m.has_analysis()) {
        Some(row) => TripMetrics {
            manual_distance: record.manual_distance,
            lack_of_accuracy: record.lack_of_accuracy || row.lack_of_accuracy,
            export_lack_of_accuracy: record.lack_of_accuracy,
            ..row.clone()
        },
        None => TripMetrics::unanalyzed(record),
    }
}

fn partition(lookups: Vec<(TripRecord, CacheLookup)>, force_update: bool) -> CachePartition {
    let mut out = CachePartition::default();
    for (record, lookup) in lookups {
        match lookup {
            CacheLookup::Hit(row) if !force_update => {
                out.ready.insert(record.trip_id, row);
            }
            other => {
                let fallback = fallback_row(&record, other.stored());
                out.pending.push((record, fallback));
            }
        }
    }
    out
}

fn rows_for(records: &[TripRecord], rows: &HashMap<TripId, TripMetrics>) -> Vec<TripMetrics> {
    records
        .iter()
        .filter_map(|r| rows.get(&r.trip_id).cloned())
        .collect()
}

/// Records a crashed job as failed in the progress store.
type FailJob = fn(&ProgressStore, &str, String) -> bool;

/// Runs comparison and bulk refresh jobs and owns their shared dependencies.
#[derive(Clone)]
pub struct ComparisonOrchestrator {
    source: Arc<dyn TripDataSource>,
    repo: Arc<dyn TripRepository>,
    progress: ProgressStore,
    pool: WorkerPool,
    detail_fetch_concurrency: usize,
}

impl ComparisonOrchestrator {
    pub fn new(
        source: Arc<dyn TripDataSource>,
        repo: Arc<dyn TripRepository>,
        progress: ProgressStore,
        pool: WorkerPool,
        detail_fetch_concurrency: usize,
    ) -> Self {
        Self {
            source,
            repo,
            progress,
            pool,
            detail_fetch_concurrency: detail_fetch_concurrency.max(1),
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn source(&self) -> &Arc<dyn TripDataSource> {
        &self.source
    }

    pub fn repository(&self) -> &Arc<dyn TripRepository> {
        &self.repo
    }

    /// Validate and queue a comparison. Returns the new job id immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: ComparisonRequest) -> Result<String, JobError> {
        request.validate().map_err(JobError::InvalidRequest)?;

        let job_id = self.progress.create_job();
        self.progress.log(
            &job_id,
            LogLevel::Info,
            format!(
                "Comparison queued: base {}, comparison {}",
                request.base, request.comparison
            ),
        );

        let this = self.clone();
        let run_id = job_id.clone();
        let handle = self
            .pool
            .submit(async move { this.run_comparison_job(&run_id, request).await });
        self.supervise(job_id.clone(), "Comparison job", handle, |store, id, msg| {
            store.fail_job(id, msg)
        });

        Ok(job_id)
    }

    /// Queue a refresh of every stored trip. Returns the new job id immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit_bulk_refresh(&self, request: BulkRefreshRequest) -> String {
        let job_id = self.progress.create_refresh_job();
        info!(
            "Bulk refresh {} queued (force_update={})",
            job_id, request.force_update
        );

        let this = self.clone();
        let run_id = job_id.clone();
        let handle = self.pool.submit(async move {
            run_bulk_refresh(
                this.source.as_ref(),
                this.repo.as_ref(),
                &this.progress,
                &run_id,
                &request,
                this.detail_fetch_concurrency,
            )
            .await
        });
        self.supervise(job_id.clone(), "Bulk refresh", handle, |store, id, msg| {
            store.fail_refresh_job(id, msg)
        });

        job_id
    }

    /// Fail `job_id` if its worker panics or is lost before recording an outcome.
    fn supervise<T: Send + 'static>(
        &self,
        job_id: String,
        label: &'static str,
        handle: JoinHandle<Result<T, WorkerError>>,
        fail: FailJob,
    ) {
        let progress = self.progress.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(worker_err)) => {
                    error!("{} {} crashed: {}", label, job_id, worker_err);
                    fail(&progress, &job_id, format!("{} crashed: {}", label, worker_err));
                }
                Err(join_err) => {
                    error!("{} {} was lost: {}", label, job_id, join_err);
                    fail(&progress, &job_id, format!("{} was lost: {}", label, join_err));
                }
            }
        });
    }

    /// Run every step of one job and record its terminal state.
    pub async fn run_comparison_job(
        &self,
        job_id: &str,
        request: ComparisonRequest,
    ) -> Result<ComparisonResult, JobError> {
        info!(
            "Comparison job {} started: base {}, comparison {}",
            job_id, request.base, request.comparison
        );
        match self.run_steps(job_id, &request).await {
            Ok(result) => {
                info!("Comparison job {} completed", job_id);
                self.progress.complete_job(job_id, result.clone());
                Ok(result)
            }
            Err(err) => {
                error!("Comparison job {} failed: {}", job_id, err);
                self.progress.fail_job(job_id, err.to_string());
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        job_id: &str,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, JobError> {
        let progress = &self.progress;

        // Step 1: export both periods
        progress.enter_step(job_id, ComparisonStep::Export, "Exporting base period trips");
        let base_records = self
            .source
            .fetch_trips(&request.base)
            .await
            .map_err(|source| JobError::Export {
                period: "base",
                range: request.base,
                source,
            })?;
        progress.log(
            job_id,
            LogLevel::Success,
            format!("✓ Exported {} trips for base period", base_records.len()),
        );
        progress.step_fraction(job_id, 0.5, None);
        progress.set_message(job_id, "Exporting comparison period trips");

        let comparison_records = self
            .source
            .fetch_trips(&request.comparison)
            .await
            .map_err(|source| JobError::Export {
                period: "comparison",
                range: request.comparison,
                source,
            })?;
        progress.log(
            job_id,
            LogLevel::Success,
            format!(
                "✓ Exported {} trips for comparison period",
                comparison_records.len()
            ),
        );
        progress.step_fraction(job_id, 1.0, None);

        // Step 2: decide which trips need fresh detail
        progress.enter_step(job_id, ComparisonStep::Analyze, "Checking stored trip data");
        let union = merge_records(&base_records, &comparison_records);
        let lookups = db_services::lookup_cache(self.repo.as_ref(), &union).await?;
        let CachePartition { mut ready, pending } = partition(lookups, request.force_update);
        let mut summary = UpdateSummary {
            total_trips: union.len(),
            cache_hits: ready.len(),
            needs_update: pending.len(),
            ..Default::default()
        };
        progress.log(
            job_id,
            LogLevel::Success,
            format!(
                "✓ {} trips cached, {} need update",
                summary.cache_hits, summary.needs_update
            ),
        );
        progress.step_fraction(job_id, 1.0, None);

        // Step 3: fetch detail for stale and missing trips
        let total = pending.len();
        progress.enter_step(
            job_id,
            ComparisonStep::Update,
            format!("Updating {} trips", total),
        );
        if total == 0 {
            progress.step_fraction(job_id, 1.0, Some("0 of 0 trips updated".to_string()));
        } else {
            let source = self.source.as_ref();
            let repo = self.repo.as_ref();
            let mut updates = stream::iter(pending.into_iter().map(|(record, fallback)| async move {
                let outcome = refresh_trip(source, repo, &record).await;
                (fallback, outcome)
            }))
            .buffer_unordered(self.detail_fetch_concurrency);

            let mut done = 0usize;
            while let Some((fallback, outcome)) = updates.next().await {
                done += 1;
                match outcome {
                    Ok(row) => {
                        summary.updated += 1;
                        ready.insert(row.trip_id, row);
                    }
                    Err(err) => {
                        summary.failed += 1;
                        summary.failed_trip_ids.push(err.trip_id());
                        progress.log(job_id, LogLevel::Warning, format!("⚠ Skipped {}", err));
                        ready.insert(fallback.trip_id, fallback);
                    }
                }
                progress.step_fraction(
                    job_id,
                    done as f64 / total as f64,
                    Some(format!("{} of {} trips updated", done, total)),
                );
            }
        }
        summary.failed_trip_ids.sort();
        progress.log(
            job_id,
            LogLevel::Success,
            format!(
                "✓ Updated {} trips, {} failed",
                summary.updated, summary.failed
            ),
        );

        // Step 4: aggregate each period
        progress.enter_step(job_id, ComparisonStep::Calculate, "Calculating base period metrics");
        let base_metrics = compute_aggregate_metrics(&rows_for(&base_records, &ready));
        progress.step_fraction(job_id, 0.5, None);
        progress.set_message(job_id, "Calculating comparison period metrics");
        let comparison_metrics = compute_aggregate_metrics(&rows_for(&comparison_records, &ready));
        progress.step_fraction(job_id, 1.0, None);
        progress.log(
            job_id,
            LogLevel::Success,
            format!(
                "✓ Aggregated {} base and {} comparison trips",
                base_metrics.total_trips, comparison_metrics.total_trips
            ),
        );

        // Step 5: deltas
        progress.enter_step(job_id, ComparisonStep::Generate, "Generating comparison");
        let deltas = compute_deltas(&base_metrics, &comparison_metrics);

        Ok(ComparisonResult {
            base_range: request.base,
            comparison_range: request.comparison,
            base: base_metrics,
            comparison: comparison_metrics,
            deltas,
            update_summary: summary,
            generated_at: Utc::now(),
        })
    }
}
