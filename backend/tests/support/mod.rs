#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use trip_quality::models::{Coordinate, DateRange, TripDetail, TripId, TripRecord};
use trip_quality::services::{ComparisonJob, ProgressStore};
use trip_quality::source::{SourceError, SourceResult, TripDataSource};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Scripted trip source
// =============================================================================

/// In-memory [`TripDataSource`] answering from scripted exports and details.
///
/// Unknown ranges export no trips; unknown trips answer with HTTP 404.
#[derive(Default)]
pub struct FakeTripSource {
    exports: HashMap<DateRange, Vec<TripRecord>>,
    failing_exports: HashSet<DateRange>,
    details: HashMap<TripId, TripDetail>,
    failing_details: HashSet<TripId>,
    detail_delay: Option<Duration>,
    detail_calls: Mutex<Vec<TripId>>,
}

impl FakeTripSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export(mut self, range: DateRange, records: Vec<TripRecord>) -> Self {
        self.exports.insert(range, records);
        self
    }

    pub fn with_failing_export(mut self, range: DateRange) -> Self {
        self.failing_exports.insert(range);
        self
    }

    pub fn with_detail(mut self, trip_id: i64, detail: TripDetail) -> Self {
        self.details.insert(TripId::new(trip_id), detail);
        self
    }

    pub fn with_failing_detail(mut self, trip_id: i64) -> Self {
        self.failing_details.insert(TripId::new(trip_id));
        self
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = Some(delay);
        self
    }

    /// Trip ids whose detail was requested, in call order.
    pub fn detail_calls(&self) -> Vec<TripId> {
        self.detail_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TripDataSource for FakeTripSource {
    async fn fetch_trips(&self, range: &DateRange) -> SourceResult<Vec<TripRecord>> {
        if self.failing_exports.contains(range) {
            return Err(SourceError::Status {
                status: 503,
                url: format!("fake://export?from_date={}&to_date={}", range.start, range.end),
            });
        }
        Ok(self.exports.get(range).cloned().unwrap_or_default())
    }

    async fn fetch_trip_detail(&self, trip_id: TripId) -> SourceResult<TripDetail> {
        self.detail_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(trip_id);
        if let Some(delay) = self.detail_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_details.contains(&trip_id) {
            return Err(SourceError::transport(
                format!("fake://admin/trips/{}", trip_id),
                "connection reset",
            ));
        }
        self.details
            .get(&trip_id)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                status: 404,
                url: format!("fake://admin/trips/{}", trip_id),
            })
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn range(start: &str, end: &str) -> DateRange {
    let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
    DateRange::new(parse(start), parse(end)).unwrap()
}

pub fn record(id: i64, manual_distance: Option<f64>) -> TripRecord {
    TripRecord {
        manual_distance,
        ..TripRecord::bare(TripId::new(id))
    }
}

/// `points` fixes heading north, `step_deg` degrees of latitude apart.
pub fn straight_line(points: usize, step_deg: f64) -> Vec<Coordinate> {
    (0..points)
        .map(|i| Coordinate::new(30.0 + i as f64 * step_deg, 31.0))
        .collect()
}

/// A completed trip with a dense trace (roughly 11 m between fixes).
pub fn dense_detail(points: usize) -> TripDetail {
    TripDetail {
        status: Some("completed".to_string()),
        coordinates: straight_line(points, 0.0001),
        ..Default::default()
    }
}

/// Poll the store until the job reaches a terminal state.
pub async fn wait_for_terminal(store: &ProgressStore, job_id: &str) -> ComparisonJob {
    for _ in 0..500 {
        if let Some(job) = store.get_job(job_id) {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish in time", job_id);
}
