//! Keyed progress state for comparison jobs and bulk refresh jobs.
//!
//! One [`ProgressStore`] is created at startup and shared by the orchestrator
//! (the only writer for a given job) and by pollers. Every mutation happens
//! under a single write lock and readers receive cloned snapshots, so a poller
//! never sees a half-applied update.
//!
//! Monotonicity is enforced here rather than trusted to callers: progress
//! never decreases, steps never move backwards, and a job in a terminal state
//! ignores further writes.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{ComparisonResult, TripId};

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Reported for ids the store has never seen. Never stored.
    NotStarted,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// The five ordered stages of a comparison job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStep {
    Export = 1,
    Analyze = 2,
    Update = 3,
    Calculate = 4,
    Generate = 5,
}

pub const TOTAL_STEPS: u8 = 5;

impl ComparisonStep {
    pub const ALL: [ComparisonStep; 5] = [
        ComparisonStep::Export,
        ComparisonStep::Analyze,
        ComparisonStep::Update,
        ComparisonStep::Calculate,
        ComparisonStep::Generate,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComparisonStep::Export => "Export",
            ComparisonStep::Analyze => "Analyze",
            ComparisonStep::Update => "Update",
            ComparisonStep::Calculate => "Calculate",
            ComparisonStep::Generate => "Generate",
        }
    }

    /// Progress range `[start, end]` owned by this step.
    pub fn band(&self) -> (f64, f64) {
        match self {
            ComparisonStep::Export => (0.0, 15.0),
            ComparisonStep::Analyze => (15.0, 30.0),
            ComparisonStep::Update => (30.0, 75.0),
            ComparisonStep::Calculate => (75.0, 90.0),
            ComparisonStep::Generate => (90.0, 100.0),
        }
    }
}

/// State of one comparison job.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonJob {
    pub job_id: String,
    pub status: JobStatus,
    pub current_step: ComparisonStep,
    pub progress: f64,
    pub message: String,
    pub sub_progress: Option<String>,
    #[serde(skip_serializing)]
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<ComparisonResult>,
}

impl ComparisonJob {
    fn queued(job_id: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            current_step: ComparisonStep::Export,
            progress: 0.0,
            message: "Queued".to_string(),
            sub_progress: None,
            logs: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        }
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    fn raise_progress(&mut self, value: f64) {
        if value.is_finite() {
            self.progress = self.progress.max(value.clamp(0.0, 100.0));
        }
    }
}

/// What happened to one trip during a bulk refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    /// Already analyzed and not forced.
    Skipped,
    Failed(TripId),
}

/// Per-trip tally of a bulk refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshCounts {
    pub total: usize,
    pub completed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failed_trip_ids: Vec<TripId>,
}

impl RefreshCounts {
    pub fn record(&mut self, outcome: RefreshOutcome) {
        self.completed += 1;
        match outcome {
            RefreshOutcome::Updated => self.updated += 1,
            RefreshOutcome::Skipped => self.skipped += 1,
            RefreshOutcome::Failed(trip_id) => {
                self.failed += 1;
                self.failed_trip_ids.push(trip_id);
            }
        }
    }

    /// Share of trips handled, 0-100. An empty refresh is complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed.min(self.total) as f64 / self.total as f64 * 100.0
        }
    }
}

/// State of one bulk refresh job.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshJob {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f64,
    pub message: String,
    pub counts: RefreshCounts,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RefreshJob {
    fn queued(job_id: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            progress: 0.0,
            message: "Queued".to_string(),
            counts: RefreshCounts::default(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// In-memory progress store.
#[derive(Clone, Default)]
pub struct ProgressStore {
    jobs: Arc<RwLock<HashMap<String, ComparisonJob>>>,
    refresh_jobs: Arc<RwLock<HashMap<String, RefreshJob>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued job and return its id.
    pub fn create_job(&self) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .write()
            .insert(job_id.clone(), ComparisonJob::queued(job_id.clone()));
        job_id
    }

    /// Apply `f` to a running job. Returns false for unknown or finished jobs.
    fn mutate<F>(&self, job_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut ComparisonJob),
    {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(job_id) {
            Some(job) if !job.status.is_terminal() => {
                f(job);
                true
            }
            _ => false,
        }
    }

    /// Move to `step`, raising progress to the start of its band.
    ///
    /// Moving to an earlier step is ignored and returns false.
    pub fn enter_step(&self, job_id: &str, step: ComparisonStep, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut applied = false;
        self.mutate(job_id, |job| {
            if step < job.current_step {
                return;
            }
            if step != job.current_step {
                job.sub_progress = None;
            }
            job.current_step = step;
            job.raise_progress(step.band().0);
            job.push_log(LogLevel::Info, format!("Step {}: {}", step.number(), message));
            job.message = message;
            applied = true;
        });
        applied
    }

    /// Set progress inside the current step's band from a completed fraction.
    pub fn step_fraction(&self, job_id: &str, fraction: f64, sub_progress: Option<String>) -> bool {
        self.mutate(job_id, |job| {
            let (start, end) = job.current_step.band();
            let fraction = if fraction.is_finite() {
                fraction.clamp(0.0, 1.0)
            } else {
                0.0
            };
            job.raise_progress(start + fraction * (end - start));
            if sub_progress.is_some() {
                job.sub_progress = sub_progress;
            }
        })
    }

    pub fn set_message(&self, job_id: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        self.mutate(job_id, |job| job.message = message)
    }

    pub fn log(&self, job_id: &str, level: LogLevel, message: impl Into<String>) -> bool {
        let message = message.into();
        self.mutate(job_id, |job| job.push_log(level, message))
    }

    pub fn complete_job(&self, job_id: &str, result: ComparisonResult) -> bool {
        self.mutate(job_id, |job| {
            job.status = JobStatus::Completed;
            job.current_step = ComparisonStep::Generate;
            job.progress = 100.0;
            job.sub_progress = None;
            job.message = "Comparison complete".to_string();
            job.completed_at = Some(Utc::now());
            job.result = Some(result);
            job.push_log(LogLevel::Success, "✓ Comparison complete".to_string());
        })
    }

    /// Mark a job failed. Progress is left where it stopped.
    pub fn fail_job(&self, job_id: &str, error_message: impl Into<String>) -> bool {
        let error_message = error_message.into();
        self.mutate(job_id, |job| {
            job.status = JobStatus::Error;
            job.completed_at = Some(Utc::now());
            job.push_log(LogLevel::Error, error_message.clone());
            job.message = error_message;
        })
    }

    pub fn get_job(&self, job_id: &str) -> Option<ComparisonJob> {
        self.jobs.read().get(job_id).cloned()
    }

    pub fn status(&self, job_id: &str) -> JobStatus {
        self.jobs
            .read()
            .get(job_id)
            .map_or(JobStatus::NotStarted, |job| job.status)
    }

    pub fn get_logs(&self, job_id: &str) -> Vec<LogEntry> {
        self.jobs
            .read()
            .get(job_id)
            .map(|job| job.logs.clone())
            .unwrap_or_default()
    }

    // -- bulk refresh jobs --

    pub fn create_refresh_job(&self) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.refresh_jobs
            .write()
            .insert(job_id.clone(), RefreshJob::queued(job_id.clone()));
        job_id
    }

    fn mutate_refresh<F>(&self, job_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut RefreshJob),
    {
        let mut jobs = self.refresh_jobs.write();
        match jobs.get_mut(job_id) {
            Some(job) if !job.status.is_terminal() => {
                f(job);
                true
            }
            _ => false,
        }
    }

    /// Record how many trips the refresh will go through.
    pub fn start_refresh(&self, job_id: &str, total: usize) -> bool {
        self.mutate_refresh(job_id, |job| {
            job.counts.total = total;
            job.message = format!("Refreshing {} trips", total);
        })
    }

    pub fn record_refresh(&self, job_id: &str, outcome: RefreshOutcome) -> bool {
        self.mutate_refresh(job_id, |job| {
            job.counts.record(outcome);
            job.progress = job.progress.max(job.counts.percent());
            job.message = format!(
                "Processed {} of {} trips",
                job.counts.completed, job.counts.total
            );
        })
    }

    pub fn finish_refresh_job(&self, job_id: &str) -> bool {
        self.mutate_refresh(job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100.0;
            job.counts.failed_trip_ids.sort();
            job.message = format!(
                "Refresh complete: {} updated, {} skipped, {} failed",
                job.counts.updated, job.counts.skipped, job.counts.failed
            );
            job.completed_at = Some(Utc::now());
        })
    }

    pub fn fail_refresh_job(&self, job_id: &str, error_message: impl Into<String>) -> bool {
        let error_message = error_message.into();
        self.mutate_refresh(job_id, |job| {
            job.status = JobStatus::Error;
            job.message = error_message;
            job.completed_at = Some(Utc::now());
        })
    }

    pub fn get_refresh_job(&self, job_id: &str) -> Option<RefreshJob> {
        self.refresh_jobs.read().get(job_id).cloned()
    }
}
