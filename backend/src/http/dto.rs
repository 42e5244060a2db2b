//! Data Transfer Objects for the HTTP API.
//!
//! Domain types that already derive Serialize/Deserialize (trip metrics,
//! comparison results, insights) are returned as-is.

use serde::{Deserialize, Serialize};

pub use crate::models::{ComparisonResult, TripMetrics};
pub use crate::services::bulk_refresh::BulkRefreshRequest;
pub use crate::services::comparison_job::ComparisonRequest;
pub use crate::services::insights::FleetInsights;
pub use crate::services::progress_store::RefreshJob;
pub use crate::services::trip_listing::{TripFilter, TripPage};
use crate::services::progress_store::{ComparisonJob, JobStatus, TOTAL_STEPS};

/// Response for a queued comparison or bulk refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmitResponse {
    /// Job ID for tracking the async processing
    pub job_id: String,
    /// Message about the operation
    pub message: String,
}

/// Progress snapshot of a comparison job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    /// 1-based step number, 0 when the job is unknown
    pub current_step: u8,
    pub total_steps: u8,
    pub step_name: Option<String>,
    /// Overall progress in percent
    pub progress: f64,
    pub message: String,
    pub sub_progress: Option<String>,
    pub result: Option<ComparisonResult>,
}

impl JobStatusResponse {
    /// Response for an id the progress store has never seen.
    pub fn not_started(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::NotStarted,
            current_step: 0,
            total_steps: TOTAL_STEPS,
            step_name: None,
            progress: 0.0,
            message: "Job not found".to_string(),
            sub_progress: None,
            result: None,
        }
    }
}

impl From<ComparisonJob> for JobStatusResponse {
    fn from(job: ComparisonJob) -> Self {
        let step = job.current_step;
        Self {
            job_id: job.job_id,
            status: job.status,
            current_step: step.number(),
            total_steps: TOTAL_STEPS,
            step_name: Some(step.name().to_string()),
            progress: job.progress,
            message: job.message,
            sub_progress: job.sub_progress,
            result: job.result,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Repository backend and its health
    pub repository: String,
}
