//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use super::dto::{
    BulkRefreshRequest, ComparisonRequest, FleetInsights, HealthResponse, JobStatusResponse,
    JobSubmitResponse, RefreshJob, TripFilter, TripMetrics, TripPage,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::models::TripId;
use crate::services::{compute_fleet_insights, filter_trips, refresh_trip_by_id};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

const LOG_POLL_INTERVAL: Duration = Duration::from_millis(200);

fn trip_id_from_path(raw: i64) -> Result<TripId, AppError> {
    if raw <= 0 {
        return Err(AppError::BadRequest(format!(
            "trip_id must be positive, got {}",
            raw
        )));
    }
    Ok(TripId::new(raw))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let repo = state.repository();
    let repo_status = match db_services::health_check(repo.as_ref()).await {
        Ok(true) => format!("{}: ok", repo.backend_name()),
        Ok(false) => format!("{}: unavailable", repo.backend_name()),
        Err(e) => format!("{}: error: {}", repo.backend_name(), e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository: repo_status,
    }))
}

// =============================================================================
// Comparisons
// =============================================================================

/// POST /v1/comparisons
///
/// Queue a comparison between two date ranges. Returns a job ID for tracking progress.
pub async fn submit_comparison(
    State(state): State<AppState>,
    Json(request): Json<ComparisonRequest>,
) -> Result<(StatusCode, Json<JobSubmitResponse>), AppError> {
    let job_id = state.orchestrator.submit(request)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobSubmitResponse {
            message: format!(
                "Comparison started. Track progress at /v1/jobs/{}/logs",
                job_id
            ),
            job_id,
        }),
    ))
}

/// POST /v1/refresh-jobs?force_update=true
///
/// Queue a refresh of every stored trip. Without `force_update`, trips that
/// already carry an analysis are skipped.
pub async fn submit_bulk_refresh(
    State(state): State<AppState>,
    Query(request): Query<BulkRefreshRequest>,
) -> (StatusCode, Json<JobSubmitResponse>) {
    let job_id = state.orchestrator.submit_bulk_refresh(request);

    (
        StatusCode::ACCEPTED,
        Json(JobSubmitResponse {
            message: format!(
                "Refresh started. Track progress at /v1/refresh-jobs/{}",
                job_id
            ),
            job_id,
        }),
    )
}

/// GET /v1/refresh-jobs/{job_id}
pub async fn get_refresh_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<RefreshJob> {
    state
        .progress()
        .get_refresh_job(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Refresh job {} not found", job_id)))
}

// =============================================================================
// Trips
// =============================================================================

/// GET /v1/trips
///
/// Stored trips filtered by variance, quality, status, closer and accuracy flag.
pub async fn list_trips(
    State(state): State<AppState>,
    Query(filter): Query<TripFilter>,
) -> HandlerResult<TripPage> {
    filter.validate().map_err(AppError::BadRequest)?;
    let trips = db_services::list_trip_metrics(state.repository().as_ref()).await?;
    Ok(Json(filter_trips(trips, &filter)))
}

/// GET /v1/trips/{trip_id}
pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> HandlerResult<TripMetrics> {
    let trip_id = trip_id_from_path(trip_id)?;
    let metrics = db_services::get_trip_metrics(state.repository().as_ref(), trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", trip_id)))?;
    Ok(Json(metrics))
}

/// POST /v1/trips/{trip_id}/refresh
///
/// Fetch fresh detail for one trip, re-analyze it and store the result.
pub async fn refresh_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<i64>,
) -> HandlerResult<TripMetrics> {
    let trip_id = trip_id_from_path(trip_id)?;
    let metrics = refresh_trip_by_id(
        state.source().as_ref(),
        state.repository().as_ref(),
        trip_id,
    )
    .await?;
    Ok(Json(metrics))
}

/// GET /v1/insights
///
/// Distribution insights over every stored trip.
pub async fn get_insights(State(state): State<AppState>) -> HandlerResult<FleetInsights> {
    let trips = db_services::list_trip_metrics(state.repository().as_ref()).await?;

    let insights = tokio::task::spawn_blocking(move || compute_fleet_insights(&trips))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    Ok(Json(insights))
}

// =============================================================================
// Async Job Management
// =============================================================================

/// GET /v1/jobs/{job_id}
///
/// Unknown ids are not an error; they report `not_started`.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<JobStatusResponse> {
    let response = match state.progress().get_job(&job_id) {
        Some(job) => JobStatusResponse::from(job),
        None => JobStatusResponse::not_started(job_id),
    };
    Ok(Json(response))
}

/// GET /v1/jobs/{job_id}/logs
///
/// Stream job logs via Server-Sent Events (SSE).
pub async fn stream_job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.progress().get_job(&job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {} not found", job_id)));
    }

    let store = state.progress().clone();
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            let logs = store.get_logs(&job_id);
            for log in logs.iter().skip(sent) {
                let data = serde_json::to_string(log).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }
            sent = logs.len();

            match store.get_job(&job_id) {
                Some(job) if job.status.is_terminal() => {
                    let final_event = serde_json::json!({
                        "status": job.status,
                        "progress": job.progress,
                        "message": job.message,
                        "result": job.result,
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(serde_json::to_string(&final_event).unwrap_or_default()));
                    break;
                }
                Some(_) => {}
                None => break,
            }

            tokio::time::sleep(LOG_POLL_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
