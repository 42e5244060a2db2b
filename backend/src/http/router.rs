//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Comparisons and their jobs
        .route("/comparisons", post(handlers::submit_comparison))
        .route("/jobs/{job_id}", get(handlers::get_job_status))
        .route("/jobs/{job_id}/logs", get(handlers::stream_job_logs))
        // Bulk refresh of stored trips
        .route("/refresh-jobs", post(handlers::submit_bulk_refresh))
        .route("/refresh-jobs/{job_id}", get(handlers::get_refresh_job))
        // Stored trips
        .route("/trips", get(handlers::list_trips))
        .route("/trips/{trip_id}", get(handlers::get_trip))
        .route("/trips/{trip_id}/refresh", post(handlers::refresh_trip))
        .route("/insights", get(handlers::get_insights));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
