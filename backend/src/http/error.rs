//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::services::{JobError, UpdateError};
use crate::source::SourceError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Repository error
    Repository(RepositoryError),
    /// Upstream trip API or export failure
    Source(SourceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => match &e {
                RepositoryError::InvalidRow { .. } => (
                    StatusCode::BAD_REQUEST,
                    ApiError::new("BAD_REQUEST", e.to_string()),
                ),
            },
            AppError::Source(e) => match &e {
                SourceError::Status { status: 404, .. } => {
                    (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", e.to_string()))
                }
                SourceError::NotConfigured(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiError::new("SOURCE_NOT_CONFIGURED", e.to_string()),
                ),
                _ => (
                    StatusCode::BAD_GATEWAY,
                    ApiError::new("SOURCE_ERROR", e.to_string()),
                ),
            },
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::Source(err)
    }
}

impl From<UpdateError> for AppError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Source { source, .. } => AppError::Source(source),
            UpdateError::Repository { source, .. } => AppError::Repository(source),
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::InvalidRequest(msg) => AppError::BadRequest(msg),
            JobError::Export { source, .. } => AppError::Source(source),
            JobError::Repository(e) => AppError::Repository(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;
    use crate::models::TripId;

    #[test]
    fn test_status_mapping() {
        let not_found = AppError::NotFound("trip 1".into()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid: AppError = JobError::InvalidRequest("base: start after end".into()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let upstream: AppError = UpdateError::Source {
            trip_id: TripId::new(3),
            source: SourceError::Status {
                status: 503,
                url: "http://api/admin/trips/3".into(),
            },
        }
        .into();
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);

        let missing: AppError = SourceError::Status {
            status: 404,
            url: "http://api/admin/trips/4".into(),
        }
        .into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_refused_row_is_bad_request() {
        let refused: AppError = UpdateError::Repository {
            trip_id: TripId::new(0),
            source: RepositoryError::InvalidRow {
                message: "trip id must be positive".into(),
                context: ErrorContext::new("upsert_trip_metrics").for_trip(TripId::new(0)),
            },
        }
        .into();
        assert_eq!(refused.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
