//! Errors raised by the trip metrics store.

use std::fmt;

use crate::models::TripId;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where a storage failure happened: the service operation and the trip row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub trip_id: Option<TripId>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            trip_id: None,
        }
    }

    pub fn for_trip(mut self, trip_id: TripId) -> Self {
        self.trip_id = Some(trip_id);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(id) = self.trip_id {
            parts.push(format!("trip={}", id));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A metrics row was refused before it was stored.
    #[error("Invalid trip row: {message} {context}")]
    InvalidRow {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    /// Name the service operation that surfaced the error.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::InvalidRow { context, .. } => context.operation = Some(operation.into()),
        }
        self
    }
}
