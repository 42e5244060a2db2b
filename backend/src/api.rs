//! Public API surface for the backend.
//!
//! Consolidates the types that appear in HTTP responses and job results.
//! All of them derive Serialize for JSON output.

pub use crate::models::AggregateMetrics;
pub use crate::models::ComparisonResult;
pub use crate::models::Coordinate;
pub use crate::models::DateRange;
pub use crate::models::MetricDelta;
pub use crate::models::PerQuality;
pub use crate::models::QualityCategory;
pub use crate::models::SegmentSummary;
pub use crate::models::TripId;
pub use crate::models::TripMetrics;
pub use crate::models::TripRecord;
pub use crate::models::UpdateSummary;
pub use crate::services::bulk_refresh::BulkRefreshRequest;
pub use crate::services::comparison_job::ComparisonRequest;
pub use crate::services::insights::{
    Bucket, CompletedByCounts, FleetInsights, SegmentCounts, SegmentDistances, YesNoCounts,
};
pub use crate::services::progress_store::{
    ComparisonStep, JobStatus, LogEntry, LogLevel, RefreshCounts, RefreshJob,
};
pub use crate::services::trip_listing::{TripFilter, TripListItem, TripPage};
