//! Service layer: aggregation, comparison, listing and job orchestration.
//!
//! Services sit between the storage and source layers and the HTTP surface.
//! They own the business rules; handlers only translate requests.

pub mod bulk_refresh;
pub mod compare;
pub mod comparison_job;
pub mod insights;
pub mod metrics;
pub mod progress_store;
pub mod trip_listing;
pub mod trip_updater;
pub mod worker_pool;



pub use bulk_refresh::{run_bulk_refresh, BulkRefreshRequest};
pub use compare::{compute_deltas, Polarity};
pub use comparison_job::{ComparisonOrchestrator, ComparisonRequest, JobError};
pub use insights::{compute_fleet_insights, FleetInsights};
pub use metrics::compute_aggregate_metrics;
pub use progress_store::{
    ComparisonJob, ComparisonStep, JobStatus, LogEntry, LogLevel, ProgressStore, RefreshCounts,
    RefreshJob, RefreshOutcome,
};
pub use trip_listing::{filter_trips, TripFilter, TripListItem, TripPage};
pub use trip_updater::{build_trip_metrics, refresh_trip, refresh_trip_by_id, UpdateError};
pub use worker_pool::{WorkerError, WorkerPool};
