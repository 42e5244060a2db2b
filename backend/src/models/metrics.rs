//! Quality categories, fleet aggregates and comparison results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::DateRange;
use super::trip::TripId;

/// Expected trip quality. Exactly one value per classified trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityCategory {
    NoLogsTrip,
    TripPointsOnlyExist,
    LowQualityTrip,
    ModerateQualityTrip,
    HighQualityTrip,
}

impl QualityCategory {
    pub const ALL: [QualityCategory; 5] = [
        QualityCategory::NoLogsTrip,
        QualityCategory::TripPointsOnlyExist,
        QualityCategory::LowQualityTrip,
        QualityCategory::ModerateQualityTrip,
        QualityCategory::HighQualityTrip,
    ];

    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            QualityCategory::NoLogsTrip => "No Logs Trip",
            QualityCategory::TripPointsOnlyExist => "Trip Points Only Exist",
            QualityCategory::LowQualityTrip => "Low Quality Trip",
            QualityCategory::ModerateQualityTrip => "Moderate Quality Trip",
            QualityCategory::HighQualityTrip => "High Quality Trip",
        }
    }
}

impl std::fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per quality category.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerQuality<T> {
    pub no_logs_trip: T,
    pub trip_points_only_exist: T,
    pub low_quality_trip: T,
    pub moderate_quality_trip: T,
    pub high_quality_trip: T,
}

impl<T: Copy> PerQuality<T> {
    pub fn get(&self, category: QualityCategory) -> T {
        match category {
            QualityCategory::NoLogsTrip => self.no_logs_trip,
            QualityCategory::TripPointsOnlyExist => self.trip_points_only_exist,
            QualityCategory::LowQualityTrip => self.low_quality_trip,
            QualityCategory::ModerateQualityTrip => self.moderate_quality_trip,
            QualityCategory::HighQualityTrip => self.high_quality_trip,
        }
    }

    pub fn get_mut(&mut self, category: QualityCategory) -> &mut T {
        match category {
            QualityCategory::NoLogsTrip => &mut self.no_logs_trip,
            QualityCategory::TripPointsOnlyExist => &mut self.trip_points_only_exist,
            QualityCategory::LowQualityTrip => &mut self.low_quality_trip,
            QualityCategory::ModerateQualityTrip => &mut self.moderate_quality_trip,
            QualityCategory::HighQualityTrip => &mut self.high_quality_trip,
        }
    }
}

/// Fleet-level statistics for one date range. Percentages are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_trips: usize,
    pub quality_counts: PerQuality<usize>,
    pub quality_percentages: PerQuality<f64>,
    pub avg_manual_distance: f64,
    pub avg_calculated_distance: f64,
    pub distance_variance_pct: f64,
    pub accurate_trips_pct: f64,
    pub app_killed_pct: f64,
    pub single_log_pct: f64,
    pub short_segments_distance_pct: f64,
    pub medium_segments_distance_pct: f64,
    pub long_segments_distance_pct: f64,
}

/// Change of one aggregate metric between the base and comparison periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub label: String,
    pub base: f64,
    pub comparison: f64,
    pub change: f64,
    pub percent_change: f64,
    /// `None` for metrics with no preferred direction.
    pub is_improvement: Option<bool>,
}

/// Outcome of the update step of a comparison job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub total_trips: usize,
    pub cache_hits: usize,
    pub needs_update: usize,
    pub updated: usize,
    pub failed: usize,
    pub failed_trip_ids: Vec<TripId>,
}

/// Final result attached to a completed comparison job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub base_range: DateRange,
    pub comparison_range: DateRange,
    pub base: AggregateMetrics,
    pub comparison: AggregateMetrics,
    pub deltas: Vec<MetricDelta>,
    pub update_summary: UpdateSummary,
    pub generated_at: DateTime<Utc>,
}
