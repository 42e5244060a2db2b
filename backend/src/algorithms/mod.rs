//! Pure trip analysis: segment statistics, quality classification and
//! activity timing. Nothing here performs I/O.

pub mod activity;
pub mod quality;
pub mod segments;

pub use activity::{calculate_trip_time, determine_completed_by};
pub use quality::{calculate_expected_trip_quality, classify_trip, QualityInputs};
pub use segments::{analyze_segments, haversine_km, SegmentCategory};

/// Round to 2 decimal places. Applied only when values leave the analysis.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
