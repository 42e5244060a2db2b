//! Expected trip quality classification.
//!
//! The classifier is a pure function of segment and log statistics. It never
//! fails: callers guard against missing or non-finite source values first
//! (see [`QualityInputs::from_metrics`]) and fall back to `NoLogsTrip`.

use crate::models::{QualityCategory, TripMetrics};

/// Fixed epsilon added to the medium+long distance denominator.
const RATIO_EPSILON: f64 = 0.01;
/// Logs count at which the logs factor saturates.
const LOGS_SATURATION: f64 = 500.0;
const HIGH_SCORE_THRESHOLD: f64 = 0.8;
const LACK_OF_ACCURACY_PENALTY: f64 = 0.8;
/// Max share of medium+long distance allowed for a high quality trip.
const HIGH_QUALITY_MAX_GAP_SHARE: f64 = 0.05;

/// Inputs of the quality decision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityInputs {
    pub logs_count: usize,
    pub lack_of_accuracy: bool,
    pub medium_segments_count: usize,
    pub long_segments_count: usize,
    pub short_dist_total: f64,
    pub medium_dist_total: f64,
    pub long_dist_total: f64,
    pub calculated_distance: f64,
}

impl QualityInputs {
    /// Extract classifier inputs from a stored metrics row.
    ///
    /// Returns `None` when any required field is missing or non-finite.
    pub fn from_metrics(metrics: &TripMetrics) -> Option<Self> {
        let segments = metrics.segments?;
        let inputs = Self {
            logs_count: metrics.logs_count?,
            lack_of_accuracy: metrics.lack_of_accuracy,
            medium_segments_count: segments.medium_segments_count,
            long_segments_count: segments.long_segments_count,
            short_dist_total: segments.short_segments_distance,
            medium_dist_total: segments.medium_segments_distance,
            long_dist_total: segments.long_segments_distance,
            calculated_distance: metrics.calculated_distance?,
        };
        inputs.is_finite().then_some(inputs)
    }

    fn is_finite(&self) -> bool {
        [
            self.short_dist_total,
            self.medium_dist_total,
            self.long_dist_total,
            self.calculated_distance,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Map the ratio of short to medium+long distance onto `[0, 1]`.
pub fn segment_factor(ratio: f64) -> f64 {
    if ratio >= 5.0 {
        1.0
    } else if ratio <= 0.5 {
        0.0
    } else {
        (ratio - 0.5) / 4.5
    }
}

/// Weighted score in `[0, 1]` from logs density and segment shape.
pub fn quality_score(inputs: &QualityInputs) -> f64 {
    let logs_factor = (inputs.logs_count as f64 / LOGS_SATURATION).min(1.0);
    let ratio =
        inputs.short_dist_total / (inputs.medium_dist_total + inputs.long_dist_total + RATIO_EPSILON);
    let mut score = 0.5 * logs_factor + 0.5 * segment_factor(ratio);
    if inputs.lack_of_accuracy {
        score *= LACK_OF_ACCURACY_PENALTY;
    }
    score
}

/// Classify a trip. Rules are evaluated in order and the first match wins.
pub fn calculate_expected_trip_quality(inputs: &QualityInputs) -> QualityCategory {
    let total_distance = inputs.short_dist_total + inputs.medium_dist_total + inputs.long_dist_total;
    let has_gaps = inputs.medium_segments_count + inputs.long_segments_count > 0;

    if total_distance <= 0.0 || inputs.logs_count <= 1 {
        return QualityCategory::NoLogsTrip;
    }
    if inputs.logs_count < 5 && !has_gaps {
        return QualityCategory::NoLogsTrip;
    }
    if inputs.logs_count < 50 && has_gaps {
        return QualityCategory::TripPointsOnlyExist;
    }

    let score = quality_score(inputs);
    let gap_distance = inputs.medium_dist_total + inputs.long_dist_total;

    if score >= HIGH_SCORE_THRESHOLD
        && gap_distance <= HIGH_QUALITY_MAX_GAP_SHARE * inputs.calculated_distance
    {
        QualityCategory::HighQualityTrip
    } else if score >= HIGH_SCORE_THRESHOLD {
        // High score but too much distance in gaps: the product rule labels this Moderate.
        QualityCategory::ModerateQualityTrip
    } else {
        QualityCategory::LowQualityTrip
    }
}

/// Classify a stored row, treating missing analysis as `NoLogsTrip`.
pub fn classify_trip(metrics: &TripMetrics) -> QualityCategory {
    QualityInputs::from_metrics(metrics)
        .map(|inputs| calculate_expected_trip_quality(&inputs))
        .unwrap_or(QualityCategory::NoLogsTrip)
}
