//! Fleet-level metrics over one date range.
//!
//! Each metric skips trips whose inputs for that metric are missing or
//! non-finite; a bad value never fails the whole aggregation. Percentages use
//! the total trip count (or total calculated distance) as denominator unless
//! stated otherwise, and are 0 when that denominator is 0.

use crate::algorithms::{classify_trip, round2};
use crate::models::{AggregateMetrics, PerQuality, QualityCategory, TripMetrics};

/// Variance below this share of the manual distance counts as accurate.
pub const ACCURATE_VARIANCE_PCT: f64 = 25.0;
/// Medium+long share of the calculated distance that marks an app-killed trip.
pub const APP_KILLED_GAP_SHARE: f64 = 0.4;

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

/// `|calculated - manual| / manual * 100`, when manual is positive.
pub fn distance_variance_pct(trip: &TripMetrics) -> Option<f64> {
    let manual = finite(trip.manual_distance).filter(|m| *m > 0.0)?;
    let calculated = finite(trip.calculated_distance)?;
    Some((calculated - manual).abs() / manual * 100.0)
}

/// A trip whose tracking looks interrupted: accurate device, yet at least
/// 40% of the calculated distance lies in medium or long gaps.
pub fn is_app_killed(trip: &TripMetrics) -> bool {
    if trip.lack_of_accuracy {
        return false;
    }
    let (Some(calculated), Some(segments)) = (finite(trip.calculated_distance), trip.segments)
    else {
        return false;
    };
    let gap_distance = segments.medium_long_distance();
    calculated > 0.0
        && segments.medium_long_count() > 0
        && gap_distance.is_finite()
        && gap_distance / calculated >= APP_KILLED_GAP_SHARE
}

/// Reduce a trip collection into [`AggregateMetrics`].
pub fn compute_aggregate_metrics(trips: &[TripMetrics]) -> AggregateMetrics {
    let total = trips.len();
    let total_f = total as f64;

    let mut quality_counts = PerQuality::<usize>::default();
    for trip in trips {
        *quality_counts.get_mut(classify_trip(trip)) += 1;
    }
    let mut quality_percentages = PerQuality::<f64>::default();
    for category in QualityCategory::ALL {
        *quality_percentages.get_mut(category) =
            round2(pct(quality_counts.get(category) as f64, total_f));
    }

    let variances: Vec<f64> = trips.iter().filter_map(distance_variance_pct).collect();
    let accurate = variances
        .iter()
        .filter(|v| **v < ACCURATE_VARIANCE_PCT)
        .count();

    let app_killed = trips.iter().filter(|t| is_app_killed(t)).count();
    let single_log = trips.iter().filter(|t| t.logs_count == Some(1)).count();

    let total_calculated: f64 = trips
        .iter()
        .filter_map(|t| finite(t.calculated_distance))
        .sum();
    let (mut short, mut medium, mut long) = (0.0, 0.0, 0.0);
    for segments in trips.iter().filter_map(|t| t.segments) {
        let parts = [
            segments.short_segments_distance,
            segments.medium_segments_distance,
            segments.long_segments_distance,
        ];
        if parts.iter().all(|d| d.is_finite()) {
            short += parts[0];
            medium += parts[1];
            long += parts[2];
        }
    }

    AggregateMetrics {
        total_trips: total,
        quality_counts,
        quality_percentages,
        avg_manual_distance: round2(mean(trips.iter().filter_map(|t| finite(t.manual_distance)))),
        avg_calculated_distance: round2(mean(
            trips.iter().filter_map(|t| finite(t.calculated_distance)),
        )),
        distance_variance_pct: round2(mean(variances.iter().copied())),
        accurate_trips_pct: round2(pct(accurate as f64, total_f)),
        app_killed_pct: round2(pct(app_killed as f64, total_f)),
        single_log_pct: round2(pct(single_log as f64, total_f)),
        short_segments_distance_pct: round2(pct(short, total_calculated)),
        medium_segments_distance_pct: round2(pct(medium, total_calculated)),
        long_segments_distance_pct: round2(pct(long, total_calculated)),
    }
}
