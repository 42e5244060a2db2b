//! Fleet insight distributions over stored trip metrics.

use serde::{Deserialize, Serialize};

use crate::algorithms::{classify_trip, round2};
use crate::models::{PerQuality, TripMetrics};

const MAX_SEGMENT_EDGES: [f64; 4] = [1.0, 5.0, 10.0, 20.0];
const MAX_SEGMENT_LABELS: [&str; 5] = ["0-1km", "1-5km", "5-10km", "10-20km", "20km+"];

const AVG_SEGMENT_EDGES: [f64; 4] = [0.1, 0.5, 1.0, 2.0];
const AVG_SEGMENT_LABELS: [&str; 5] = ["0-0.1km", "0.1-0.5km", "0.5-1km", "1-2km", "2km+"];

const TRIP_TIME_EDGES: [f64; 4] = [10.0, 30.0, 60.0, 120.0];
const TRIP_TIME_LABELS: [&str; 5] = ["0-10min", "10-30min", "30-60min", "1-2hr", "2hr+"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentCounts {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentDistances {
    pub short: f64,
    pub medium: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
/// Who closed each completed trip. Trips in any other status are not counted.
pub struct CompletedByCounts {
    pub admin: usize,
    pub driver: usize,
    /// Any other user type, or unknown.
    pub other: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YesNoCounts {
    pub yes: usize,
    pub no: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FleetInsights {
    pub total_trips: usize,
    /// Trips with segment analysis.
    pub analyzed_trips: usize,
    pub segment_counts: SegmentCounts,
    pub segment_distances: SegmentDistances,
    pub max_segment_distribution: Vec<Bucket>,
    pub avg_segment_distribution: Vec<Bucket>,
    pub trip_time_distribution: Vec<Bucket>,
    pub completed_by: CompletedByCounts,
    pub lack_of_accuracy: YesNoCounts,
    pub quality_counts: PerQuality<usize>,
}

/// Index of the lower-inclusive bucket holding `value`.
fn bucket_index(value: f64, edges: &[f64]) -> usize {
    edges.iter().take_while(|edge| value >= **edge).count()
}

fn histogram(values: impl Iterator<Item = f64>, edges: &[f64], labels: &[&str]) -> Vec<Bucket> {
    let mut counts = vec![0usize; labels.len()];
    for value in values.filter(|v| v.is_finite() && *v >= 0.0) {
        counts[bucket_index(value, edges)] += 1;
    }
    labels
        .iter()
        .zip(counts)
        .map(|(label, count)| Bucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

fn is_completed(trip: &TripMetrics) -> bool {
    trip.status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("completed"))
}

pub fn compute_fleet_insights(trips: &[TripMetrics]) -> FleetInsights {
    let analyzed: Vec<_> = trips.iter().filter_map(|t| t.segments).collect();

    let mut segment_counts = SegmentCounts::default();
    let mut segment_distances = SegmentDistances::default();
    for s in &analyzed {
        segment_counts.short += s.short_segments_count;
        segment_counts.medium += s.medium_segments_count;
        segment_counts.long += s.long_segments_count;
        segment_distances.short += s.short_segments_distance;
        segment_distances.medium += s.medium_segments_distance;
        segment_distances.long += s.long_segments_distance;
    }
    segment_distances.short = round2(segment_distances.short);
    segment_distances.medium = round2(segment_distances.medium);
    segment_distances.long = round2(segment_distances.long);

    let mut completed_by = CompletedByCounts::default();
    let mut lack_of_accuracy = YesNoCounts::default();
    let mut quality_counts = PerQuality::<usize>::default();
    for trip in trips {
        if is_completed(trip) {
            match trip.completed_by.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("admin") => completed_by.admin += 1,
                Some("driver") => completed_by.driver += 1,
                _ => completed_by.other += 1,
            }
        }
        if trip.lack_of_accuracy {
            lack_of_accuracy.yes += 1;
        } else {
            lack_of_accuracy.no += 1;
        }
        *quality_counts.get_mut(classify_trip(trip)) += 1;
    }

    FleetInsights {
        total_trips: trips.len(),
        analyzed_trips: analyzed.len(),
        segment_counts,
        segment_distances,
        max_segment_distribution: histogram(
            analyzed.iter().map(|s| s.max_segment_distance),
            &MAX_SEGMENT_EDGES,
            &MAX_SEGMENT_LABELS,
        ),
        avg_segment_distribution: histogram(
            analyzed.iter().map(|s| s.avg_segment_distance),
            &AVG_SEGMENT_EDGES,
            &AVG_SEGMENT_LABELS,
        ),
        trip_time_distribution: histogram(
            trips.iter().filter_map(|t| t.trip_time_minutes),
            &TRIP_TIME_EDGES,
            &TRIP_TIME_LABELS,
        ),
        completed_by,
        lack_of_accuracy,
        quality_counts,
    }
}
