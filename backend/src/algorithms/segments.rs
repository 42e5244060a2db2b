//! Segment analysis over a trip's GPS trace.
//!
//! A segment is the great-circle gap between two time-adjacent fixes. Each
//! segment is classified by length and accumulated into a [`SegmentSummary`].
//!
//! # Categories
//!
//! | Category | Distance             |
//! |----------|----------------------|
//! | short    | `< 1 km`             |
//! | medium   | `1 km ..= 5 km`      |
//! | long     | `> 5 km`             |
//!
//! Accumulation runs at full precision; values are rounded to 2 decimals only
//! when the summary is produced.

use serde::{Deserialize, Serialize};

use super::round2;
use crate::models::{Coordinate, SegmentSummary};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const SHORT_SEGMENT_MAX_KM: f64 = 1.0;
pub const MEDIUM_SEGMENT_MAX_KM: f64 = 5.0;

/// Length class of a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentCategory {
    Short,
    Medium,
    Long,
}

impl SegmentCategory {
    /// Classify a segment distance in km. 1.0 and 5.0 are both medium.
    pub fn from_distance(distance_km: f64) -> Self {
        if distance_km < SHORT_SEGMENT_MAX_KM {
            SegmentCategory::Short
        } else if distance_km <= MEDIUM_SEGMENT_MAX_KM {
            SegmentCategory::Medium
        } else {
            SegmentCategory::Long
        }
    }
}

/// Haversine great-circle distance between two fixes, in km.
pub fn haversine_km(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[derive(Default)]
struct Accumulator {
    counts: [usize; 3],
    distances: [f64; 3],
    max: f64,
    total: f64,
    segments: usize,
}

impl Accumulator {
    fn push(&mut self, distance_km: f64) {
        let slot = match SegmentCategory::from_distance(distance_km) {
            SegmentCategory::Short => 0,
            SegmentCategory::Medium => 1,
            SegmentCategory::Long => 2,
        };
        self.counts[slot] += 1;
        self.distances[slot] += distance_km;
        self.total += distance_km;
        self.segments += 1;
        if distance_km > self.max {
            self.max = distance_km;
        }
    }

    fn finish(self) -> SegmentSummary {
        let avg = if self.segments > 0 {
            self.total / self.segments as f64
        } else {
            0.0
        };
        SegmentSummary {
            short_segments_count: self.counts[0],
            medium_segments_count: self.counts[1],
            long_segments_count: self.counts[2],
            short_segments_distance: round2(self.distances[0]),
            medium_segments_distance: round2(self.distances[1]),
            long_segments_distance: round2(self.distances[2]),
            max_segment_distance: round2(self.max),
            avg_segment_distance: round2(avg),
            total_distance: round2(self.total),
        }
    }
}

/// Analyze a time-ordered coordinate sequence.
///
/// Fewer than two coordinates yield an all-zero summary.
pub fn analyze_segments(coordinates: &[Coordinate]) -> SegmentSummary {
    let mut acc = Accumulator::default();
    for pair in coordinates.windows(2) {
        acc.push(haversine_km(&pair[0], &pair[1]));
    }
    acc.finish()
}
