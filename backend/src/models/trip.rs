//! Trip-level domain types: raw coordinates, export records, detail payloads
//! and the per-trip metrics row kept in the repository.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::QualityCategory;

crate::define_id_type!(i64, TripId);

/// A single GPS fix in decimal degrees, always stored latitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build from a `[lon, lat]` pair as delivered by the trip API.
    ///
    /// Returns `None` for non-finite or out-of-range values.
    pub fn from_lon_lat(longitude: f64, latitude: f64) -> Option<Self> {
        let coord = Self::new(latitude, longitude);
        coord.is_valid().then_some(coord)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One trip as it appears in the export for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_id: TripId,
    /// User-reported distance in km.
    pub manual_distance: Option<f64>,
    pub lack_of_accuracy: bool,
    pub event_time: Option<DateTime<Utc>>,
}

impl TripRecord {
    /// A record carrying only the id, used when a trip is refreshed outside an export.
    pub fn bare(trip_id: TripId) -> Self {
        Self {
            trip_id,
            manual_distance: None,
            lack_of_accuracy: false,
            event_time: None,
        }
    }

    /// Rebuild the export-side fields from a stored metrics row.
    ///
    /// Uses the exported accuracy flag, not the merged one, so the rebuilt
    /// record fingerprints the same as the export it came from.
    pub fn from_metrics(metrics: &TripMetrics) -> Self {
        Self {
            trip_id: metrics.trip_id,
            manual_distance: metrics.manual_distance,
            lack_of_accuracy: metrics.export_lack_of_accuracy,
            event_time: None,
        }
    }
}

/// A status transition or other event from the trip's activity log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub created_at: Option<NaiveDateTime>,
    /// Target status of a status change (`changes.status[-1]`), lower-cased.
    pub to_status: Option<String>,
    pub user_type: Option<String>,
}

/// Detail payload for one trip fetched from the detail API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripDetail {
    pub status: Option<String>,
    /// Time-ordered, already normalized to latitude/longitude.
    pub coordinates: Vec<Coordinate>,
    pub activity: Vec<ActivityEvent>,
    /// Accuracy flag derived from the trip's tags, when the payload carries tags.
    pub lack_of_accuracy: Option<bool>,
}

/// Per-trip segment statistics. Distances are km rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub short_segments_count: usize,
    pub medium_segments_count: usize,
    pub long_segments_count: usize,
    pub short_segments_distance: f64,
    pub medium_segments_distance: f64,
    pub long_segments_distance: f64,
    pub max_segment_distance: f64,
    pub avg_segment_distance: f64,
    /// Sum of every segment distance.
    pub total_distance: f64,
}

impl SegmentSummary {
    /// Number of segments of 1 km or more.
    pub fn medium_long_count(&self) -> usize {
        self.medium_segments_count + self.long_segments_count
    }

    pub fn medium_long_distance(&self) -> f64 {
        self.medium_segments_distance + self.long_segments_distance
    }
}

/// Stored analysis row for one trip.
///
/// Export fields are always present; analysis fields are `None` until the
/// trip detail has been fetched and analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripMetrics {
    pub trip_id: TripId,
    pub status: Option<String>,
    /// Number of GPS fixes recorded for the trip.
    pub logs_count: Option<usize>,
    /// Export flag OR the detail tag.
    pub lack_of_accuracy: bool,
    /// Accuracy flag as it appeared in the export.
    #[serde(default)]
    pub export_lack_of_accuracy: bool,
    pub manual_distance: Option<f64>,
    pub calculated_distance: Option<f64>,
    pub segments: Option<SegmentSummary>,
    pub expected_trip_quality: QualityCategory,
    pub completed_by: Option<String>,
    pub trip_time_minutes: Option<f64>,
    /// Fingerprint of the export record this row was computed from.
    pub source_fingerprint: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TripMetrics {
    /// A row built from export fields only; it classifies as `NoLogsTrip`.
    pub fn unanalyzed(record: &TripRecord) -> Self {
        Self {
            trip_id: record.trip_id,
            status: None,
            logs_count: None,
            lack_of_accuracy: record.lack_of_accuracy,
            export_lack_of_accuracy: record.lack_of_accuracy,
            manual_distance: record.manual_distance,
            calculated_distance: None,
            segments: None,
            expected_trip_quality: QualityCategory::NoLogsTrip,
            completed_by: None,
            trip_time_minutes: None,
            source_fingerprint: None,
            updated_at: None,
        }
    }

    /// True when the fields required by the classifier and aggregator are present.
    pub fn has_analysis(&self) -> bool {
        self.logs_count.is_some() && self.segments.is_some() && self.calculated_distance.is_some()
    }
}
