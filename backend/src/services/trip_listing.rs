//! Filtered, paginated listing of stored trips.

use serde::{Deserialize, Serialize};

use super::metrics::distance_variance_pct;
use crate::algorithms::{classify_trip, round2};
use crate::models::{QualityCategory, TripMetrics};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Listing filters. Every field is optional and the set ones must all match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripFilter {
    /// Lowest distance variance in percent, inclusive.
    pub variance_min: Option<f64>,
    /// Highest distance variance in percent, inclusive.
    pub variance_max: Option<f64>,
    pub quality: Option<QualityCategory>,
    /// Trip status, compared case-insensitively.
    pub status: Option<String>,
    pub completed_by: Option<String>,
    pub lack_of_accuracy: Option<bool>,
    /// 1-based page, clamped to the last page.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

fn same_text(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual
            .as_deref()
            .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
    }
}

impl TripFilter {
    pub fn validate(&self) -> Result<(), String> {
        for (name, bound) in [("variance_min", self.variance_min), ("variance_max", self.variance_max)] {
            if let Some(v) = bound {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!("{} must be a non-negative number, got {}", name, v));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.variance_min, self.variance_max) {
            if min > max {
                return Err(format!("variance_min {} is above variance_max {}", min, max));
            }
        }
        match self.page_size {
            Some(0) => Err("page_size must be at least 1".to_string()),
            Some(size) if size > MAX_PAGE_SIZE => {
                Err(format!("page_size must be at most {}", MAX_PAGE_SIZE))
            }
            _ => Ok(()),
        }
    }

    fn has_variance_bounds(&self) -> bool {
        self.variance_min.is_some() || self.variance_max.is_some()
    }

    /// Whether `trip`, with its precomputed `variance`, passes every set filter.
    ///
    /// Trips without a variance never pass a variance bound.
    pub fn matches(&self, trip: &TripMetrics, variance: Option<f64>) -> bool {
        if self.has_variance_bounds() {
            let Some(v) = variance else {
                return false;
            };
            if self.variance_min.is_some_and(|min| v < min)
                || self.variance_max.is_some_and(|max| v > max)
            {
                return false;
            }
        }
        if self.quality.is_some_and(|q| classify_trip(trip) != q) {
            return false;
        }
        if self
            .lack_of_accuracy
            .is_some_and(|flag| trip.lack_of_accuracy != flag)
        {
            return false;
        }
        same_text(&self.status, &trip.status) && same_text(&self.completed_by, &trip.completed_by)
    }
}

/// One listed trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripListItem {
    #[serde(flatten)]
    pub metrics: TripMetrics,
    /// |calculated - manual| / manual * 100, rounded to 2 dp.
    pub variance_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPage {
    pub trips: Vec<TripListItem>,
    /// Trips matching the filters across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Apply `filter` to `rows` and cut out the requested page, ordered by trip id.
pub fn filter_trips(mut rows: Vec<TripMetrics>, filter: &TripFilter) -> TripPage {
    rows.sort_by_key(|trip| trip.trip_id);
    let matching: Vec<TripListItem> = rows
        .into_iter()
        .filter_map(|metrics| {
            let variance = distance_variance_pct(&metrics);
            filter.matches(&metrics, variance).then(|| TripListItem {
                variance_pct: variance.map(round2),
                metrics,
            })
        })
        .collect();

    let total = matching.len();
    let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let total_pages = total.div_ceil(page_size).max(1);
    let page = filter.page.unwrap_or(1).clamp(1, total_pages);

    let trips = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    TripPage {
        trips,
        total,
        page,
        page_size,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SegmentSummary, TripId, TripRecord};

    fn trip(id: i64, manual: Option<f64>, calculated: f64) -> TripMetrics {
        let record = TripRecord {
            manual_distance: manual,
            ..TripRecord::bare(TripId::new(id))
        };
        TripMetrics {
            logs_count: Some(600),
            calculated_distance: Some(calculated),
            segments: Some(SegmentSummary {
                short_segments_count: 599,
                short_segments_distance: calculated,
                total_distance: calculated,
                ..Default::default()
            }),
            status: Some("completed".into()),
            completed_by: Some("driver".into()),
            ..TripMetrics::unanalyzed(&record)
        }
    }

    fn ids(page: &TripPage) -> Vec<i64> {
        page.trips.iter().map(|t| t.metrics.trip_id.value()).collect()
    }

    #[test]
    fn test_variance_bounds_are_inclusive_and_drop_unknown_variance() {
        let rows = vec![
            trip(1, Some(10.0), 10.5), // 5%
            trip(2, Some(10.0), 12.0), // 20%
            trip(3, Some(10.0), 15.0), // 50%
            trip(4, None, 8.0),
        ];
        let filter = TripFilter {
            variance_min: Some(5.0),
            variance_max: Some(20.0),
            ..Default::default()
        };
        let page = filter_trips(rows.clone(), &filter);
        assert_eq!(ids(&page), vec![1, 2]);
        assert_eq!(page.trips[1].variance_pct, Some(20.0));

        let all = filter_trips(rows, &TripFilter::default());
        assert_eq!(all.total, 4);
        assert_eq!(all.trips[3].variance_pct, None);
    }

    #[test]
    fn test_text_flag_and_quality_filters() {
        let mut cancelled = trip(2, Some(5.0), 5.0);
        cancelled.status = Some("Cancelled".into());
        let mut flagged = trip(3, Some(5.0), 5.0);
        flagged.lack_of_accuracy = true;
        flagged.completed_by = Some("admin".into());
        let bare = TripMetrics::unanalyzed(&TripRecord::bare(TripId::new(4)));
        let rows = vec![trip(1, Some(5.0), 5.0), cancelled, flagged, bare];

        let by_status = TripFilter {
            status: Some("cancelled".into()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_trips(rows.clone(), &by_status)), vec![2]);

        let by_admin = TripFilter {
            completed_by: Some("ADMIN".into()),
            lack_of_accuracy: Some(true),
            ..Default::default()
        };
        assert_eq!(ids(&filter_trips(rows.clone(), &by_admin)), vec![3]);

        let no_logs = TripFilter {
            quality: Some(QualityCategory::NoLogsTrip),
            ..Default::default()
        };
        assert_eq!(ids(&filter_trips(rows, &no_logs)), vec![4]);
    }

    #[test]
    fn test_pagination_clamps_to_last_page() {
        let rows: Vec<TripMetrics> = (1..=5).rev().map(|id| trip(id, Some(5.0), 5.0)).collect();
        let filter = TripFilter {
            page: Some(9),
            page_size: Some(2),
            ..Default::default()
        };
        let page = filter_trips(rows.clone(), &filter);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(ids(&page), vec![5]);

        let empty = filter_trips(Vec::new(), &TripFilter::default());
        assert_eq!((empty.page, empty.total_pages, empty.total), (1, 1, 0));
        assert_eq!(empty.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let inverted = TripFilter {
            variance_min: Some(30.0),
            variance_max: Some(10.0),
            ..Default::default()
        };
        assert!(inverted.validate().unwrap_err().starts_with("variance_min"));

        let negative = TripFilter {
            variance_max: Some(-1.0),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let zero_page = TripFilter {
            page_size: Some(0),
            ..Default::default()
        };
        assert!(zero_page.validate().is_err());
        assert!(TripFilter::default().validate().is_ok());
    }
}
