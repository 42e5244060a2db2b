//! Deltas between the base and comparison periods.

use crate::models::{AggregateMetrics, MetricDelta};

/// Which direction of change counts as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
    Neutral,
}

impl Polarity {
    /// `None` for neutral metrics. A zero change is never an improvement.
    pub fn is_improvement(&self, change: f64) -> Option<bool> {
        match self {
            Polarity::HigherIsBetter => Some(change > 0.0),
            Polarity::LowerIsBetter => Some(change < 0.0),
            Polarity::Neutral => None,
        }
    }
}

struct ComparedMetric {
    key: &'static str,
    label: &'static str,
    polarity: Polarity,
    value: fn(&AggregateMetrics) -> f64,
}

/// Compared metrics, in report order.
const METRICS: &[ComparedMetric] = &[
    ComparedMetric {
        key: "total_trips",
        label: "Total Trips",
        polarity: Polarity::Neutral,
        value: |m| m.total_trips as f64,
    },
    ComparedMetric {
        key: "high_quality_pct",
        label: "High Quality %",
        polarity: Polarity::HigherIsBetter,
        value: |m| m.quality_percentages.high_quality_trip,
    },
    ComparedMetric {
        key: "moderate_quality_pct",
        label: "Moderate Quality %",
        polarity: Polarity::Neutral,
        value: |m| m.quality_percentages.moderate_quality_trip,
    },
    ComparedMetric {
        key: "low_quality_pct",
        label: "Low Quality %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.quality_percentages.low_quality_trip,
    },
    ComparedMetric {
        key: "points_only_pct",
        label: "Trip Points Only %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.quality_percentages.trip_points_only_exist,
    },
    ComparedMetric {
        key: "no_logs_pct",
        label: "No Logs %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.quality_percentages.no_logs_trip,
    },
    ComparedMetric {
        key: "avg_manual_distance",
        label: "Avg Manual Distance (km)",
        polarity: Polarity::Neutral,
        value: |m| m.avg_manual_distance,
    },
    ComparedMetric {
        key: "avg_calculated_distance",
        label: "Avg Calculated Distance (km)",
        polarity: Polarity::Neutral,
        value: |m| m.avg_calculated_distance,
    },
    ComparedMetric {
        key: "distance_variance_pct",
        label: "Distance Variance %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.distance_variance_pct,
    },
    ComparedMetric {
        key: "accurate_trips_pct",
        label: "Accurate Trips %",
        polarity: Polarity::HigherIsBetter,
        value: |m| m.accurate_trips_pct,
    },
    ComparedMetric {
        key: "app_killed_pct",
        label: "App Killed %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.app_killed_pct,
    },
    ComparedMetric {
        key: "single_log_pct",
        label: "Single Log %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.single_log_pct,
    },
    ComparedMetric {
        key: "short_segments_distance_pct",
        label: "Short Segments Distance %",
        polarity: Polarity::HigherIsBetter,
        value: |m| m.short_segments_distance_pct,
    },
    ComparedMetric {
        key: "medium_segments_distance_pct",
        label: "Medium Segments Distance %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.medium_segments_distance_pct,
    },
    ComparedMetric {
        key: "long_segments_distance_pct",
        label: "Long Segments Distance %",
        polarity: Polarity::LowerIsBetter,
        value: |m| m.long_segments_distance_pct,
    },
];

/// Build one delta. `percent_change` is 0 when `base` is 0.
pub fn metric_delta(
    metric: &str,
    label: &str,
    base: f64,
    comparison: f64,
    polarity: Polarity,
) -> MetricDelta {
    let change = comparison - base;
    let percent_change = if base != 0.0 {
        change / base * 100.0
    } else {
        0.0
    };
    MetricDelta {
        metric: metric.to_string(),
        label: label.to_string(),
        base,
        comparison,
        change,
        percent_change,
        is_improvement: polarity.is_improvement(change),
    }
}

/// Deltas for every compared metric, in report order.
pub fn compute_deltas(base: &AggregateMetrics, comparison: &AggregateMetrics) -> Vec<MetricDelta> {
    METRICS
        .iter()
        .map(|metric| {
            metric_delta(
                metric.key,
                metric.label,
                (metric.value)(base),
                (metric.value)(comparison),
                metric.polarity,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(deltas: &'a [MetricDelta], key: &str) -> &'a MetricDelta {
        deltas.iter().find(|d| d.metric == key).unwrap()
    }

    #[test]
    fn test_delta_round_trip() {
        let d = metric_delta("x", "X", 40.0, 50.0, Polarity::HigherIsBetter);
        assert_eq!(d.change, 10.0);
        assert_eq!(d.percent_change, 25.0);
        assert_eq!(d.is_improvement, Some(true));
    }

    #[test]
    fn test_zero_base_gives_zero_percent() {
        let d = metric_delta("x", "X", 0.0, 12.0, Polarity::LowerIsBetter);
        assert_eq!(d.change, 12.0);
        assert_eq!(d.percent_change, 0.0);
        assert_eq!(d.is_improvement, Some(false));
    }

    #[test]
    fn test_polarity_table() {
        let polarity = |key: &str| METRICS.iter().find(|m| m.key == key).map(|m| m.polarity);
        assert_eq!(polarity("high_quality_pct"), Some(Polarity::HigherIsBetter));
        assert_eq!(polarity("app_killed_pct"), Some(Polarity::LowerIsBetter));
        assert_eq!(polarity("moderate_quality_pct"), Some(Polarity::Neutral));
        assert_eq!(polarity("unknown"), None);
    }

    #[test]
    fn test_no_change_is_not_an_improvement() {
        assert_eq!(Polarity::HigherIsBetter.is_improvement(0.0), Some(false));
        assert_eq!(Polarity::LowerIsBetter.is_improvement(0.0), Some(false));
        assert_eq!(Polarity::Neutral.is_improvement(5.0), None);
    }

    #[test]
    fn test_compute_deltas_marks_direction() {
        let mut base = AggregateMetrics::default();
        base.quality_percentages.high_quality_trip = 30.0;
        base.app_killed_pct = 10.0;
        base.total_trips = 100;

        let mut comparison = base.clone();
        comparison.quality_percentages.high_quality_trip = 45.0;
        comparison.app_killed_pct = 12.0;
        comparison.total_trips = 80;

        let deltas = compute_deltas(&base, &comparison);
        assert_eq!(deltas.len(), METRICS.len());
        assert_eq!(deltas[0].metric, "total_trips");

        let high = find(&deltas, "high_quality_pct");
        assert_eq!(high.percent_change, 50.0);
        assert_eq!(high.is_improvement, Some(true));

        let killed = find(&deltas, "app_killed_pct");
        assert_eq!(killed.is_improvement, Some(false));

        let trips = find(&deltas, "total_trips");
        assert_eq!(trips.change, -20.0);
        assert_eq!(trips.is_improvement, None);
    }
}
