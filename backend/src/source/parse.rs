//! Parse-or-skip helpers for loosely typed source payloads.
//!
//! Export events and detail payloads mix numbers, numeric strings and
//! suffixed strings. Every helper here returns `Option`: `None` means the
//! value was absent or unusable and the caller skips it. Nothing panics and
//! nothing is silently coerced to zero.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{
    from_unix_seconds, parse_event_time, ActivityEvent, Coordinate, TripDetail, TripId,
    TripRecord,
};

const LACK_OF_ACCURACY_TAG: &str = "lack_of_accuracy";

/// Coerce a JSON value to a finite `f64`.
///
/// Accepts numbers, numeric strings and strings with a `km` suffix.
pub fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed
                .strip_suffix("km")
                .or_else(|| trimmed.strip_suffix("KM"))
                .unwrap_or(trimmed)
                .trim();
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Trip ids arrive as integers, integral floats or numeric strings.
pub fn parse_trip_id(value: &Value) -> Option<TripId> {
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.fract() == 0.0 && v.is_finite())
                .map(|v| v as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then(|| TripId::new(id))
}

/// Parse a `[lon, lat]` pair. Returns `None` for malformed or out-of-range points.
pub fn parse_lon_lat(value: &Value) -> Option<Coordinate> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    Coordinate::from_lon_lat(parse_f64(&pair[0])?, parse_f64(&pair[1])?)
}

/// Parse a coordinate list, returning the kept points and the number skipped.
pub fn parse_coordinates(value: &Value) -> (Vec<Coordinate>, usize) {
    let Some(items) = value.as_array() else {
        return (Vec::new(), 0);
    };
    let coords: Vec<Coordinate> = items.iter().filter_map(parse_lon_lat).collect();
    let skipped = items.len() - coords.len();
    (coords, skipped)
}

/// True when a `tagsCount` property marks the trip as inaccurate.
///
/// The property is either an object keyed by tag name or a list of tag names
/// (plain strings or `{name, count}` objects).
fn tags_mark_inaccurate(tags: &Value) -> bool {
    match tags {
        Value::Object(map) => map
            .get(LACK_OF_ACCURACY_TAG)
            .map(|v| parse_f64(v).map_or_else(|| parse_bool(v).unwrap_or(false), |n| n > 0.0))
            .unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| match item {
            Value::String(name) => name == LACK_OF_ACCURACY_TAG,
            Value::Object(obj) => {
                obj.get("name").and_then(Value::as_str) == Some(LACK_OF_ACCURACY_TAG)
                    && obj.get("count").and_then(parse_f64).map_or(true, |c| c > 0.0)
            }
            _ => false,
        }),
        _ => false,
    }
}

fn first_present<'a>(props: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| props.get(*k))
        .find(|v| !v.is_null())
}

/// Build a record from one export event `{event, properties}`.
///
/// Events without a usable trip id are skipped.
pub fn record_from_event(event: &Value) -> Option<TripRecord> {
    let props = event.get("properties")?;
    let trip_id = first_present(props, &["trip_id", "tripId"]).and_then(parse_trip_id)?;

    let manual_distance = first_present(props, &["manual_distance", "manualDistance"])
        .and_then(parse_f64)
        .filter(|d| *d >= 0.0);

    let flagged = props
        .get("lack_of_accuracy")
        .and_then(parse_bool)
        .unwrap_or(false);
    let tagged = props.get("tagsCount").map_or(false, tags_mark_inaccurate);

    let event_time = props
        .get("time")
        .and_then(parse_f64)
        .and_then(|secs| from_unix_seconds(secs as i64));

    Some(TripRecord {
        trip_id,
        manual_distance,
        lack_of_accuracy: flagged || tagged,
        event_time,
    })
}

/// Records parsed from one export body.
#[derive(Debug, Default)]
pub struct ExportParse {
    pub records: Vec<TripRecord>,
    /// Lines that were not JSON or carried no trip id.
    pub skipped: usize,
}

/// Parse a newline-delimited export body.
///
/// When `event_name` is set, events with a different name are ignored without
/// counting as skipped. A trip id seen twice keeps its first position and the
/// fields of its last event.
pub fn parse_export(body: &str, event_name: Option<&str>) -> ExportParse {
    let mut out = ExportParse::default();
    let mut index: HashMap<TripId, usize> = HashMap::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            out.skipped += 1;
            continue;
        };
        if let Some(wanted) = event_name {
            if event.get("event").and_then(Value::as_str) != Some(wanted) {
                continue;
            }
        }
        let Some(record) = record_from_event(&event) else {
            out.skipped += 1;
            continue;
        };
        match index.get(&record.trip_id) {
            Some(&pos) => out.records[pos] = record,
            None => {
                index.insert(record.trip_id, out.records.len());
                out.records.push(record);
            }
        }
    }
    out
}

/// Strip a JSON:API style `{data: {attributes: {...}}}` envelope.
pub fn unwrap_payload(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(data) => data.get("attributes").unwrap_or(data),
        None => payload,
    }
}

fn activity_event(value: &Value) -> ActivityEvent {
    let created_at = value
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(parse_event_time);
    let to_status = value
        .get("changes")
        .and_then(|c| c.get("status"))
        .and_then(Value::as_array)
        .filter(|change| change.len() >= 2)
        .and_then(|change| change.last())
        .map(|to| match to {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        });
    let user_type = value
        .get("user_type")
        .and_then(Value::as_str)
        .map(str::to_string);

    ActivityEvent {
        created_at,
        to_status,
        user_type,
    }
}

fn detail_tags_mark_inaccurate(trip: &Value) -> Option<bool> {
    let tags = trip.get("tags")?.as_array()?;
    Some(tags.iter().any(|tag| {
        let name = match tag {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str),
            _ => None,
        };
        name == Some(LACK_OF_ACCURACY_TAG)
    }))
}

/// Combine the trip payload and the coordinates payload into a [`TripDetail`].
pub fn detail_from_payloads(trip_payload: &Value, coordinates_payload: &Value) -> TripDetail {
    let trip = unwrap_payload(trip_payload);
    let coordinates_value = unwrap_payload(coordinates_payload)
        .get("coordinates")
        .unwrap_or(&Value::Null);
    let (coordinates, skipped) = parse_coordinates(coordinates_value);
    if skipped > 0 {
        log::debug!("Skipped {} malformed coordinates", skipped);
    }

    let activity = trip
        .get("activity")
        .and_then(Value::as_array)
        .map(|events| events.iter().map(activity_event).collect())
        .unwrap_or_default();

    TripDetail {
        status: trip
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_lowercase),
        coordinates,
        activity,
        lack_of_accuracy: detail_tags_mark_inaccurate(trip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_f64_variants() {
        assert_eq!(parse_f64(&json!(12.5)), Some(12.5));
        assert_eq!(parse_f64(&json!("7.25")), Some(7.25));
        assert_eq!(parse_f64(&json!(" 14.2 km")), Some(14.2));
        assert_eq!(parse_f64(&json!("3km")), Some(3.0));
        assert_eq!(parse_f64(&json!("n/a")), None);
        assert_eq!(parse_f64(&json!("NaN")), None);
        assert_eq!(parse_f64(&json!(null)), None);
        assert_eq!(parse_f64(&json!([1])), None);
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool(&json!(true)), Some(true));
        assert_eq!(parse_bool(&json!("Yes")), Some(true));
        assert_eq!(parse_bool(&json!(1)), Some(true));
        assert_eq!(parse_bool(&json!("false")), Some(false));
        assert_eq!(parse_bool(&json!("maybe")), None);
    }

    #[test]
    fn test_parse_trip_id() {
        assert_eq!(parse_trip_id(&json!(42)), Some(TripId::new(42)));
        assert_eq!(parse_trip_id(&json!("42")), Some(TripId::new(42)));
        assert_eq!(parse_trip_id(&json!(42.0)), Some(TripId::new(42)));
        assert_eq!(parse_trip_id(&json!(42.5)), None);
        assert_eq!(parse_trip_id(&json!(-1)), None);
        assert_eq!(parse_trip_id(&json!("abc")), None);
    }

    #[test]
    fn test_coordinates_are_normalized_and_filtered() {
        let raw = json!([[31.2, 30.0], [31.3, "30.1"], [200.0, 30.0], [31.4], "x", [31.5, 95.0]]);
        let (coords, skipped) = parse_coordinates(&raw);
        assert_eq!(coords.len(), 2);
        assert_eq!(skipped, 4);
        assert_eq!(coords[0].latitude, 30.0);
        assert_eq!(coords[0].longitude, 31.2);
        assert_eq!(coords[1].latitude, 30.1);
    }

    #[test]
    fn test_record_from_event_reads_alternate_keys() {
        let event = json!({
            "event": "trip_completed",
            "properties": {
                "tripId": "981",
                "manualDistance": "12.4 km",
                "tagsCount": {"lack_of_accuracy": 2},
                "time": 1_710_000_000
            }
        });
        let record = record_from_event(&event).unwrap();
        assert_eq!(record.trip_id, TripId::new(981));
        assert_eq!(record.manual_distance, Some(12.4));
        assert!(record.lack_of_accuracy);
        assert!(record.event_time.is_some());
    }

    #[test]
    fn test_record_without_id_is_skipped() {
        assert!(record_from_event(&json!({"properties": {"manual_distance": 3}})).is_none());
        assert!(record_from_event(&json!({"event": "x"})).is_none());
    }

    #[test]
    fn test_tags_count_list_forms() {
        assert!(tags_mark_inaccurate(&json!(["lack_of_accuracy"])));
        assert!(tags_mark_inaccurate(&json!([{"name": "lack_of_accuracy", "count": 1}])));
        assert!(!tags_mark_inaccurate(&json!([{"name": "lack_of_accuracy", "count": 0}])));
        assert!(!tags_mark_inaccurate(&json!({"other": 3})));
    }

    #[test]
    fn test_parse_export_dedupes_and_filters() {
        let body = r#"
{"event":"trip_completed","properties":{"trip_id":1,"manual_distance":5}}
not json
{"event":"app_opened","properties":{"trip_id":9}}
{"event":"trip_completed","properties":{"trip_id":2}}
{"event":"trip_completed","properties":{"trip_id":1,"manual_distance":6}}
{"event":"trip_completed","properties":{}}
"#;
        let parsed = parse_export(body, Some("trip_completed"));
        assert_eq!(parsed.skipped, 2);
        let ids: Vec<i64> = parsed.records.iter().map(|r| r.trip_id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(parsed.records[0].manual_distance, Some(6.0));

        let unfiltered = parse_export(body, None);
        assert_eq!(unfiltered.records.len(), 3);
    }

    #[test]
    fn test_detail_from_wrapped_payload() {
        let trip = json!({
            "data": {
                "attributes": {
                    "status": "Completed",
                    "tags": [{"name": "lack_of_accuracy"}],
                    "activity": [
                        {"created_at": "2025-03-01 10:00:00 UTC", "changes": {"status": ["pending", "enroute"]}, "user_type": "driver"},
                        {"created_at": "2025-03-01T10:30:00", "changes": {"status": ["enroute", "Completed"]}, "user_type": "admin"},
                        {"created_at": "garbage", "changes": {"status": ["x"]}}
                    ]
                }
            }
        });
        let coords = json!({"coordinates": [[31.0, 30.0], [31.01, 30.01]]});
        let detail = detail_from_payloads(&trip, &coords);

        assert_eq!(detail.status.as_deref(), Some("completed"));
        assert_eq!(detail.coordinates.len(), 2);
        assert_eq!(detail.lack_of_accuracy, Some(true));
        assert_eq!(detail.activity.len(), 3);
        assert_eq!(detail.activity[1].to_status.as_deref(), Some("completed"));
        assert!(detail.activity[2].created_at.is_none());
        assert!(detail.activity[2].to_status.is_none());
    }

    #[test]
    fn test_detail_without_tags_leaves_flag_unset() {
        let detail = detail_from_payloads(&json!({"status": "completed"}), &json!({}));
        assert_eq!(detail.lack_of_accuracy, None);
        assert!(detail.coordinates.is_empty());
    }
}
