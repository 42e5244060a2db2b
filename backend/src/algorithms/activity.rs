//! Activity log analysis: who completed a trip and how long it took.

use chrono::NaiveDateTime;

use super::round2;
use crate::models::ActivityEvent;

const STATUS_ENROUTE: &str = "enroute";
const STATUS_COMPLETED: &str = "completed";

fn transition_time(event: &ActivityEvent, status: &str) -> Option<NaiveDateTime> {
    let to = event.to_status.as_deref()?;
    if to.eq_ignore_ascii_case(status) {
        event.created_at
    } else {
        None
    }
}

/// `user_type` of the latest transition to `completed`.
///
/// Events without a parseable timestamp are ignored. Ties keep the first event seen.
pub fn determine_completed_by(events: &[ActivityEvent]) -> Option<String> {
    let mut best: Option<(NaiveDateTime, &ActivityEvent)> = None;
    for event in events {
        let Some(at) = transition_time(event, STATUS_COMPLETED) else {
            continue;
        };
        if best.map_or(true, |(best_at, _)| at > best_at) {
            best = Some((at, event));
        }
    }
    best.and_then(|(_, event)| event.user_type.clone())
}

/// Minutes between the earliest `enroute` and the latest `completed` transition.
///
/// # Returns
/// `None` unless both transitions exist and completion is strictly after enroute.
pub fn calculate_trip_time(events: &[ActivityEvent]) -> Option<f64> {
    let enroute = events
        .iter()
        .filter_map(|e| transition_time(e, STATUS_ENROUTE))
        .min()?;
    let completed = events
        .iter()
        .filter_map(|e| transition_time(e, STATUS_COMPLETED))
        .max()?;

    if completed <= enroute {
        return None;
    }
    let seconds = (completed - enroute).num_seconds() as f64;
    Some(round2(seconds / 60.0))
}
