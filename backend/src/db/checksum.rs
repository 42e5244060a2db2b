//! Fingerprints used to decide whether a stored row is still current.

use sha2::{Digest, Sha256};

use crate::models::TripRecord;

/// Calculate SHA-256 checksum of arbitrary content, hex encoded.
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of the export-side fields of a trip.
///
/// The record is serialized with its field order fixed by the struct, so two
/// equal records always hash the same.
pub fn record_fingerprint(record: &TripRecord) -> String {
    let canonical = serde_json::json!({
        "trip_id": record.trip_id,
        "manual_distance": record.manual_distance,
        "lack_of_accuracy": record.lack_of_accuracy,
    });
    calculate_checksum(&canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripId;

    #[test]
    fn test_checksum_consistency() {
        let content = r#"{"trip_id": 1}"#;
        assert_eq!(calculate_checksum(content), calculate_checksum(content));
        assert_eq!(calculate_checksum(content).len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_export_fields() {
        let mut record = TripRecord::bare(TripId::new(12));
        let before = record_fingerprint(&record);

        record.manual_distance = Some(14.2);
        let after = record_fingerprint(&record);
        assert_ne!(before, after);

        record.lack_of_accuracy = true;
        assert_ne!(after, record_fingerprint(&record));
    }

    #[test]
    fn test_fingerprint_ignores_event_time() {
        let mut record = TripRecord::bare(TripId::new(12));
        let before = record_fingerprint(&record);
        record.event_time = crate::models::from_unix_seconds(1_700_000_000);
        assert_eq!(before, record_fingerprint(&record));
    }
}
