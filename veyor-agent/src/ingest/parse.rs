//! Extraction of scan records from the dashboard's JSON payload.
//!
//! The feed nests the interesting fields several levels deep and has shipped
//! under at least three envelope shapes (`data`, `results`, bare array), so
//! everything here is defensive: rows that do not carry the full field set
//! are dropped rather than failing the batch.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use veyor_model::{LocationId, ScanRecord, TrackingId};

/// Tracked location/status sets applied while extracting.
///
/// This filter is the engine's contract: only records passing it are ever
/// handed to `DowntimeEngine::process`.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    locations: HashSet<String>,
    statuses: HashSet<String>,
}

impl RecordFilter {
    pub fn new(
        locations: impl IntoIterator<Item = LocationId>,
        statuses: impl IntoIterator<Item = String>,
    ) -> Self {
        RecordFilter {
            locations: locations.into_iter().map(|l| l.0).collect(),
            statuses: statuses.into_iter().collect(),
        }
    }

    fn admits(&self, location: &str, status: &str) -> bool {
        self.locations.contains(location) && self.statuses.contains(status)
    }
}

/// Pull filtered, deduplicated, time-ordered scan records out of a payload.
pub fn extract_records(
    payload: &Value,
    filter: &RecordFilter,
    scraped_at: DateTime<Utc>,
) -> Vec<ScanRecord> {
    let rows: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => {
            if let Some(Value::Array(items)) = payload.get("data") {
                items.iter().collect()
            } else if let Some(Value::Array(items)) = payload.get("results") {
                items.iter().collect()
            } else {
                vec![payload]
            }
        }
        _ => {
            warn!("dashboard payload is neither an object nor an array");
            return Vec::new();
        }
    };

    let mut seen: HashSet<(TrackingId, DateTime<Utc>)> = HashSet::new();
    let mut records: Vec<ScanRecord> = rows
        .into_iter()
        .filter_map(|row| parse_row(row, filter, scraped_at))
        .filter(|record| {
            seen.insert((record.tracking_id.clone(), record.timestamp))
        })
        .collect();
    records.sort_by_key(|record| record.timestamp);
    records
}

fn parse_row(
    row: &Value,
    filter: &RecordFilter,
    scraped_at: DateTime<Utc>,
) -> Option<ScanRecord> {
    let status =
        nested_text(row, &["compLastScanInOrder", "internalStatusCode"])?;
    let tracking_id = nested_text(row, &["trackingId"])?;
    let location = nested_text(row, &["Induct", "destination", "id"])?;
    let raw_timestamp = nested_text(row, &["lastScanInOrder", "timestamp"])?;

    if !filter.admits(&location, &status) {
        return None;
    }

    let Some(timestamp) = parse_timestamp(&raw_timestamp) else {
        debug!(raw_timestamp, "could not parse scan timestamp; row dropped");
        return None;
    };

    Some(ScanRecord {
        tracking_id: TrackingId::new(tracking_id),
        location: LocationId::new(location),
        status,
        timestamp,
        raw_timestamp,
        scraped_at,
    })
}

/// Walk a key path into a JSON object, stringifying the leaf.
fn nested_text(value: &Value, keys: &[&str]) -> Option<String> {
    let mut current = value;
    for key in keys {
        current = current.get(key)?;
    }
    match current {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse the handful of timestamp shapes the feed has produced, falling back
/// to epoch seconds or milliseconds for all-digit values.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        let epoch: i64 = text.parse().ok()?;
        if epoch >= 1_000_000_000_000 {
            return DateTime::from_timestamp_millis(epoch);
        }
        if epoch >= 1_000_000_000 {
            return DateTime::from_timestamp(epoch, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter() -> RecordFilter {
        RecordFilter::new(
            [LocationId::from("GA1"), LocationId::from("GA2")],
            ["INDUCTED".to_string(), "AT_STATION".to_string()],
        )
    }

    fn row(tracking: &str, location: &str, status: &str, ts: &str) -> Value {
        json!({
            "trackingId": tracking,
            "compLastScanInOrder": { "internalStatusCode": status },
            "Induct": { "destination": { "id": location } },
            "lastScanInOrder": { "timestamp": ts },
        })
    }

    #[test]
    fn extracts_from_data_envelope() {
        let payload = json!({ "data": [
            row("T1", "GA1", "INDUCTED", "2025-06-13T02:00:00Z"),
            row("T2", "GA2", "AT_STATION", "2025-06-13T02:01:00Z"),
        ]});
        let records = extract_records(&payload, &filter(), Utc::now());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tracking_id.as_str(), "T1");
        assert_eq!(records[0].location.as_str(), "GA1");
    }

    #[test]
    fn extracts_from_results_envelope_and_bare_array() {
        let inner = vec![row("T1", "GA1", "INDUCTED", "2025-06-13T02:00:00Z")];
        let as_results = json!({ "results": inner.clone() });
        let as_array = json!(inner);
        assert_eq!(
            extract_records(&as_results, &filter(), Utc::now()).len(),
            1
        );
        assert_eq!(extract_records(&as_array, &filter(), Utc::now()).len(), 1);
    }

    #[test]
    fn untracked_rows_and_incomplete_rows_are_dropped() {
        let payload = json!({ "data": [
            row("T1", "GA9", "INDUCTED", "2025-06-13T02:00:00Z"),
            row("T2", "GA1", "DELIVERED", "2025-06-13T02:00:00Z"),
            { "trackingId": "T3" },
            row("T4", "GA1", "INDUCTED", "2025-06-13T02:00:00Z"),
        ]});
        let records = extract_records(&payload, &filter(), Utc::now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tracking_id.as_str(), "T4");
    }

    #[test]
    fn duplicates_are_removed_and_output_is_time_ordered() {
        let payload = json!({ "data": [
            row("T2", "GA1", "INDUCTED", "2025-06-13T02:05:00Z"),
            row("T1", "GA1", "INDUCTED", "2025-06-13T02:00:00Z"),
            row("T1", "GA1", "INDUCTED", "2025-06-13T02:00:00Z"),
        ]});
        let records = extract_records(&payload, &filter(), Utc::now());
        assert_eq!(records.len(), 2);
        assert!(records[0].timestamp < records[1].timestamp);
    }

    #[test]
    fn timestamp_formats() {
        let expected =
            DateTime::from_timestamp(1_749_780_000, 0).unwrap();
        for text in [
            "2025-06-13T02:00:00Z",
            "2025-06-13T02:00:00.000Z",
            "2025-06-13 02:00:00",
            "2025-06-13T02:00:00",
            "2025-06-13 02:00:00.000",
            "1749780000",
            "1749780000000",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "{text}");
        }
        assert_eq!(parse_timestamp("not a time"), None);
        assert_eq!(parse_timestamp("1234"), None);
    }

    #[test]
    fn numeric_leaves_are_stringified() {
        let payload = json!({ "data": [{
            "trackingId": 12345,
            "compLastScanInOrder": { "internalStatusCode": "INDUCTED" },
            "Induct": { "destination": { "id": "GA1" } },
            "lastScanInOrder": { "timestamp": 1749780000 },
        }]});
        let records = extract_records(&payload, &filter(), Utc::now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tracking_id.as_str(), "12345");
    }
}
