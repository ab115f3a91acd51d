//! Store behavior against an in-memory SQLite database.

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};

use veyor_agent::store::ScanStore;
use veyor_model::{
    DowntimeEvent, LocationId, LocationSummary, ScanRecord, TrackingId,
};

fn scan(tracking: &str, location: &str, offset_seconds: i64) -> ScanRecord {
    let base = Utc.with_ymd_and_hms(2025, 6, 13, 2, 0, 0).unwrap();
    let timestamp = base + Duration::seconds(offset_seconds);
    ScanRecord {
        tracking_id: TrackingId::new(tracking),
        location: LocationId::from(location),
        status: "INDUCTED".to_string(),
        timestamp,
        raw_timestamp: timestamp.to_rfc3339(),
        scraped_at: base,
    }
}

fn event(location: &str, duration: i64) -> DowntimeEvent {
    let base = Utc.with_ymd_and_hms(2025, 6, 13, 2, 0, 0).unwrap();
    DowntimeEvent {
        location: LocationId::from(location),
        duration_seconds: duration,
        category: "20-60".to_string(),
        start_timestamp: base,
        end_timestamp: base + Duration::seconds(duration),
        start_tracking_id: TrackingId::new("T1"),
        end_tracking_id: TrackingId::new("T2"),
        start_status: "INDUCTED".to_string(),
        end_status: "INDUCTED".to_string(),
        detected_at: base + Duration::seconds(duration),
    }
}

#[tokio::test]
async fn raw_scans_are_insert_ignore_on_tracking_id_and_timestamp() {
    let store = ScanStore::open_in_memory().await.unwrap();

    let scans = vec![scan("T1", "GA1", 0), scan("T2", "GA1", 45)];
    assert_eq!(store.insert_scans(&scans).await.unwrap(), 2);

    // Re-storing an overlapping poll window inserts nothing new.
    let overlapping =
        vec![scan("T2", "GA1", 45), scan("T3", "GA2", 60)];
    assert_eq!(store.insert_scans(&overlapping).await.unwrap(), 1);

    let all = store
        .recent_scans(None, Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    // Newest first.
    assert_eq!(all[0].tracking_id.as_str(), "T3");
}

#[tokio::test]
async fn recent_scans_filters_by_location_and_since() {
    let store = ScanStore::open_in_memory().await.unwrap();
    store
        .insert_scans(&[
            scan("T1", "GA1", 0),
            scan("T2", "GA2", 100),
            scan("T3", "GA1", 200),
        ])
        .await
        .unwrap();

    let ga1 = LocationId::from("GA1");
    let since = Utc.with_ymd_and_hms(2025, 6, 13, 2, 1, 0).unwrap();
    let rows = store.recent_scans(Some(&ga1), since).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tracking_id.as_str(), "T3");
    assert_eq!(rows[0].location, ga1);
}

#[tokio::test]
async fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("veyor-test.db");

    let store = ScanStore::open(&path).await.unwrap();
    store.insert_scans(&[scan("T1", "GA1", 0)]).await.unwrap();
    store.insert_events(&[event("GA1", 45)]).await.unwrap();
    drop(store);

    let reopened = ScanStore::open(&path).await.unwrap();
    assert_eq!(reopened.event_count().await.unwrap(), 1);
    let rows = reopened
        .recent_scans(None, Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn events_round_trip_through_the_count() {
    let store = ScanStore::open_in_memory().await.unwrap();
    store
        .insert_events(&[event("GA1", 45), event("GA2", 30)])
        .await
        .unwrap();
    assert_eq!(store.event_count().await.unwrap(), 2);
}

#[tokio::test]
async fn daily_summaries_upsert_per_date_and_location() {
    let store = ScanStore::open_in_memory().await.unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 13).unwrap();

    let mut summaries = BTreeMap::new();
    summaries.insert(
        LocationId::from("GA1"),
        LocationSummary {
            total_downtime_seconds: 245,
            event_count: 3,
            category_counts: [("20-60".to_string(), 3)].into_iter().collect(),
            last_scan_time: None,
            average_downtime_seconds: 81,
        },
    );
    store.upsert_daily_summaries(date, &summaries).await.unwrap();

    // Upserting the same date+location replaces rather than duplicates.
    summaries
        .get_mut(&LocationId::from("GA1"))
        .unwrap()
        .total_downtime_seconds = 300;
    store.upsert_daily_summaries(date, &summaries).await.unwrap();
}
