//! Stateful derivation of downtime events from consecutive scans.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use veyor_model::{
    DowntimeEvent, LocationId, LocationSummary, ScanRecord, ShiftStatistics,
    TrackingId,
};

use crate::bands::{BandTable, GapClass};
use crate::error::EngineError;

/// The scan a cursor last advanced to, kept so the next scan at the same
/// location can describe both ends of its gap.
#[derive(Debug, Clone)]
struct ScanPoint {
    timestamp: DateTime<Utc>,
    tracking_id: TrackingId,
    status: String,
}

impl ScanPoint {
    fn from_scan(scan: &ScanRecord) -> Self {
        ScanPoint {
            timestamp: scan.timestamp,
            tracking_id: scan.tracking_id.clone(),
            status: scan.status.clone(),
        }
    }
}

/// Per-location mutable state. One cursor per tracked location, created at
/// engine construction and reset at shift start.
#[derive(Debug, Default)]
struct LocationCursor {
    last_scan: Option<ScanPoint>,
    total_downtime_seconds: i64,
    events: Vec<DowntimeEvent>,
    category_counts: BTreeMap<String, u32>,
}

impl LocationCursor {
    fn advance(&mut self, scan: &ScanRecord) {
        self.last_scan = Some(ScanPoint::from_scan(scan));
    }

    fn summary(&self) -> LocationSummary {
        let event_count = self.events.len();
        LocationSummary {
            total_downtime_seconds: self.total_downtime_seconds,
            event_count,
            category_counts: self.category_counts.clone(),
            last_scan_time: self.last_scan.as_ref().map(|s| s.timestamp),
            average_downtime_seconds: self.total_downtime_seconds
                / event_count.max(1) as i64,
        }
    }
}

/// Why a scan was refused without touching cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Timestamp precedes the cursor's last scan: out-of-order delivery or a
    /// stale duplicate. Data-quality incident, never fatal.
    OutOfOrder { gap_seconds: i64 },
}

/// Result of feeding one scan through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// No prior reference point existed; the cursor now has one.
    FirstScan,
    /// Scan refused; cursor unchanged.
    Rejected(RejectReason),
    /// Gap too short to count as downtime. Cursor advanced.
    BelowMinimum { gap_seconds: i64 },
    /// Gap at or above the break threshold. Cursor advanced, totals
    /// untouched.
    Break { gap_seconds: i64 },
    /// Gap landed in a category band; the event was also recorded against
    /// the location's running totals.
    Event(DowntimeEvent),
}

/// Rollup of one `process_batch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub events: Vec<DowntimeEvent>,
    pub processed: usize,
    pub rejected: usize,
    /// Scans that violated the ingestor's filtering contract and were
    /// skipped. Nonzero means an upstream bug.
    pub contract_breaches: usize,
}

/// Turns an ordered stream of scans into categorized downtime events and
/// running per-shift totals.
///
/// Single-threaded by construction: all state lives in the cursor map and is
/// mutated only through `process`. Callers that parallelize ingestion must
/// serialize calls per location.
#[derive(Debug)]
pub struct DowntimeEngine {
    bands: BandTable,
    tracked_locations: HashSet<LocationId>,
    tracked_statuses: HashSet<String>,
    cursors: HashMap<LocationId, LocationCursor>,
}

impl DowntimeEngine {
    pub fn new(
        bands: BandTable,
        tracked_locations: impl IntoIterator<Item = LocationId>,
        tracked_statuses: impl IntoIterator<Item = String>,
    ) -> Self {
        let tracked_locations: HashSet<LocationId> =
            tracked_locations.into_iter().collect();
        let cursors = tracked_locations
            .iter()
            .map(|loc| (loc.clone(), LocationCursor::default()))
            .collect();
        DowntimeEngine {
            bands,
            tracked_locations,
            tracked_statuses: tracked_statuses.into_iter().collect(),
            cursors,
        }
    }

    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    /// Process one pre-validated scan.
    ///
    /// Returns `Err` only for contract breaches (untracked location or
    /// status), which the ingestor guarantees cannot happen. Bad data that
    /// can legitimately occur (out-of-order timestamps) comes back as
    /// `Ok(ProcessOutcome::Rejected)`.
    pub fn process(
        &mut self,
        scan: &ScanRecord,
    ) -> Result<ProcessOutcome, EngineError> {
        if !self.tracked_locations.contains(&scan.location) {
            return Err(EngineError::UntrackedLocation(scan.location.clone()));
        }
        if !self.tracked_statuses.contains(&scan.status) {
            return Err(EngineError::UntrackedStatus {
                location: scan.location.clone(),
                status: scan.status.clone(),
            });
        }

        let cursor = self
            .cursors
            .get_mut(&scan.location)
            .expect("cursor exists for every tracked location");

        let Some(last) = cursor.last_scan.as_ref() else {
            cursor.advance(scan);
            debug!(location = %scan.location, "first scan recorded");
            return Ok(ProcessOutcome::FirstScan);
        };

        let gap_seconds = (scan.timestamp - last.timestamp).num_seconds();
        if gap_seconds < 0 {
            debug!(
                location = %scan.location,
                gap_seconds,
                "rejecting out-of-order scan"
            );
            return Ok(ProcessOutcome::Rejected(RejectReason::OutOfOrder {
                gap_seconds,
            }));
        }

        match self.bands.classify(gap_seconds) {
            GapClass::BelowMinimum => {
                cursor.advance(scan);
                Ok(ProcessOutcome::BelowMinimum { gap_seconds })
            }
            GapClass::Break => {
                debug!(
                    location = %scan.location,
                    gap_seconds,
                    "ignoring gap above break threshold"
                );
                cursor.advance(scan);
                Ok(ProcessOutcome::Break { gap_seconds })
            }
            GapClass::Band(index) => {
                let band = self
                    .bands
                    .get(index)
                    .expect("classify returned a valid band index");
                let event = DowntimeEvent {
                    location: scan.location.clone(),
                    duration_seconds: gap_seconds,
                    category: band.name.clone(),
                    start_timestamp: last.timestamp,
                    end_timestamp: scan.timestamp,
                    start_tracking_id: last.tracking_id.clone(),
                    end_tracking_id: scan.tracking_id.clone(),
                    start_status: last.status.clone(),
                    end_status: scan.status.clone(),
                    detected_at: Utc::now(),
                };
                cursor.total_downtime_seconds += gap_seconds;
                *cursor
                    .category_counts
                    .entry(event.category.clone())
                    .or_insert(0) += 1;
                cursor.events.push(event.clone());
                cursor.advance(scan);
                info!(
                    location = %event.location,
                    duration_seconds = event.duration_seconds,
                    category = %event.category,
                    "downtime detected"
                );
                Ok(ProcessOutcome::Event(event))
            }
        }
    }

    /// Process a batch of scans in ascending timestamp order.
    ///
    /// Contract breaches are logged and skipped rather than aborting the
    /// batch; in debug builds they also assert, so upstream filtering bugs
    /// surface during development.
    pub fn process_batch(&mut self, scans: &[ScanRecord]) -> BatchOutcome {
        let mut ordered: Vec<&ScanRecord> = scans.iter().collect();
        ordered.sort_by_key(|scan| scan.timestamp);

        let mut outcome = BatchOutcome::default();
        for scan in ordered {
            match self.process(scan) {
                Ok(ProcessOutcome::Event(event)) => {
                    outcome.events.push(event);
                    outcome.processed += 1;
                }
                Ok(ProcessOutcome::Rejected(reason)) => {
                    debug!(location = %scan.location, ?reason, "scan rejected");
                    outcome.rejected += 1;
                }
                Ok(_) => outcome.processed += 1,
                Err(err) => {
                    error!(%err, "scan violated the ingestor contract");
                    debug_assert!(false, "ingestor contract breach: {err}");
                    outcome.contract_breaches += 1;
                }
            }
        }
        outcome
    }

    /// Snapshot of cumulative downtime per location. Read-only; repeated
    /// calls without an intervening `process` return identical maps.
    pub fn totals(&self) -> BTreeMap<LocationId, i64> {
        self.cursors
            .iter()
            .map(|(loc, cursor)| (loc.clone(), cursor.total_downtime_seconds))
            .collect()
    }

    /// Per-location summaries for reporting.
    pub fn summaries(&self) -> BTreeMap<LocationId, LocationSummary> {
        self.cursors
            .iter()
            .map(|(loc, cursor)| (loc.clone(), cursor.summary()))
            .collect()
    }

    /// Shift-wide statistics across all tracked locations.
    pub fn statistics(&self) -> ShiftStatistics {
        let total_events: usize =
            self.cursors.values().map(|c| c.events.len()).sum();
        let total_downtime_seconds: i64 = self
            .cursors
            .values()
            .map(|c| c.total_downtime_seconds)
            .sum();
        let mut category_distribution: BTreeMap<String, u32> = BTreeMap::new();
        for cursor in self.cursors.values() {
            for (category, count) in &cursor.category_counts {
                *category_distribution.entry(category.clone()).or_insert(0) +=
                    count;
            }
        }
        ShiftStatistics {
            total_events,
            total_downtime_seconds,
            average_downtime_seconds: total_downtime_seconds
                / total_events.max(1) as i64,
            category_distribution,
            active_locations: self
                .cursors
                .values()
                .filter(|c| c.last_scan.is_some())
                .count(),
        }
    }

    /// Events detected at or after `since`, newest first.
    pub fn recent_events(&self, since: DateTime<Utc>) -> Vec<DowntimeEvent> {
        let mut events: Vec<DowntimeEvent> = self
            .cursors
            .values()
            .flat_map(|cursor| cursor.events.iter())
            .filter(|event| event.detected_at >= since)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        events
    }

    /// Clear cursor state for one location, or for all when `location` is
    /// `None`. Idempotent; used at shift start.
    pub fn reset(&mut self, location: Option<&LocationId>) {
        match location {
            Some(location) => {
                if let Some(cursor) = self.cursors.get_mut(location) {
                    info!(%location, "resetting cursor");
                    *cursor = LocationCursor::default();
                }
            }
            None => {
                info!("resetting all cursors for new shift");
                for cursor in self.cursors.values_mut() {
                    *cursor = LocationCursor::default();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> DowntimeEngine {
        DowntimeEngine::new(
            BandTable::standard(),
            ["GA1", "GA2"].map(LocationId::from),
            ["INDUCTED".to_string()],
        )
    }

    fn scan(location: &str, offset_seconds: i64) -> ScanRecord {
        let base = Utc.with_ymd_and_hms(2025, 6, 13, 2, 0, 0).unwrap();
        let timestamp = base + chrono::Duration::seconds(offset_seconds);
        ScanRecord {
            tracking_id: TrackingId::new(format!("T{offset_seconds}")),
            location: LocationId::from(location),
            status: "INDUCTED".to_string(),
            timestamp,
            raw_timestamp: timestamp.to_rfc3339(),
            scraped_at: timestamp,
        }
    }

    #[test]
    fn first_scan_emits_nothing_and_total_stays_zero() {
        let mut engine = engine();
        let outcome = engine.process(&scan("GA1", 0)).unwrap();
        assert_eq!(outcome, ProcessOutcome::FirstScan);
        assert_eq!(engine.totals()[&LocationId::from("GA1")], 0);
    }

    #[test]
    fn gap_below_minimum_advances_cursor_without_event() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        let outcome = engine.process(&scan("GA1", 19)).unwrap();
        assert_eq!(outcome, ProcessOutcome::BelowMinimum { gap_seconds: 19 });
        assert_eq!(engine.totals()[&LocationId::from("GA1")], 0);

        // The 19s scan became the reference point: 19 + 26 = 45s gap next.
        let outcome = engine.process(&scan("GA1", 45)).unwrap();
        match outcome {
            ProcessOutcome::Event(event) => {
                assert_eq!(event.duration_seconds, 26);
                assert_eq!(event.category, "20-60");
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn boundary_gaps_land_in_the_lower_inclusive_band() {
        let cases = [
            (20, Some("20-60")),
            (59, Some("20-60")),
            (60, Some("60-120")),
            (119, Some("60-120")),
            (120, Some("120-780")),
            (779, Some("120-780")),
            (780, None),
        ];
        for (gap, expected) in cases {
            let mut engine = engine();
            engine.process(&scan("GA1", 0)).unwrap();
            let outcome = engine.process(&scan("GA1", gap)).unwrap();
            match (outcome, expected) {
                (ProcessOutcome::Event(event), Some(category)) => {
                    assert_eq!(event.category, category, "gap {gap}");
                    assert_eq!(event.duration_seconds, gap);
                    assert_eq!(
                        engine.totals()[&LocationId::from("GA1")],
                        gap,
                        "gap {gap}"
                    );
                }
                (ProcessOutcome::Break { gap_seconds }, None) => {
                    assert_eq!(gap_seconds, gap);
                    assert_eq!(engine.totals()[&LocationId::from("GA1")], 0);
                }
                (other, expected) => {
                    panic!("gap {gap}: expected {expected:?}, got {other:?}")
                }
            }
        }
    }

    #[test]
    fn break_gap_excluded_from_total_but_advances_cursor() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        engine.process(&scan("GA1", 900)).unwrap();
        assert_eq!(engine.totals()[&LocationId::from("GA1")], 0);

        // Reference point moved to t=900, so t=950 is a 50s gap.
        let outcome = engine.process(&scan("GA1", 950)).unwrap();
        match outcome {
            ProcessOutcome::Event(event) => {
                assert_eq!(event.duration_seconds, 50)
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn out_of_order_scan_rejected_without_state_change() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        engine.process(&scan("GA1", 100)).unwrap();
        let before = engine.totals();

        let outcome = engine.process(&scan("GA1", 40)).unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Rejected(RejectReason::OutOfOrder {
                gap_seconds: -60
            })
        );
        assert_eq!(engine.totals(), before);

        // Cursor still points at t=100: t=160 is a 60s gap, not 120s.
        let outcome = engine.process(&scan("GA1", 160)).unwrap();
        match outcome {
            ProcessOutcome::Event(event) => {
                assert_eq!(event.duration_seconds, 60);
                assert_eq!(event.category, "60-120");
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_timestamp_is_a_zero_gap_not_a_rejection() {
        let mut engine = engine();
        engine.process(&scan("GA1", 100)).unwrap();
        let outcome = engine.process(&scan("GA1", 100)).unwrap();
        assert_eq!(outcome, ProcessOutcome::BelowMinimum { gap_seconds: 0 });
    }

    #[test]
    fn untracked_location_is_a_contract_breach() {
        let mut engine = engine();
        let err = engine.process(&scan("ZZ9", 0)).unwrap_err();
        assert_eq!(err, EngineError::UntrackedLocation(LocationId::from("ZZ9")));
    }

    #[test]
    fn untracked_status_is_a_contract_breach() {
        let mut engine = engine();
        let mut bad = scan("GA1", 0);
        bad.status = "DELIVERED".to_string();
        let err = engine.process(&bad).unwrap_err();
        assert!(matches!(err, EngineError::UntrackedStatus { .. }));
    }

    #[test]
    fn totals_snapshot_is_idempotent() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        engine.process(&scan("GA1", 45)).unwrap();
        let first = engine.totals();
        let second = engine.totals();
        assert_eq!(first, second);
    }

    #[test]
    fn interleaved_locations_match_isolated_processing() {
        let ga1_offsets = [0, 45, 150, 400];
        let ga2_offsets = [10, 80, 130, 700];

        let mut interleaved = engine();
        let mut merged: Vec<ScanRecord> = ga1_offsets
            .iter()
            .map(|&t| scan("GA1", t))
            .chain(ga2_offsets.iter().map(|&t| scan("GA2", t)))
            .collect();
        merged.sort_by_key(|s| s.timestamp);
        for s in &merged {
            interleaved.process(s).unwrap();
        }

        let mut isolated = engine();
        for &t in &ga1_offsets {
            isolated.process(&scan("GA1", t)).unwrap();
        }
        for &t in &ga2_offsets {
            isolated.process(&scan("GA2", t)).unwrap();
        }

        assert_eq!(interleaved.totals(), isolated.totals());
        assert_eq!(interleaved.summaries(), isolated.summaries());
    }

    #[test]
    fn reset_single_location_returns_cursor_to_initial_state() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        engine.process(&scan("GA1", 45)).unwrap();
        engine.process(&scan("GA2", 0)).unwrap();
        engine.process(&scan("GA2", 100)).unwrap();

        engine.reset(Some(&LocationId::from("GA1")));

        assert_eq!(engine.totals()[&LocationId::from("GA1")], 0);
        assert_eq!(engine.totals()[&LocationId::from("GA2")], 100);

        // First scan after reset emits nothing again.
        let outcome = engine.process(&scan("GA1", 500)).unwrap();
        assert_eq!(outcome, ProcessOutcome::FirstScan);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        engine.reset(None);
        let after_first = engine.totals();
        engine.reset(None);
        assert_eq!(engine.totals(), after_first);
    }

    #[test]
    fn batch_sorts_out_of_order_input_before_processing() {
        let mut engine = engine();
        let scans =
            vec![scan("GA1", 150), scan("GA1", 0), scan("GA1", 45)];
        let outcome = engine.process_batch(&scans);

        assert_eq!(outcome.rejected, 0);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.events[0].duration_seconds, 45);
        assert_eq!(outcome.events[1].duration_seconds, 105);
        assert_eq!(engine.totals()[&LocationId::from("GA1")], 150);
    }

    #[test]
    fn recent_events_filters_by_detection_time_newest_first() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        let cutoff = Utc::now();
        engine.process(&scan("GA1", 45)).unwrap();
        engine.process(&scan("GA2", 0)).unwrap();
        engine.process(&scan("GA2", 200)).unwrap();

        let recent = engine.recent_events(cutoff);
        assert_eq!(recent.len(), 2);
        assert!(recent[0].detected_at >= recent[1].detected_at);

        let far_future = cutoff + chrono::Duration::hours(1);
        assert!(engine.recent_events(far_future).is_empty());
    }

    #[test]
    fn statistics_roll_up_across_locations() {
        let mut engine = engine();
        engine.process(&scan("GA1", 0)).unwrap();
        engine.process(&scan("GA1", 45)).unwrap();
        engine.process(&scan("GA2", 0)).unwrap();
        engine.process(&scan("GA2", 200)).unwrap();

        let stats = engine.statistics();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.total_downtime_seconds, 245);
        assert_eq!(stats.active_locations, 2);
        assert_eq!(stats.category_distribution["20-60"], 1);
        assert_eq!(stats.category_distribution["120-780"], 1);
    }
}
