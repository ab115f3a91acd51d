//! Threshold alert derivation over engine totals.
//!
//! Pure and idempotent: deriving twice from unchanged totals yields the same
//! alert set. Suppressing already-sent alerts is the reporter's job.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use veyor_model::{LocationId, LocationSummary};

/// A location whose cumulative shift downtime reached the alert threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdAlert {
    pub location: LocationId,
    pub total_downtime_seconds: i64,
    pub threshold_seconds: i64,
    pub event_count: usize,
    pub last_scan_time: Option<DateTime<Utc>>,
}

/// Locations at or above `threshold_seconds` of cumulative downtime, in
/// location order.
pub fn locations_over_threshold(
    summaries: &BTreeMap<LocationId, LocationSummary>,
    threshold_seconds: i64,
) -> Vec<ThresholdAlert> {
    summaries
        .iter()
        .filter(|(_, summary)| {
            summary.total_downtime_seconds >= threshold_seconds
        })
        .map(|(location, summary)| ThresholdAlert {
            location: location.clone(),
            total_downtime_seconds: summary.total_downtime_seconds,
            threshold_seconds,
            event_count: summary.event_count,
            last_scan_time: summary.last_scan_time,
        })
        .collect()
}
