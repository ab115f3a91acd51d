use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-location rollup of downtime activity for the current shift.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationSummary {
    pub total_downtime_seconds: i64,
    pub event_count: usize,
    /// Event counts keyed by category band name.
    pub category_counts: BTreeMap<String, u32>,
    pub last_scan_time: Option<DateTime<Utc>>,
    pub average_downtime_seconds: i64,
}

/// Shift-wide statistics across every tracked location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShiftStatistics {
    pub total_events: usize,
    pub total_downtime_seconds: i64,
    pub average_downtime_seconds: i64,
    pub category_distribution: BTreeMap<String, u32>,
    /// Locations that have seen at least one scan this shift.
    pub active_locations: usize,
}
