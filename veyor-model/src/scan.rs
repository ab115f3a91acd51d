use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LocationId, TrackingId};

/// A single package scan observed at a conveyance station.
///
/// Produced by the dashboard ingestor, which guarantees the location and
/// status are drawn from the tracked sets before a record reaches the
/// downtime engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub tracking_id: TrackingId,
    pub location: LocationId,
    pub status: String,
    /// Parsed scan time, normalized to UTC.
    pub timestamp: DateTime<Utc>,
    /// Timestamp text exactly as the dashboard reported it.
    pub raw_timestamp: String,
    /// When the poll cycle that observed this scan ran.
    pub scraped_at: DateTime<Utc>,
}
