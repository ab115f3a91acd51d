use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LocationId, TrackingId};

/// A categorized idle gap between two consecutive scans at one location.
///
/// Immutable once emitted by the engine. The bounding tracking ids and
/// statuses are carried so the store and reporter can show what the station
/// was doing on either side of the gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeEvent {
    pub location: LocationId,
    pub duration_seconds: i64,
    /// Name of the category band the gap fell into, e.g. `120-780`.
    pub category: String,
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    pub start_tracking_id: TrackingId,
    pub end_tracking_id: TrackingId,
    pub start_status: String,
    pub end_status: String,
    pub detected_at: DateTime<Utc>,
}
