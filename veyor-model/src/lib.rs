//! Core data model definitions shared across Veyor crates.
#![allow(missing_docs)]

pub mod band;
pub mod event;
pub mod ids;
pub mod scan;
pub mod summary;

// Intentionally curated re-exports for downstream consumers.
pub use band::CategoryBand;
pub use event::DowntimeEvent;
pub use ids::{LocationId, TrackingId};
pub use scan::ScanRecord;
pub use summary::{LocationSummary, ShiftStatistics};
