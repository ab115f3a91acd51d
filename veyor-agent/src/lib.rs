//! # Veyor Agent
//!
//! Polling agent for conveyance-station downtime monitoring:
//!
//! - **Ingestor**: fetches the dashboard feed over HTTPS with cookie-file
//!   auth, filters to the tracked location/status sets, and hands the engine
//!   a deduplicated, time-ordered batch.
//! - **Store**: persists raw scans, emitted downtime events, and daily
//!   summaries to SQLite.
//! - **Reporter**: posts interval reports, threshold alerts, and shift
//!   summaries to a webhook.
//! - **Monitor**: the shift-gated scheduler driving all of the above.
//!
//! The downtime derivation itself lives in `veyor-core`; nothing in this
//! crate touches cursor state except through the engine's public calls.
#![allow(missing_docs)]

pub mod ingest;
pub mod monitor;
pub mod notify;
pub mod store;
