//! Downtime derivation engine for the Veyor monitor.
//!
//! The engine is a pure state machine: it consumes pre-validated scan records
//! in timestamp order, keeps one cursor per tracked location, and emits
//! categorized downtime events plus running per-shift totals. It performs no
//! I/O of its own; fetching, persistence, and notification live in
//! `veyor-agent`.
#![allow(missing_docs)]

pub mod alerts;
pub mod bands;
pub mod engine;
pub mod error;

pub use alerts::{ThresholdAlert, locations_over_threshold};
pub use bands::{BandTable, GapClass};
pub use engine::{BatchOutcome, DowntimeEngine, ProcessOutcome, RejectReason};
pub use error::{BandError, EngineError};
