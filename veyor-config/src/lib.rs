//! Shared configuration library for Veyor.
//!
//! This crate centralizes config loading and validation so the agent and any
//! future tooling share a single source of truth for defaults, managed keys,
//! and guard rails. Every configuration error is rejected here, at load time,
//! before a single scan is processed.
#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{
    AuthSettings, ConfigMetadata, DashboardConfig, DowntimeConfig,
    MonitorConfig, ReportingConfig, ShiftConfig, StorageConfig, TrackedConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
