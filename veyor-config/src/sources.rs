//! Raw, serde-deserializable config as it appears in the TOML file.
//!
//! Everything here is optional; the loader fills gaps from built-in defaults
//! and the validated shapes live in [`crate::models`].

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dashboard: Option<DashboardSource>,
    pub locations: Option<LocationsSource>,
    pub downtime: Option<DowntimeSource>,
    pub reporting: Option<ReportingSource>,
    pub shift: Option<ShiftSource>,
    pub storage: Option<StorageSource>,
    pub auth: Option<AuthSource>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardSource {
    pub url: Option<String>,
    pub poll_interval_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_seconds: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationsSource {
    pub tracked: Option<Vec<String>>,
    pub statuses: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DowntimeSource {
    pub categories: Option<Vec<BandSource>>,
    pub break_threshold_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandSource {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportingSource {
    pub webhook_url: Option<String>,
    pub report_interval_seconds: Option<u64>,
    pub shift_end_threshold_seconds: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShiftSource {
    /// Wall-clock times as `HH:MM` (or `HH:MM:SS`) strings.
    pub start: Option<String>,
    pub end: Option<String>,
    pub break_start: Option<String>,
    pub break_end: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSource {
    pub database_path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSource {
    pub cookie_path: Option<String>,
}
