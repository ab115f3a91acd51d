//! Validated configuration types handed to the rest of the system.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use url::Url;

use veyor_core::BandTable;
use veyor_model::LocationId;

/// Fully validated monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub dashboard: DashboardConfig,
    pub tracked: TrackedConfig,
    pub downtime: DowntimeConfig,
    pub reporting: ReportingConfig,
    pub shift: ShiftConfig,
    pub storage: StorageConfig,
    pub auth: AuthSettings,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub url: Url,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub retry_base: Duration,
}

#[derive(Debug, Clone)]
pub struct TrackedConfig {
    pub locations: Vec<LocationId>,
    pub statuses: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DowntimeConfig {
    /// Validated, contiguous category bands.
    pub bands: BandTable,
}

#[derive(Debug, Clone)]
pub struct ReportingConfig {
    pub webhook_url: Url,
    pub report_interval: Duration,
    pub shift_end_threshold_seconds: i64,
}

/// The operational shift window plus the scheduled mid-shift break.
///
/// Scans inside the break window are expected to produce gaps above the break
/// threshold, so interval reports are suppressed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftConfig {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub break_start: NaiveTime,
    pub break_end: NaiveTime,
}

impl ShiftConfig {
    /// Whether the shift is active at `now`, handling overnight shifts where
    /// the start time is later in the day than the end time.
    pub fn is_active(&self, now: NaiveTime) -> bool {
        if self.start > self.end {
            now >= self.start || now <= self.end
        } else {
            now >= self.start && now <= self.end
        }
    }

    /// Whether `now` falls inside the scheduled break window.
    pub fn in_break(&self, now: NaiveTime) -> bool {
        now >= self.break_start && now <= self.break_end
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Netscape-format cookie file holding the dashboard session.
    pub cookie_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub source_path: Option<PathBuf>,
    /// True when no config file was found and built-in defaults were used.
    pub used_defaults: bool,
}
