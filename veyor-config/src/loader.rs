//! Config file discovery, parsing, and eager validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;
use tracing::debug;
use url::Url;

use veyor_core::BandTable;
use veyor_model::{CategoryBand, LocationId};

use crate::models::{
    AuthSettings, ConfigMetadata, DashboardConfig, DowntimeConfig,
    MonitorConfig, ReportingConfig, ShiftConfig, StorageConfig, TrackedConfig,
};
use crate::sources::{BandSource, FileConfig};
use crate::validation::{ConfigGuardRailError, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &["veyor.toml", "config/veyor.toml"];

const DEFAULT_DASHBOARD_URL: &str =
    "https://dashboard.internal.example/api/induct-scans";
const DEFAULT_WEBHOOK_URL: &str = "https://hooks.internal.example/veyor";
const DEFAULT_LOCATIONS: [&str; 10] = [
    "GA1", "GA2", "GA3", "GA4", "GA5", "GA6", "GA7", "GA8", "GA9", "GA10",
];
const DEFAULT_STATUSES: [&str; 4] =
    ["INDUCTED", "INDUCT", "STOW_BUFFER", "AT_STATION"];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file not found: {path}")]
    MissingConfig { path: PathBuf },

    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
}

/// Loaded configuration plus any non-fatal observations.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: MonitorConfig,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        let (file, source_path) = self.read_file_config()?;
        let used_defaults = source_path.is_none();
        if used_defaults {
            warnings.push_with_hint(
                "no config file found, using built-in defaults",
                "write veyor.toml or pass --config",
            );
        }
        let file = file.unwrap_or_default();

        let config = compose(file, source_path, used_defaults, &mut warnings)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn read_file_config(
        &self,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let path = match &self.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigLoadError::MissingConfig {
                        path: explicit.clone(),
                    });
                }
                explicit.clone()
            }
            None => {
                let Some(found) = DEFAULT_CONFIG_LOCATIONS
                    .iter()
                    .map(PathBuf::from)
                    .find(|candidate| candidate.exists())
                else {
                    return Ok((None, None));
                };
                found
            }
        };

        debug!(path = %path.display(), "loading config file");
        let raw = fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let parsed: FileConfig = toml::from_str(&raw).map_err(|source| {
            ConfigLoadError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        Ok((Some(parsed), Some(path)))
    }
}

fn compose(
    file: FileConfig,
    source_path: Option<PathBuf>,
    used_defaults: bool,
    warnings: &mut ConfigWarnings,
) -> Result<MonitorConfig, ConfigGuardRailError> {
    let dashboard_src = file.dashboard.unwrap_or_default();
    let locations_src = file.locations.unwrap_or_default();
    let downtime_src = file.downtime.unwrap_or_default();
    let reporting_src = file.reporting.unwrap_or_default();
    let shift_src = file.shift.unwrap_or_default();
    let storage_src = file.storage.unwrap_or_default();
    let auth_src = file.auth.unwrap_or_default();

    let dashboard = {
        let url_text = dashboard_src
            .url
            .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_string());
        let url = parse_url("dashboard", &url_text)?;
        let poll_interval_seconds =
            dashboard_src.poll_interval_seconds.unwrap_or(120);
        require_positive(
            "dashboard.poll_interval_seconds",
            poll_interval_seconds as i64,
        )?;
        DashboardConfig {
            url,
            poll_interval: Duration::from_secs(poll_interval_seconds),
            max_retries: dashboard_src.max_retries.unwrap_or(3),
            retry_base: Duration::from_secs(
                dashboard_src.retry_base_seconds.unwrap_or(5),
            ),
        }
    };

    let tracked = {
        let locations: Vec<LocationId> = locations_src
            .tracked
            .unwrap_or_else(|| {
                DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect()
            })
            .into_iter()
            .map(LocationId::from)
            .collect();
        if locations.is_empty() {
            return Err(ConfigGuardRailError::EmptyLocations);
        }
        let statuses = locations_src.statuses.unwrap_or_else(|| {
            DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect()
        });
        if statuses.is_empty() {
            return Err(ConfigGuardRailError::EmptyStatuses);
        }
        TrackedConfig {
            locations,
            statuses,
        }
    };

    let downtime = {
        let bands = match downtime_src.categories {
            Some(sources) => BandTable::new(
                sources.into_iter().map(band_from_source).collect(),
            )?,
            None => BandTable::standard(),
        };
        if let Some(configured) = downtime_src.break_threshold_seconds {
            if configured != bands.break_threshold() {
                return Err(ConfigGuardRailError::BreakThresholdMismatch {
                    configured,
                    top_band_max: bands.break_threshold(),
                });
            }
        }
        DowntimeConfig { bands }
    };

    let reporting = {
        let url_text = reporting_src.webhook_url.unwrap_or_else(|| {
            warnings.push_with_hint(
                "webhook URL not configured",
                "set reporting.webhook_url to receive reports",
            );
            DEFAULT_WEBHOOK_URL.to_string()
        });
        let webhook_url = parse_url("webhook", &url_text)?;
        let report_interval_seconds =
            reporting_src.report_interval_seconds.unwrap_or(1800);
        require_positive(
            "reporting.report_interval_seconds",
            report_interval_seconds as i64,
        )?;
        let shift_end_threshold_seconds =
            reporting_src.shift_end_threshold_seconds.unwrap_or(2100);
        require_positive(
            "reporting.shift_end_threshold_seconds",
            shift_end_threshold_seconds,
        )?;
        ReportingConfig {
            webhook_url,
            report_interval: Duration::from_secs(report_interval_seconds),
            shift_end_threshold_seconds,
        }
    };

    let shift = {
        let start =
            parse_time("shift.start", shift_src.start.as_deref(), "01:20")?;
        let end = parse_time("shift.end", shift_src.end.as_deref(), "08:30")?;
        let break_start = parse_time(
            "shift.break_start",
            shift_src.break_start.as_deref(),
            "04:55",
        )?;
        let break_end = parse_time(
            "shift.break_end",
            shift_src.break_end.as_deref(),
            "05:30",
        )?;
        let shift = ShiftConfig {
            start,
            end,
            break_start,
            break_end,
        };
        if !shift.is_active(break_start) || !shift.is_active(break_end) {
            return Err(ConfigGuardRailError::BreakOutsideShift {
                start: break_start.format("%H:%M").to_string(),
                end: break_end.format("%H:%M").to_string(),
            });
        }
        shift
    };

    let storage = StorageConfig {
        database_path: PathBuf::from(
            storage_src
                .database_path
                .unwrap_or_else(|| "veyor.db".to_string()),
        ),
    };

    let auth = AuthSettings {
        cookie_path: expand_home(
            &auth_src
                .cookie_path
                .unwrap_or_else(|| "~/.midway/cookie".to_string()),
        ),
    };

    Ok(MonitorConfig {
        dashboard,
        tracked,
        downtime,
        reporting,
        shift,
        storage,
        auth,
        metadata: ConfigMetadata {
            source_path,
            used_defaults,
        },
    })
}

fn band_from_source(source: BandSource) -> CategoryBand {
    CategoryBand::new(source.name, source.min, source.max)
}

fn parse_url(
    field: &'static str,
    value: &str,
) -> Result<Url, ConfigGuardRailError> {
    Url::parse(value).map_err(|source| ConfigGuardRailError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

fn require_positive(
    field: &'static str,
    value: i64,
) -> Result<(), ConfigGuardRailError> {
    if value <= 0 {
        return Err(ConfigGuardRailError::NonPositive { field, value });
    }
    Ok(())
}

fn parse_time(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<NaiveTime, ConfigGuardRailError> {
    let text = value.unwrap_or(default);
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| ConfigGuardRailError::InvalidTime {
            field,
            value: text.to_string(),
        })
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(path)
}
