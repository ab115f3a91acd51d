//! Guard rails applied to raw config before the system starts.

use thiserror::Error;

use veyor_core::error::BandError;

/// Hard failures: the configuration cannot be used.
#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("invalid category bands: {0}")]
    Bands(#[from] BandError),

    #[error(
        "break threshold {configured}s does not match the top band's maximum {top_band_max}s"
    )]
    BreakThresholdMismatch {
        configured: i64,
        top_band_max: i64,
    },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    #[error("tracked location set is empty")]
    EmptyLocations,

    #[error("tracked status set is empty")]
    EmptyStatuses,

    #[error("invalid {field} time '{value}': expected HH:MM")]
    InvalidTime { field: &'static str, value: String },

    #[error("break window {start}-{end} is not inside the shift window")]
    BreakOutsideShift { start: String, end: String },

    #[error("invalid {field} URL '{value}'")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// A non-fatal config observation surfaced to the operator at startup.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
