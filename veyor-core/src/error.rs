use thiserror::Error;
use veyor_model::LocationId;

/// Rejections raised while validating a category band table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BandError {
    #[error("band table is empty")]
    Empty,

    #[error("band '{name}' has non-positive lower bound {min_seconds}")]
    NonPositiveBound { name: String, min_seconds: i64 },

    #[error("band '{name}' is inverted: [{min_seconds}, {max_seconds})")]
    InvertedBand {
        name: String,
        min_seconds: i64,
        max_seconds: i64,
    },

    #[error(
        "bands '{previous}' and '{next}' are not contiguous: {previous_max} != {next_min}"
    )]
    NotContiguous {
        previous: String,
        next: String,
        previous_max: i64,
        next_min: i64,
    },
}

/// Contract breaches: scans the ingestor promised would never reach the
/// engine. These indicate a bug upstream, not bad data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("scan for untracked location '{0}' reached the engine")]
    UntrackedLocation(LocationId),

    #[error("scan at '{location}' carries untracked status '{status}'")]
    UntrackedStatus {
        location: LocationId,
        status: String,
    },
}
