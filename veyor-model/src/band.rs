use serde::{Deserialize, Serialize};

/// A half-open downtime duration band: `[min_seconds, max_seconds)`.
///
/// A gap exactly at `min_seconds` belongs to this band; a gap exactly at
/// `max_seconds` belongs to the next band up (or counts as a break when this
/// is the top band).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBand {
    pub name: String,
    pub min_seconds: i64,
    pub max_seconds: i64,
}

impl CategoryBand {
    pub fn new(name: impl Into<String>, min_seconds: i64, max_seconds: i64) -> Self {
        CategoryBand {
            name: name.into(),
            min_seconds,
            max_seconds,
        }
    }

    /// Whether `gap_seconds` falls inside this band.
    pub fn contains(&self, gap_seconds: i64) -> bool {
        gap_seconds >= self.min_seconds && gap_seconds < self.max_seconds
    }
}

impl std::fmt::Display for CategoryBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}, {})",
            self.name, self.min_seconds, self.max_seconds
        )
    }
}
