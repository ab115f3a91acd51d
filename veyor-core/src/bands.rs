//! Validated category band table and gap classification.

use veyor_model::CategoryBand;

use crate::error::BandError;

/// Classification of a gap between two consecutive scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapClass {
    /// Too short to count as downtime.
    BelowMinimum,
    /// Falls inside the band at this index.
    Band(usize),
    /// At or above the break threshold; assumed shift break, not downtime.
    Break,
}

/// An ordered, contiguous set of half-open duration bands.
///
/// Validated once at startup so a malformed table can never be discovered
/// mid-shift. Bands are lower-inclusive and upper-exclusive throughout: a gap
/// exactly at a bound belongs to the band whose minimum is that value, and a
/// gap exactly at the top band's maximum is a break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandTable {
    bands: Vec<CategoryBand>,
}

impl BandTable {
    pub fn new(bands: Vec<CategoryBand>) -> Result<Self, BandError> {
        let Some(first) = bands.first() else {
            return Err(BandError::Empty);
        };
        if first.min_seconds <= 0 {
            return Err(BandError::NonPositiveBound {
                name: first.name.clone(),
                min_seconds: first.min_seconds,
            });
        }
        for band in &bands {
            if band.min_seconds >= band.max_seconds {
                return Err(BandError::InvertedBand {
                    name: band.name.clone(),
                    min_seconds: band.min_seconds,
                    max_seconds: band.max_seconds,
                });
            }
        }
        for pair in bands.windows(2) {
            if pair[0].max_seconds != pair[1].min_seconds {
                return Err(BandError::NotContiguous {
                    previous: pair[0].name.clone(),
                    next: pair[1].name.clone(),
                    previous_max: pair[0].max_seconds,
                    next_min: pair[1].min_seconds,
                });
            }
        }
        Ok(BandTable { bands })
    }

    /// Default production bands: 20-60, 60-120, 120-780.
    pub fn standard() -> Self {
        BandTable {
            bands: vec![
                CategoryBand::new("20-60", 20, 60),
                CategoryBand::new("60-120", 60, 120),
                CategoryBand::new("120-780", 120, 780),
            ],
        }
    }

    pub fn bands(&self) -> &[CategoryBand] {
        &self.bands
    }

    pub fn get(&self, index: usize) -> Option<&CategoryBand> {
        self.bands.get(index)
    }

    /// Lowest gap that counts as downtime at all.
    pub fn minimum_gap(&self) -> i64 {
        self.bands[0].min_seconds
    }

    /// The longest-duration band.
    pub fn top_band(&self) -> &CategoryBand {
        &self.bands[self.bands.len() - 1]
    }

    /// Gaps at or above this are breaks, excluded from downtime accounting.
    pub fn break_threshold(&self) -> i64 {
        self.top_band().max_seconds
    }

    pub fn classify(&self, gap_seconds: i64) -> GapClass {
        if gap_seconds < self.minimum_gap() {
            return GapClass::BelowMinimum;
        }
        if gap_seconds >= self.break_threshold() {
            return GapClass::Break;
        }
        // Bands are contiguous, so a gap between the bounds always lands.
        for (index, band) in self.bands.iter().enumerate() {
            if band.contains(gap_seconds) {
                return GapClass::Band(index);
            }
        }
        unreachable!("contiguous band table left {gap_seconds}s unclassified")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> BandTable {
        BandTable::standard()
    }

    #[test]
    fn standard_table_validates() {
        let table = BandTable::new(vec![
            CategoryBand::new("20-60", 20, 60),
            CategoryBand::new("60-120", 60, 120),
            CategoryBand::new("120-780", 120, 780),
        ])
        .unwrap();
        assert_eq!(table.minimum_gap(), 20);
        assert_eq!(table.break_threshold(), 780);
    }

    #[test]
    fn empty_table_rejected() {
        assert_eq!(BandTable::new(vec![]), Err(BandError::Empty));
    }

    #[test]
    fn inverted_band_rejected() {
        let err = BandTable::new(vec![CategoryBand::new("bad", 60, 20)]).unwrap_err();
        assert!(matches!(err, BandError::InvertedBand { .. }));
    }

    #[test]
    fn gapped_table_rejected() {
        let err = BandTable::new(vec![
            CategoryBand::new("20-60", 20, 60),
            CategoryBand::new("90-120", 90, 120),
        ])
        .unwrap_err();
        assert!(matches!(err, BandError::NotContiguous { .. }));
    }

    #[test]
    fn overlapping_table_rejected() {
        let err = BandTable::new(vec![
            CategoryBand::new("20-60", 20, 60),
            CategoryBand::new("50-120", 50, 120),
        ])
        .unwrap_err();
        assert!(matches!(err, BandError::NotContiguous { .. }));
    }

    #[test]
    fn non_positive_lower_bound_rejected() {
        let err = BandTable::new(vec![CategoryBand::new("0-60", 0, 60)]).unwrap_err();
        assert!(matches!(err, BandError::NonPositiveBound { .. }));
    }

    #[test]
    fn classify_interior_values() {
        let table = standard();
        assert_eq!(table.classify(0), GapClass::BelowMinimum);
        assert_eq!(table.classify(19), GapClass::BelowMinimum);
        assert_eq!(table.classify(45), GapClass::Band(0));
        assert_eq!(table.classify(100), GapClass::Band(1));
        assert_eq!(table.classify(500), GapClass::Band(2));
        assert_eq!(table.classify(10_000), GapClass::Break);
    }

    #[test]
    fn classify_is_lower_inclusive_upper_exclusive_at_every_bound() {
        let table = standard();
        assert_eq!(table.classify(20), GapClass::Band(0));
        assert_eq!(table.classify(59), GapClass::Band(0));
        assert_eq!(table.classify(60), GapClass::Band(1));
        assert_eq!(table.classify(119), GapClass::Band(1));
        assert_eq!(table.classify(120), GapClass::Band(2));
        assert_eq!(table.classify(779), GapClass::Band(2));
        assert_eq!(table.classify(780), GapClass::Break);
    }
}
