// src/config/ranges.rs

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigurationError, Result};
use crate::models::MatchLabel;

/// Half-open score interval `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ScoreRange {
    pub lo: f64,
    pub hi: f64,
}

impl ScoreRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.lo && score < self.hi
    }

    fn check(&self, name: &'static str) -> Result<()> {
        if self.lo.is_finite() && self.hi.is_finite() && self.lo >= 0.0 && self.lo < self.hi {
            Ok(())
        } else {
            Err(ConfigurationError::MalformedRange {
                name,
                lo: self.lo,
                hi: self.hi,
            }
            .into())
        }
    }

    fn overlaps(&self, other: &ScoreRange) -> bool {
        self.lo < other.hi && other.lo < self.hi
    }
}

impl From<[f64; 2]> for ScoreRange {
    fn from([lo, hi]: [f64; 2]) -> Self {
        ScoreRange { lo, hi }
    }
}

impl From<ScoreRange> for [f64; 2] {
    fn from(range: ScoreRange) -> Self {
        [range.lo, range.hi]
    }
}

/// The certain and potential score bands. Anything outside both is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRanges", into = "RawRanges")]
pub struct ClassificationRanges {
    certain: ScoreRange,
    potential: ScoreRange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawRanges {
    certain: ScoreRange,
    potential: ScoreRange,
}

impl ClassificationRanges {
    /// Validates that both ranges are well formed, disjoint, and that the
    /// certain band sits above the potential one.
    pub fn new(certain: ScoreRange, potential: ScoreRange) -> Result<Self> {
        certain.check("certain")?;
        potential.check("potential")?;
        if certain.overlaps(&potential) {
            return Err(ConfigurationError::OverlappingRanges {
                certain_lo: certain.lo,
                certain_hi: certain.hi,
                potential_lo: potential.lo,
                potential_hi: potential.hi,
            }
            .into());
        }
        if certain.lo < potential.hi {
            return Err(ConfigurationError::RangesInverted.into());
        }
        Ok(Self { certain, potential })
    }

    pub fn certain(&self) -> ScoreRange {
        self.certain
    }

    pub fn potential(&self) -> ScoreRange {
        self.potential
    }

    pub fn classify(&self, score: f64) -> MatchLabel {
        if self.certain.contains(score) {
            MatchLabel::Certain
        } else if self.potential.contains(score) {
            MatchLabel::Potential
        } else {
            MatchLabel::Negative
        }
    }
}

impl TryFrom<RawRanges> for ClassificationRanges {
    type Error = crate::errors::LinkageError;

    fn try_from(raw: RawRanges) -> Result<Self> {
        ClassificationRanges::new(raw.certain, raw.potential)
    }
}

impl From<ClassificationRanges> for RawRanges {
    fn from(ranges: ClassificationRanges) -> Self {
        RawRanges {
            certain: ranges.certain,
            potential: ranges.potential,
        }
    }
}
