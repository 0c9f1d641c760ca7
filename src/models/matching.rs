// src/models/matching.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::core::RecordId;

/// A pair of record ids selected for detailed comparison.
///
/// In deduplication mode both ids come from the same record set and the pair
/// is stored with `left < right`, so `(a, b)` and `(b, a)` are the same pair.
/// In linkage mode `left` always belongs to the left data set and `right` to
/// the right one; no reordering happens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    pub left: RecordId,
    pub right: RecordId,
}

impl CandidatePair {
    /// Unordered pair within one data set.
    pub fn unordered(a: RecordId, b: RecordId) -> Self {
        if a <= b {
            Self { left: a, right: b }
        } else {
            Self { left: b, right: a }
        }
    }

    /// Cross-data-set pair; side matters.
    pub fn linked(left: RecordId, right: RecordId) -> Self {
        Self { left, right }
    }
}

impl fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.left, self.right)
    }
}

/// Per-field similarity scores for one candidate pair, aligned with the rule
/// order of the `MatchingConfig` that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonVector {
    pub pair: CandidatePair,
    /// Similarity before any threshold is applied; `None` when either record
    /// lacks the field.
    pub raw: Vec<Option<f64>>,
    /// Score after rule thresholds and the global field floor. Missing values
    /// score 0.0.
    pub scores: Vec<f64>,
}

impl ComparisonVector {
    pub fn score_of(&self, fields: &[String], field: &str) -> Option<f64> {
        fields
            .iter()
            .position(|f| f == field)
            .and_then(|pos| self.scores.get(pos).copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLabel {
    Certain,
    Potential,
    Negative,
}

impl MatchLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchLabel::Certain => "certain",
            MatchLabel::Potential => "potential",
            MatchLabel::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPair {
    pub pair: CandidatePair,
    pub score: f64,
    pub label: MatchLabel,
}

/// Classified pairs split by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPairs {
    pub certain: Vec<ClassifiedPair>,
    pub potential: Vec<ClassifiedPair>,
    pub negative: Vec<ClassifiedPair>,
}

impl ClassifiedPairs {
    pub fn push(&mut self, pair: ClassifiedPair) {
        match pair.label {
            MatchLabel::Certain => self.certain.push(pair),
            MatchLabel::Potential => self.potential.push(pair),
            MatchLabel::Negative => self.negative.push(pair),
        }
    }

    pub fn len(&self) -> usize {
        self.certain.len() + self.potential.len() + self.negative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn by_label(&self, label: MatchLabel) -> &[ClassifiedPair] {
        match label {
            MatchLabel::Certain => &self.certain,
            MatchLabel::Potential => &self.potential,
            MatchLabel::Negative => &self.negative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unordered_pair_is_symmetric() {
        let ab = CandidatePair::unordered("b".into(), "a".into());
        let ba = CandidatePair::unordered("a".into(), "b".into());
        assert_eq!(ab, ba);
        assert_eq!(ab.left.as_str(), "a");

        let linked = CandidatePair::linked("b".into(), "a".into());
        assert_eq!(linked.left.as_str(), "b");
    }

    #[test]
    fn test_classified_pairs_split_by_label() {
        let mut split = ClassifiedPairs::default();
        for (i, label) in [MatchLabel::Certain, MatchLabel::Negative, MatchLabel::Certain]
            .into_iter()
            .enumerate()
        {
            split.push(ClassifiedPair {
                pair: CandidatePair::unordered(format!("{}", i).into(), "z".into()),
                score: 1.0,
                label,
            });
        }
        assert_eq!(split.len(), 3);
        assert_eq!(split.by_label(MatchLabel::Certain).len(), 2);
        assert!(split.potential.is_empty());
    }
}
