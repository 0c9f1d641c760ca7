// src/matching/comparison_table.rs

use serde::{Deserialize, Serialize};

use crate::config::MatchingConfig;
use crate::errors::{DataIntegrityError, Result};
use crate::matching::aggregate::ScoreAggregator;
use crate::matching::field_comparator::thresholded_score;
use crate::models::{CandidatePair, ComparisonVector};

/// Column-oriented table of comparison results, one row per candidate pair.
///
/// Raw similarities are kept next to the thresholded scores so a table can be
/// rescored or reclassified without comparing records again. The config
/// fingerprint records which rules produced the current scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub config_fingerprint: String,
    pub fields: Vec<String>,
    /// Comparator of each field, see [`ComparisonRule::comparator`].
    ///
    /// [`ComparisonRule::comparator`]: crate::config::ComparisonRule::comparator
    #[serde(default)]
    pub comparators: Vec<String>,
    pub sum_columns: Vec<String>,
    pub pairs: Vec<CandidatePair>,
    /// `raw[field][row]`; `None` where a value was missing.
    pub raw: Vec<Vec<Option<f64>>>,
    /// `scores[field][row]`, after thresholds.
    pub scores: Vec<Vec<f64>>,
    /// `sums[sum_rule][row]`.
    pub sums: Vec<Vec<f64>>,
}

impl ComparisonTable {
    pub fn from_vectors(config: &MatchingConfig, vectors: Vec<ComparisonVector>) -> Self {
        let fields = config.field_names();
        let mut raw: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(vectors.len()); fields.len()];
        let mut scores: Vec<Vec<f64>> = vec![Vec::with_capacity(vectors.len()); fields.len()];
        let mut pairs = Vec::with_capacity(vectors.len());
        for vector in vectors {
            for (col, value) in vector.raw.iter().enumerate().take(fields.len()) {
                raw[col].push(*value);
            }
            for (col, value) in vector.scores.iter().enumerate().take(fields.len()) {
                scores[col].push(*value);
            }
            pairs.push(vector.pair);
        }

        let aggregator = ScoreAggregator::new(config);
        let sums = aggregator.aggregate_columns(&scores, pairs.len());
        Self {
            config_fingerprint: config.fingerprint(),
            fields,
            comparators: comparators(config),
            sum_columns: aggregator.names().to_vec(),
            pairs,
            raw,
            scores,
            sums,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// A field score column or a sum column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        if let Some(pos) = self.sum_columns.iter().position(|c| c == name) {
            return self.sums.get(pos).map(Vec::as_slice);
        }
        self.fields
            .iter()
            .position(|f| f == name)
            .and_then(|pos| self.scores.get(pos))
            .map(Vec::as_slice)
    }

    /// Row `i` as a comparison vector. `None` past the end or when a column
    /// is shorter than the pair list.
    pub fn row(&self, i: usize) -> Option<ComparisonVector> {
        let pair = self.pairs.get(i)?.clone();
        Some(ComparisonVector {
            pair,
            raw: self.raw.iter().map(|col| col.get(i).copied()).collect::<Option<_>>()?,
            scores: self.scores.iter().map(|col| col.get(i).copied()).collect::<Option<_>>()?,
        })
    }

    /// Pairs with the field missing on at least one side, per field.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.fields
            .iter()
            .zip(&self.raw)
            .map(|(field, col)| (field.clone(), col.iter().filter(|v| v.is_none()).count()))
            .collect()
    }

    /// Recomputes thresholded scores and sums from the stored raw
    /// similarities under `config`. Fields and their comparators must match;
    /// only string thresholds, the floor, sum rules and ranges may differ.
    pub fn rescore(&mut self, config: &MatchingConfig) -> Result<()> {
        let expected = config.field_names();
        if expected != self.fields {
            return Err(DataIntegrityError::SchemaMismatch {
                table: self.fields.clone(),
                expected,
            }
            .into());
        }
        let expected = comparators(config);
        for (i, (field, wanted)) in self.fields.iter().zip(&expected).enumerate() {
            let stored = self
                .comparators
                .get(i)
                .map(String::as_str)
                .unwrap_or("an unrecorded comparator");
            if stored != wanted.as_str() {
                return Err(DataIntegrityError::RuleMismatch {
                    field: field.clone(),
                    table: stored.to_string(),
                    expected: wanted.clone(),
                }
                .into());
            }
        }
        let floor = config.min_field_score();
        self.scores = config
            .rules()
            .iter()
            .zip(&self.raw)
            .map(|(rule, col)| {
                col.iter()
                    .map(|value| thresholded_score(&rule.rule, *value, floor))
                    .collect()
            })
            .collect();
        let aggregator = ScoreAggregator::new(config);
        self.sums = aggregator.aggregate_columns(&self.scores, self.pairs.len());
        self.sum_columns = aggregator.names().to_vec();
        self.config_fingerprint = config.fingerprint();
        Ok(())
    }
}

fn comparators(config: &MatchingConfig) -> Vec<String> {
    config.rules().iter().map(|r| r.rule.comparator()).collect()
}
