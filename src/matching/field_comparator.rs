// src/matching/field_comparator.rs

use indicatif::ProgressBar;
use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{ComparisonRule, FieldRule, MatchingConfig};
use crate::errors::{DataIntegrityError, Result};
use crate::matching::comparators::similarity;
use crate::models::{CandidatePair, ComparisonVector, Record, RecordSet};

/// Score a field contributes once rule thresholds and the global floor apply.
///
/// A missing value scores 0. A string similarity below its rule threshold is
/// cut to 0, never scaled. The floor then zeroes any remaining score below it.
pub fn thresholded_score(rule: &ComparisonRule, raw: Option<f64>, floor: Option<f64>) -> f64 {
    let score = match (rule, raw) {
        (_, None) => return 0.0,
        (ComparisonRule::StringSim { threshold, .. }, Some(s)) if s < *threshold => 0.0,
        (_, Some(s)) => s,
    };
    match floor {
        Some(floor) if score < floor => 0.0,
        _ => score,
    }
}

/// Applies the configured field rules to candidate pairs.
///
/// Stateless apart from the borrowed config, so pairs can be compared in any
/// order and on any thread.
pub struct FieldComparator<'a> {
    config: &'a MatchingConfig,
}

impl<'a> FieldComparator<'a> {
    pub fn new(config: &'a MatchingConfig) -> Self {
        Self { config }
    }

    /// Comparison vector for one pair. For deduplication pass the same set as
    /// `left` and `right`.
    pub fn compare(
        &self,
        pair: &CandidatePair,
        left: &RecordSet,
        right: &RecordSet,
    ) -> Result<ComparisonVector> {
        let a = lookup(pair, left, &pair.left)?;
        let b = lookup(pair, right, &pair.right)?;

        let floor = self.config.min_field_score();
        let rules = self.config.rules();
        let mut raw = Vec::with_capacity(rules.len());
        let mut scores = Vec::with_capacity(rules.len());
        for FieldRule { field, rule } in rules {
            let value = match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => Some(similarity(rule, x, y)),
                _ => None,
            };
            scores.push(thresholded_score(rule, value, floor));
            raw.push(value);
        }
        Ok(ComparisonVector {
            pair: pair.clone(),
            raw,
            scores,
        })
    }

    /// Compares every pair on a dedicated pool of `workers` threads. Output
    /// is in the order of `pairs`; the first unknown id aborts the whole
    /// batch.
    pub fn compare_all(
        &self,
        pairs: &[CandidatePair],
        left: &RecordSet,
        right: &RecordSet,
        workers: usize,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<ComparisonVector>> {
        let run = || {
            pairs
                .par_iter()
                .map(|pair| {
                    let vector = self.compare(pair, left, right);
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    vector
                })
                .collect::<Result<Vec<_>>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
        {
            Ok(pool) => {
                debug!("Comparing {} pairs on {} threads", pairs.len(), pool.current_num_threads());
                pool.install(run)
            }
            Err(e) => {
                warn!("Failed to build comparison thread pool ({}), using the global pool", e);
                run()
            }
        }
    }
}

fn lookup<'r>(
    pair: &CandidatePair,
    set: &'r RecordSet,
    id: &crate::models::RecordId,
) -> Result<&'r Record> {
    set.get(id).ok_or_else(|| {
        DataIntegrityError::UnknownRecordId {
            left: pair.left.to_string(),
            right: pair.right.to_string(),
            missing: id.to_string(),
        }
        .into()
    })
}
