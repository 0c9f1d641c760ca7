// src/matching/aggregate.rs

use crate::config::{ColumnRef, MatchingConfig};
use crate::models::ComparisonVector;

/// Evaluates the sum rules of a config.
///
/// Column names are resolved once at construction. Each sum is the plain
/// arithmetic sum of its constituents, taken in the order they are listed;
/// a constituent may be an earlier sum.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    names: Vec<String>,
    plan: Vec<Vec<ColumnRef>>,
}

impl ScoreAggregator {
    pub fn new(config: &MatchingConfig) -> Self {
        let plan = config
            .sum_rules()
            .iter()
            .map(|sum| {
                sum.fields
                    .iter()
                    .filter_map(|name| config.resolve_column(name))
                    .collect()
            })
            .collect();
        Self {
            names: config.sum_rules().iter().map(|s| s.name.clone()).collect(),
            plan,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Sum-rule outputs for one vector, in rule order.
    pub fn aggregate(&self, vector: &ComparisonVector) -> Vec<f64> {
        let mut sums: Vec<f64> = Vec::with_capacity(self.plan.len());
        for refs in &self.plan {
            let mut total = 0.0;
            for column in refs {
                total += match *column {
                    ColumnRef::Field(i) => vector.scores.get(i).copied().unwrap_or(0.0),
                    ColumnRef::Sum(j) => sums.get(j).copied().unwrap_or(0.0),
                };
            }
            sums.push(total);
        }
        sums
    }

    /// Column-major variant over a whole table of thresholded field scores.
    pub fn aggregate_columns(&self, scores: &[Vec<f64>], rows: usize) -> Vec<Vec<f64>> {
        let mut sums: Vec<Vec<f64>> = Vec::with_capacity(self.plan.len());
        for refs in &self.plan {
            let mut total = vec![0.0; rows];
            for column in refs {
                let source = match *column {
                    ColumnRef::Field(i) => scores.get(i),
                    ColumnRef::Sum(j) => sums.get(j),
                };
                if let Some(source) = source {
                    for (acc, value) in total.iter_mut().zip(source) {
                        *acc += value;
                    }
                }
            }
            sums.push(total);
        }
        sums
    }
}
