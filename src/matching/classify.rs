// src/matching/classify.rs

use crate::config::{ClassificationRanges, MatchingConfig};
use crate::errors::{ConfigurationError, Result};
use crate::matching::comparison_table::ComparisonTable;
use crate::models::{ClassifiedPair, ClassifiedPairs, MatchLabel, ScoreHistogram, ScoreSummary};

pub fn classify(score: f64, ranges: &ClassificationRanges) -> MatchLabel {
    ranges.classify(score)
}

/// Labels every row of `table` using the config's score column and ranges.
pub fn classify_table(
    table: &ComparisonTable,
    score_column: &str,
    ranges: &ClassificationRanges,
) -> Result<ClassifiedPairs> {
    let scores = table
        .column(score_column)
        .ok_or_else(|| ConfigurationError::UnknownScoreColumn(score_column.to_string()))?;
    let mut classified = ClassifiedPairs::default();
    for (pair, &score) in table.pairs.iter().zip(scores) {
        classified.push(ClassifiedPair {
            pair: pair.clone(),
            score,
            label: ranges.classify(score),
        });
    }
    Ok(classified)
}

/// Label counts plus a histogram of `scores` over `[0, max_score]`.
pub fn summarize(
    scores: &[f64],
    ranges: &ClassificationRanges,
    bins: usize,
    max_score: f64,
) -> ScoreSummary {
    let mut summary = ScoreSummary {
        total_pairs: scores.len(),
        ..ScoreSummary::default()
    };
    let potential_lo = ranges.potential().lo;
    for &score in scores {
        match ranges.classify(score) {
            MatchLabel::Certain => summary.certain += 1,
            MatchLabel::Potential => summary.potential += 1,
            MatchLabel::Negative => summary.negative += 1,
        }
        if score < potential_lo {
            summary.below_potential += 1;
        }
    }
    summary.histogram = ScoreHistogram::uniform(scores, bins, 0.0, max_score);
    summary
}

/// Summary of a table under a config.
pub fn summarize_table(table: &ComparisonTable, config: &MatchingConfig, bins: usize) -> ScoreSummary {
    let scores = table.column(config.score_column()).unwrap_or(&[]);
    summarize(
        scores,
        config.ranges(),
        bins,
        config.max_attainable(config.score_column()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldRule, ScoreRange, SumRule};
    use crate::models::{CandidatePair, ComparisonVector};

    fn ranges() -> ClassificationRanges {
        ClassificationRanges::new(ScoreRange::new(2.0, 2.01), ScoreRange::new(1.0, 2.0)).unwrap()
    }

    fn table() -> (MatchingConfig, ComparisonTable) {
        let config = MatchingConfig::new(
            "name",
            1,
            vec![FieldRule::exact("name"), FieldRule::date("birth")],
            vec![SumRule::new("total", ["name", "birth"])],
            None,
            ranges(),
            None,
        )
        .unwrap();
        let rows = [[1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [0.0, 1.0]];
        let vectors = rows
            .iter()
            .enumerate()
            .map(|(i, r)| ComparisonVector {
                pair: CandidatePair::unordered(format!("{}", i).into(), "x".into()),
                raw: r.iter().map(|s| Some(*s)).collect(),
                scores: r.to_vec(),
            })
            .collect();
        let table = ComparisonTable::from_vectors(&config, vectors);
        (config, table)
    }

    #[test]
    fn test_classify_table_splits_labels() {
        let (config, table) = table();
        let classified = classify_table(&table, config.score_column(), config.ranges()).unwrap();
        assert_eq!(classified.certain.len(), 1);
        assert_eq!(classified.potential.len(), 2);
        assert_eq!(classified.negative.len(), 1);
        assert_eq!(classified.certain[0].pair.left.as_str(), "0");
        assert_eq!(classified.certain[0].score, 2.0);

        let err = classify_table(&table, "cpf", config.ranges()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_boundary_scores() {
        let r = ranges();
        assert_eq!(classify(2.0, &r), MatchLabel::Certain);
        assert_eq!(classify(2.0 - 1e-9, &r), MatchLabel::Potential);
        assert_eq!(classify(0.99, &r), MatchLabel::Negative);
    }

    #[test]
    fn test_summary_counts_and_histogram() {
        let (config, table) = table();
        let summary = summarize_table(&table, &config, 2);
        assert_eq!(summary.total_pairs, 4);
        assert_eq!(summary.certain, 1);
        assert_eq!(summary.potential, 2);
        assert_eq!(summary.negative, 1);
        assert_eq!(summary.below_potential, 1);
        assert_eq!(summary.histogram.edges, vec![0.0, 1.0, 2.0]);
        assert_eq!(summary.histogram.counts, vec![1, 3]);
    }
}
