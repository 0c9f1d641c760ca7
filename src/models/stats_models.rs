// src/models/stats_models.rs

use serde::{Deserialize, Serialize};

/// Counts of classified pairs, plus the number of pairs scoring below the
/// potential range (the "clearly different" pairs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_pairs: usize,
    pub certain: usize,
    pub potential: usize,
    pub negative: usize,
    pub below_potential: usize,
    pub histogram: ScoreHistogram,
}

/// Fixed-edge histogram of classification scores.
///
/// Bins are half-open `[edges[i], edges[i + 1])` except the last one, which
/// also includes its upper edge. Scores outside `[edges[0], edges[n]]` are not
/// counted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl ScoreHistogram {
    /// `bins` equal-width bins spanning `[lo, hi]`.
    pub fn uniform(scores: &[f64], bins: usize, lo: f64, hi: f64) -> Self {
        if bins == 0 || !(hi > lo) {
            return Self::default();
        }
        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        Self::with_edges(scores, edges)
    }

    pub fn with_edges(scores: &[f64], edges: Vec<f64>) -> Self {
        if edges.len() < 2 {
            return Self {
                edges,
                counts: Vec::new(),
            };
        }
        let last = edges.len() - 2;
        let mut counts = vec![0usize; edges.len() - 1];
        for &score in scores {
            if score < edges[0] || score > edges[edges.len() - 1] {
                continue;
            }
            // first edge strictly greater than the score, minus one
            let upper = edges.partition_point(|&e| e <= score);
            let bin = upper.saturating_sub(1).min(last);
            counts[bin] += 1;
        }
        Self { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Shape of an entity-group mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub groups: usize,
    pub records_clustered: usize,
    pub largest_group: usize,
    pub avg_group_size: f64,
}

impl ClusterStats {
    pub fn from_sizes(sizes: impl IntoIterator<Item = usize>) -> Self {
        let mut stats = ClusterStats::default();
        for size in sizes {
            stats.groups += 1;
            stats.records_clustered += size;
            stats.largest_group = stats.largest_group.max(size);
        }
        if stats.groups > 0 {
            stats.avg_group_size = stats.records_clustered as f64 / stats.groups as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_histogram_includes_top_edge() {
        let scores = [0.0, 0.5, 1.0, 2.0, 2.0, 2.5];
        let hist = ScoreHistogram::uniform(&scores, 2, 0.0, 2.0);
        assert_eq!(hist.edges, vec![0.0, 1.0, 2.0]);
        // 0.0, 0.5 | 1.0, 2.0, 2.0 ; 2.5 is out of range
        assert_eq!(hist.counts, vec![2, 3]);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn test_degenerate_histograms() {
        assert_eq!(ScoreHistogram::uniform(&[1.0], 0, 0.0, 1.0), ScoreHistogram::default());
        assert!(ScoreHistogram::with_edges(&[1.0], vec![1.0]).counts.is_empty());
    }

    #[test]
    fn test_cluster_stats() {
        let stats = ClusterStats::from_sizes([3, 2, 5]);
        assert_eq!(stats.groups, 3);
        assert_eq!(stats.records_clustered, 10);
        assert_eq!(stats.largest_group, 5);
        assert!((stats.avg_group_size - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(ClusterStats::from_sizes([]).avg_group_size, 0.0);
    }
}
