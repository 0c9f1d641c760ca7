pub mod core;
pub mod matching;
pub mod stats_models;

pub use self::core::{FieldValue, Record, RecordId, RecordSet};
pub use self::matching::{
    CandidatePair, ClassifiedPair, ClassifiedPairs, ComparisonVector, MatchLabel,
};
pub use self::stats_models::{ClusterStats, ScoreHistogram, ScoreSummary};
