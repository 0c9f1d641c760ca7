pub mod aggregate;
pub mod classify;
pub mod comparators;
pub mod comparison_table;
pub mod field_comparator;

pub use self::aggregate::ScoreAggregator;
pub use self::classify::{classify, classify_table, summarize, summarize_table};
pub use self::comparison_table::ComparisonTable;
pub use self::field_comparator::{thresholded_score, FieldComparator};
