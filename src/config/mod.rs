pub mod matching_config;
pub mod ranges;
pub mod rules;
pub mod settings;

pub use self::matching_config::{ColumnRef, MatchingConfig, RawMatchingConfig};
pub use self::ranges::{ClassificationRanges, ScoreRange};
pub use self::rules::{ComparisonRule, FieldRule, NumericMethod, StringMethod, SumRule};
pub use self::settings::RunSettings;
