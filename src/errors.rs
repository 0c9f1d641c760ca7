// src/errors.rs

use thiserror::Error;

/// Crate-wide result alias for the matching core.
pub type Result<T> = std::result::Result<T, LinkageError>;

/// Errors raised by the matching core.
///
/// Two families exist. Configuration errors are raised while a
/// `MatchingConfig` is being built or validated, before any pair is touched.
/// Data-integrity errors mean the record snapshot and the pairs handed to the
/// core disagree; they abort the run with no partial output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkageError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("field '{field}': unknown comparison rule kind '{kind}'")]
    UnknownRuleKind { field: String, kind: String },

    #[error("field '{field}': unknown {family} method '{method}'")]
    UnknownMethod {
        field: String,
        family: &'static str,
        method: String,
    },

    #[error("field '{field}': string rule requires a threshold")]
    MissingThreshold { field: String },

    #[error("{what} must lie in [0, 1], got {value}")]
    ValueOutOfUnitRange { what: String, value: f64 },

    #[error("field '{field}': numeric scale must be positive, got {scale}")]
    InvalidNumericScale { field: String, scale: f64 },

    #[error("field '{field}': numeric offset must be non-negative, got {offset}")]
    InvalidNumericOffset { field: String, offset: f64 },

    #[error("range '{name}' is malformed: [{lo}, {hi})")]
    MalformedRange { name: &'static str, lo: f64, hi: f64 },

    #[error("ranges overlap: certain [{certain_lo}, {certain_hi}) vs potential [{potential_lo}, {potential_hi})")]
    OverlappingRanges {
        certain_lo: f64,
        certain_hi: f64,
        potential_lo: f64,
        potential_hi: f64,
    },

    #[error("certain range must sit above the potential range")]
    RangesInverted,

    #[error("window must be a positive odd integer, got {0}")]
    InvalidWindow(i64),

    #[error("no comparison rules configured")]
    NoRules,

    #[error("column '{0}' is defined more than once")]
    DuplicateColumn(String),

    #[error("sum rule '{rule}' references unknown column '{column}'")]
    UnknownSumColumn { rule: String, column: String },

    #[error("sum rule '{0}' has no constituent fields")]
    EmptySumRule(String),

    #[error("classification score column '{0}' is neither a field nor a sum rule")]
    UnknownScoreColumn(String),

    #[error("no classification score column given and none can be inferred")]
    MissingScoreColumn,

    #[error("range '{name}' starts at {lo}, above the highest attainable score {max}")]
    RangeUnreachable { name: &'static str, lo: f64, max: f64 },

    #[error("clustering shard count must be at least 1")]
    InvalidShardCount,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataIntegrityError {
    #[error("pair ({left}, {right}) references unknown record id '{missing}'")]
    UnknownRecordId {
        left: String,
        right: String,
        missing: String,
    },

    #[error("record id '{0}' appears more than once in the record set")]
    DuplicateRecordId(String),

    #[error("pair ({0}, {0}) links a record to itself")]
    SelfPair(String),

    #[error("blocking field '{field}' mixes incomparable value types ({first} and {second})")]
    MixedKeyTypes {
        field: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("field '{field}': comparison table was scored with {table}, config compares with {expected}")]
    RuleMismatch {
        field: String,
        table: String,
        expected: String,
    },

    #[error("comparison table columns {table:?} do not match configured fields {expected:?}")]
    SchemaMismatch {
        table: Vec<String>,
        expected: Vec<String>,
    },
}

impl LinkageError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, LinkageError::Configuration(_))
    }

    pub fn is_data_integrity(&self) -> bool {
        matches!(self, LinkageError::DataIntegrity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let cfg: LinkageError = ConfigurationError::InvalidWindow(2).into();
        assert!(cfg.is_configuration());
        assert!(!cfg.is_data_integrity());
        assert_eq!(
            cfg.to_string(),
            "configuration error: window must be a positive odd integer, got 2"
        );

        let data: LinkageError = DataIntegrityError::DuplicateRecordId("7".into()).into();
        assert!(data.is_data_integrity());
        assert!(data.to_string().contains("'7'"));
    }
}
