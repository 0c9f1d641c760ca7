// src/config/matching_config.rs

use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::config::ranges::ClassificationRanges;
use crate::config::rules::{check_unit, FieldRule, RawFieldRule, SumRule};
use crate::errors::{ConfigurationError, LinkageError, Result};

/// Everything that stays fixed for the lifetime of one matching run.
///
/// Construct with [`MatchingConfig::new`] or [`MatchingConfig::from_json_str`];
/// both validate, so a value of this type is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatchingConfig", into = "RawMatchingConfig")]
pub struct MatchingConfig {
    blocking_field: String,
    window: usize,
    rules: Vec<FieldRule>,
    sum_rules: Vec<SumRule>,
    score_column: String,
    ranges: ClassificationRanges,
    min_field_score: Option<f64>,
}

/// On-disk form of the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatchingConfig {
    pub blocking_field: String,
    pub window: i64,
    pub rules: Vec<RawFieldRule>,
    #[serde(default)]
    pub sum_rules: Vec<SumRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_column: Option<String>,
    pub ranges: ClassificationRanges,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_field_score: Option<f64>,
}

/// Where a score column comes from once names are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef {
    Field(usize),
    Sum(usize),
}

impl MatchingConfig {
    pub fn new(
        blocking_field: impl Into<String>,
        window: i64,
        rules: Vec<FieldRule>,
        sum_rules: Vec<SumRule>,
        score_column: Option<String>,
        ranges: ClassificationRanges,
        min_field_score: Option<f64>,
    ) -> Result<Self> {
        let window = validate_window(window)?;
        for rule in &rules {
            rule.validate()?;
        }
        let score_column = match score_column {
            Some(column) => column,
            None => infer_score_column(&rules, &sum_rules)?,
        };
        let config = Self {
            blocking_field: blocking_field.into(),
            window,
            rules,
            sum_rules,
            score_column,
            ranges,
            min_field_score,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Enforces every cross-field invariant. Individual rules and ranges are
    /// already checked by their own constructors.
    pub fn validate(&self) -> Result<()> {
        validate_window(self.window as i64)?;
        if self.rules.is_empty() {
            return Err(ConfigurationError::NoRules.into());
        }
        if let Some(floor) = self.min_field_score {
            check_unit("min_field_score", floor)?;
        }

        let mut columns: HashMap<&str, ColumnRef> = HashMap::new();
        for (pos, rule) in self.rules.iter().enumerate() {
            if columns.insert(rule.field.as_str(), ColumnRef::Field(pos)).is_some() {
                return Err(ConfigurationError::DuplicateColumn(rule.field.clone()).into());
            }
        }
        for (pos, sum) in self.sum_rules.iter().enumerate() {
            if sum.fields.is_empty() {
                return Err(ConfigurationError::EmptySumRule(sum.name.clone()).into());
            }
            // constituents must already be defined, which also rules out cycles
            for column in &sum.fields {
                if !columns.contains_key(column.as_str()) {
                    return Err(ConfigurationError::UnknownSumColumn {
                        rule: sum.name.clone(),
                        column: column.clone(),
                    }
                    .into());
                }
            }
            if columns.insert(sum.name.as_str(), ColumnRef::Sum(pos)).is_some() {
                return Err(ConfigurationError::DuplicateColumn(sum.name.clone()).into());
            }
        }
        if !columns.contains_key(self.score_column.as_str()) {
            return Err(ConfigurationError::UnknownScoreColumn(self.score_column.clone()).into());
        }

        let max = self.max_attainable(&self.score_column);
        for (name, range) in [
            ("certain", self.ranges.certain()),
            ("potential", self.ranges.potential()),
        ] {
            if range.lo > max {
                return Err(ConfigurationError::RangeUnreachable {
                    name,
                    lo: range.lo,
                    max,
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn blocking_field(&self) -> &str {
        &self.blocking_field
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn sum_rules(&self) -> &[SumRule] {
        &self.sum_rules
    }

    pub fn score_column(&self) -> &str {
        &self.score_column
    }

    pub fn ranges(&self) -> &ClassificationRanges {
        &self.ranges
    }

    pub fn min_field_score(&self) -> Option<f64> {
        self.min_field_score
    }

    pub fn field_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.field.clone()).collect()
    }

    /// Same rules with different classification ranges.
    pub fn with_ranges(&self, ranges: ClassificationRanges) -> Result<Self> {
        let config = Self {
            ranges,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolves a column name to the field rule or sum rule that produces it.
    pub fn resolve_column(&self, name: &str) -> Option<ColumnRef> {
        // sums shadow nothing: names are unique across both lists
        if let Some(pos) = self.sum_rules.iter().position(|s| s.name == name) {
            return Some(ColumnRef::Sum(pos));
        }
        self.rules
            .iter()
            .position(|r| r.field == name)
            .map(ColumnRef::Field)
    }

    /// Highest value a column can take: 1.0 per field, summed through sum rules.
    pub fn max_attainable(&self, name: &str) -> f64 {
        match self.resolve_column(name) {
            Some(ColumnRef::Field(_)) => 1.0,
            Some(ColumnRef::Sum(pos)) => self.sum_rules[pos]
                .fields
                .iter()
                .map(|f| self.max_attainable(f))
                .sum(),
            None => 0.0,
        }
    }

    /// SHA-256 over the canonical JSON form, hex encoded.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }

    pub fn log_config(&self) {
        info!("🔧 Matching Configuration:");
        info!(
            "   Blocking: field '{}' with window {}",
            self.blocking_field, self.window
        );
        for rule in &self.rules {
            info!("   Rule: {} -> {:?}", rule.field, rule.rule);
        }
        for sum in &self.sum_rules {
            info!("   Sum: {} = {}", sum.name, sum.fields.join(" + "));
        }
        info!(
            "   Classify on '{}': certain [{}, {}), potential [{}, {})",
            self.score_column,
            self.ranges.certain().lo,
            self.ranges.certain().hi,
            self.ranges.potential().lo,
            self.ranges.potential().hi
        );
        if let Some(floor) = self.min_field_score {
            info!("   Field scores below {} are zeroed", floor);
        }
        info!("   Fingerprint: {}", &self.fingerprint()[..12]);
    }
}

/// Odd and positive; `w` reaches `(w - 1) / 2` ranks on each side.
pub(crate) fn validate_window(window: i64) -> Result<usize> {
    if window <= 0 || window % 2 == 0 {
        return Err(ConfigurationError::InvalidWindow(window).into());
    }
    Ok(window as usize)
}

/// The last sum rule when there is one, otherwise the only field rule.
fn infer_score_column(rules: &[FieldRule], sum_rules: &[SumRule]) -> Result<String> {
    if let Some(last) = sum_rules.last() {
        return Ok(last.name.clone());
    }
    match rules {
        [only] => Ok(only.field.clone()),
        _ => Err(ConfigurationError::MissingScoreColumn.into()),
    }
}

impl TryFrom<RawMatchingConfig> for MatchingConfig {
    type Error = LinkageError;

    fn try_from(raw: RawMatchingConfig) -> Result<Self> {
        let rules = raw
            .rules
            .into_iter()
            .map(FieldRule::try_from)
            .collect::<Result<Vec<_>>>()?;
        MatchingConfig::new(
            raw.blocking_field,
            raw.window,
            rules,
            raw.sum_rules,
            raw.score_column,
            raw.ranges,
            raw.min_field_score,
        )
    }
}

impl From<MatchingConfig> for RawMatchingConfig {
    fn from(config: MatchingConfig) -> Self {
        RawMatchingConfig {
            blocking_field: config.blocking_field,
            window: config.window as i64,
            rules: config.rules.into_iter().map(RawFieldRule::from).collect(),
            sum_rules: config.sum_rules,
            score_column: Some(config.score_column),
            ranges: config.ranges,
            min_field_score: config.min_field_score,
        }
    }
}
