// src/config/rules.rs - Comparison rule and sum rule definitions

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigurationError, Result};

/// String similarity algorithms exposed by the comparator library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMethod {
    JaroWinkler,
    Jaro,
    Levenshtein,
    DamerauLevenshtein,
}

impl StringMethod {
    pub fn parse(field: &str, name: &str) -> Result<Self> {
        match name.to_lowercase().replace(['-', ' '], "_").as_str() {
            "jarowinkler" | "jaro_winkler" => Ok(StringMethod::JaroWinkler),
            "jaro" => Ok(StringMethod::Jaro),
            "levenshtein" => Ok(StringMethod::Levenshtein),
            "damerau_levenshtein" | "dameraulevenshtein" => Ok(StringMethod::DamerauLevenshtein),
            _ => Err(ConfigurationError::UnknownMethod {
                field: field.to_string(),
                family: "string",
                method: name.to_string(),
            }
            .into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StringMethod::JaroWinkler => "jaro_winkler",
            StringMethod::Jaro => "jaro",
            StringMethod::Levenshtein => "levenshtein",
            StringMethod::DamerauLevenshtein => "damerau_levenshtein",
        }
    }
}

impl Default for StringMethod {
    fn default() -> Self {
        StringMethod::JaroWinkler
    }
}

/// Distance-to-similarity kernels for numeric fields.
///
/// With `d = |a - b|`, every kernel returns 1.0 while `d <= offset` and decays
/// monotonically afterwards; `scale` controls how fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericMethod {
    Step,
    Linear,
    Exp,
    Gauss,
    Squared,
}

impl NumericMethod {
    pub fn parse(field: &str, name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "step" => Ok(NumericMethod::Step),
            "linear" => Ok(NumericMethod::Linear),
            "exp" | "exponential" => Ok(NumericMethod::Exp),
            "gauss" | "gaussian" => Ok(NumericMethod::Gauss),
            "squared" => Ok(NumericMethod::Squared),
            _ => Err(ConfigurationError::UnknownMethod {
                field: field.to_string(),
                family: "numeric",
                method: name.to_string(),
            }
            .into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericMethod::Step => "step",
            NumericMethod::Linear => "linear",
            NumericMethod::Exp => "exp",
            NumericMethod::Gauss => "gauss",
            NumericMethod::Squared => "squared",
        }
    }
}

/// How one field is compared. Closed set, matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonRule {
    Exact,
    #[serde(rename = "string")]
    StringSim { threshold: f64, method: StringMethod },
    Date,
    Numeric {
        method: NumericMethod,
        offset: f64,
        scale: f64,
    },
}

impl ComparisonRule {
    pub fn kind(&self) -> &'static str {
        match self {
            ComparisonRule::Exact => "exact",
            ComparisonRule::StringSim { .. } => "string",
            ComparisonRule::Date => "date",
            ComparisonRule::Numeric { .. } => "numeric",
        }
    }

    /// What produces the raw similarity, ignoring the string threshold,
    /// which only applies afterwards. Two rules with the same comparator
    /// read stored raw similarities the same way.
    pub fn comparator(&self) -> String {
        match self {
            ComparisonRule::Exact | ComparisonRule::Date => self.kind().to_string(),
            ComparisonRule::StringSim { method, .. } => format!("string:{}", method.as_str()),
            ComparisonRule::Numeric {
                method,
                offset,
                scale,
            } => format!("numeric:{}(offset={},scale={})", method.as_str(), offset, scale),
        }
    }
}

/// Rule as written in a config file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRule {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFieldRule {
    pub field: String,
    #[serde(flatten)]
    pub rule: RawRule,
}

/// A validated comparison rule bound to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub rule: ComparisonRule,
}

impl FieldRule {
    pub fn exact(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: ComparisonRule::Exact,
        }
    }

    pub fn string(field: impl Into<String>, threshold: f64, method: StringMethod) -> Self {
        Self {
            field: field.into(),
            rule: ComparisonRule::StringSim { threshold, method },
        }
    }

    pub fn date(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: ComparisonRule::Date,
        }
    }

    pub fn numeric(field: impl Into<String>, method: NumericMethod, offset: f64, scale: f64) -> Self {
        Self {
            field: field.into(),
            rule: ComparisonRule::Numeric {
                method,
                offset,
                scale,
            },
        }
    }

    /// Checks parameter ranges for rules built directly in code.
    pub fn validate(&self) -> Result<()> {
        match self.rule {
            ComparisonRule::StringSim { threshold, .. } => {
                check_unit(&format!("field '{}': threshold", self.field), threshold)
            }
            ComparisonRule::Numeric { offset, scale, .. } => {
                if !(scale > 0.0) || !scale.is_finite() {
                    return Err(ConfigurationError::InvalidNumericScale {
                        field: self.field.clone(),
                        scale,
                    }
                    .into());
                }
                if !(offset >= 0.0) || !offset.is_finite() {
                    return Err(ConfigurationError::InvalidNumericOffset {
                        field: self.field.clone(),
                        offset,
                    }
                    .into());
                }
                Ok(())
            }
            ComparisonRule::Exact | ComparisonRule::Date => Ok(()),
        }
    }
}

impl TryFrom<RawFieldRule> for FieldRule {
    type Error = crate::errors::LinkageError;

    fn try_from(raw: RawFieldRule) -> Result<Self> {
        let RawFieldRule { field, rule } = raw;
        let parsed = match rule.kind.to_lowercase().as_str() {
            "exact" => ComparisonRule::Exact,
            "string" => {
                let threshold = rule
                    .threshold
                    .ok_or_else(|| ConfigurationError::MissingThreshold {
                        field: field.clone(),
                    })?;
                let method = match rule.method.as_deref() {
                    Some(name) => StringMethod::parse(&field, name)?,
                    None => StringMethod::default(),
                };
                ComparisonRule::StringSim { threshold, method }
            }
            "date" => ComparisonRule::Date,
            "numeric" => {
                let method = match rule.method.as_deref() {
                    Some(name) => NumericMethod::parse(&field, name)?,
                    None => NumericMethod::Linear,
                };
                ComparisonRule::Numeric {
                    method,
                    offset: rule.offset.unwrap_or(0.0),
                    scale: rule.scale.unwrap_or(1.0),
                }
            }
            _ => {
                return Err(ConfigurationError::UnknownRuleKind {
                    field,
                    kind: rule.kind,
                }
                .into())
            }
        };
        let field_rule = FieldRule {
            field,
            rule: parsed,
        };
        field_rule.validate()?;
        Ok(field_rule)
    }
}

impl From<FieldRule> for RawFieldRule {
    fn from(rule: FieldRule) -> Self {
        let raw = match rule.rule {
            ComparisonRule::Exact | ComparisonRule::Date => RawRule {
                kind: rule.rule.kind().to_string(),
                ..RawRule::default()
            },
            ComparisonRule::StringSim { threshold, method } => RawRule {
                kind: "string".to_string(),
                threshold: Some(threshold),
                method: Some(method.as_str().to_string()),
                ..RawRule::default()
            },
            ComparisonRule::Numeric {
                method,
                offset,
                scale,
            } => RawRule {
                kind: "numeric".to_string(),
                method: Some(method.as_str().to_string()),
                offset: Some(offset),
                scale: Some(scale),
                ..RawRule::default()
            },
        };
        RawFieldRule {
            field: rule.field,
            rule: raw,
        }
    }
}

/// Named sum of already-thresholded columns.
///
/// Constituents may be field names or the names of sum rules defined earlier
/// in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumRule {
    pub name: String,
    pub fields: Vec<String>,
}

impl SumRule {
    pub fn new<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

pub(crate) fn check_unit(what: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::ValueOutOfUnitRange {
            what: what.to_string(),
            value,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkageError;

    fn raw(field: &str, json: &str) -> RawFieldRule {
        let rule: RawRule = serde_json::from_str(json).unwrap();
        RawFieldRule {
            field: field.to_string(),
            rule,
        }
    }

    #[test]
    fn test_parse_each_rule_kind() {
        let exact = FieldRule::try_from(raw("sex", r#"{"kind": "exact"}"#)).unwrap();
        assert_eq!(exact.rule, ComparisonRule::Exact);

        let string = FieldRule::try_from(raw(
            "name",
            r#"{"kind": "string", "threshold": 0.85, "method": "jarowinkler"}"#,
        ))
        .unwrap();
        assert_eq!(
            string.rule,
            ComparisonRule::StringSim {
                threshold: 0.85,
                method: StringMethod::JaroWinkler
            }
        );

        let dl = FieldRule::try_from(raw(
            "mother",
            r#"{"kind": "string", "threshold": 0.9, "method": "damerau_levenshtein"}"#,
        ))
        .unwrap();
        assert_eq!(dl.rule.kind(), "string");

        let date = FieldRule::try_from(raw("birth", r#"{"kind": "DATE"}"#)).unwrap();
        assert_eq!(date.rule, ComparisonRule::Date);

        let numeric = FieldRule::try_from(raw("age", r#"{"kind": "numeric", "method": "gauss", "scale": 2.0}"#)).unwrap();
        assert_eq!(
            numeric.rule,
            ComparisonRule::Numeric {
                method: NumericMethod::Gauss,
                offset: 0.0,
                scale: 2.0
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let err = FieldRule::try_from(raw("geo", r#"{"kind": "geo"}"#)).unwrap_err();
        assert_eq!(
            err,
            LinkageError::Configuration(ConfigurationError::UnknownRuleKind {
                field: "geo".into(),
                kind: "geo".into()
            })
        );
    }

    #[test]
    fn test_string_rule_validation() {
        assert!(FieldRule::try_from(raw("name", r#"{"kind": "string"}"#)).is_err());
        assert!(FieldRule::try_from(raw("name", r#"{"kind": "string", "threshold": 1.2}"#)).is_err());
        assert!(FieldRule::try_from(raw("name", r#"{"kind": "string", "threshold": -0.1}"#)).is_err());
        assert!(FieldRule::try_from(raw(
            "name",
            r#"{"kind": "string", "threshold": 0.8, "method": "soundex"}"#
        ))
        .is_err());
        assert!(FieldRule::string("name", f64::NAN, StringMethod::Jaro).validate().is_err());
    }

    #[test]
    fn test_rule_written_back_parses_to_same_rule() {
        let rule = FieldRule::string("mother", 0.9, StringMethod::DamerauLevenshtein);
        let raw = RawFieldRule::from(rule.clone());
        assert_eq!(raw.rule.method.as_deref(), Some("damerau_levenshtein"));
        assert_eq!(FieldRule::try_from(raw).unwrap(), rule);
    }

    #[test]
    fn test_numeric_scale_must_be_positive() {
        assert!(FieldRule::numeric("age", NumericMethod::Linear, 0.0, 0.0).validate().is_err());
        assert!(FieldRule::numeric("age", NumericMethod::Linear, -1.0, 1.0).validate().is_err());
        assert!(FieldRule::numeric("age", NumericMethod::Exp, 1.0, 5.0).validate().is_ok());
    }

    #[test]
    fn test_comparator_ignores_threshold_only() {
        let strict = FieldRule::string("name", 0.9, StringMethod::Jaro).rule;
        let lenient = FieldRule::string("name", 0.7, StringMethod::Jaro).rule;
        assert_eq!(strict.comparator(), lenient.comparator());
        assert_eq!(strict.comparator(), "string:jaro");
        assert_ne!(
            strict.comparator(),
            FieldRule::string("name", 0.9, StringMethod::Levenshtein).rule.comparator()
        );
        assert_ne!(strict.comparator(), ComparisonRule::Exact.comparator());

        let age = FieldRule::numeric("age", NumericMethod::Linear, 1.0, 5.0).rule;
        assert_eq!(age.comparator(), "numeric:linear(offset=1,scale=5)");
        assert_ne!(
            age.comparator(),
            FieldRule::numeric("age", NumericMethod::Linear, 1.0, 6.0).rule.comparator()
        );
    }
}
