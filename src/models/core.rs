// src/models/core.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::errors::{DataIntegrityError, LinkageError, Result};

/// Stable caller-supplied identifier of a record.
///
/// Ordering is lexicographic on the underlying string; the canonical member of
/// an entity group is the smallest id under this ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

/// A typed, already-normalised field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Number(f64),
    Category(String),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Textual view used by string comparators. Categories compare as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Category(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view used by numeric comparators. Dates map to their day
    /// number so that a numeric rule can measure distances between dates.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Date(d) => Some(chrono::Datelike::num_days_from_ce(d) as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// A normalised record. Immutable once handed to the matching core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Value of `field`, treating an explicit null the same as an absent field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).filter(|v| !v.is_null())
    }
}

/// Read-only collection of records keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Record>", into = "Vec<Record>")]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl RecordSet {
    /// Builds the set, rejecting duplicate ids.
    pub fn new(records: Vec<Record>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), pos).is_some() {
                return Err(DataIntegrityError::DuplicateRecordId(record.id.0.clone()).into());
            }
        }
        Ok(Self { records, index })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl TryFrom<Vec<Record>> for RecordSet {
    type Error = LinkageError;

    fn try_from(records: Vec<Record>) -> Result<Self> {
        RecordSet::new(records)
    }
}

impl From<RecordSet> for Vec<Record> {
    fn from(set: RecordSet) -> Self {
        set.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_record_set_rejects_duplicate_ids() {
        let records = vec![
            Record::new("1").with_field("name", text("SILVA")),
            Record::new("1").with_field("name", text("SOUZA")),
        ];
        let err = RecordSet::new(records).unwrap_err();
        assert!(err.is_data_integrity());
    }

    #[test]
    fn test_null_fields_read_as_missing() {
        let record = Record::new("1")
            .with_field("name", text("MARIA"))
            .with_field("mother", FieldValue::Null);
        assert!(record.get("name").is_some());
        assert!(record.get("mother").is_none());
        assert!(record.get("cpf").is_none());
    }

    #[test]
    fn test_value_views() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(FieldValue::Category("F".into()).as_text(), Some("F"));
        assert_eq!(FieldValue::Number(3.5).as_number(), Some(3.5));
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
        let next = FieldValue::Date(d.succ_opt().unwrap()).as_number().unwrap();
        assert_eq!(next - FieldValue::Date(d).as_number().unwrap(), 1.0);
        assert_eq!(text("x").as_date(), None);
    }

    #[test]
    fn test_record_set_deserializes_from_json_array() {
        let json = r#"[
            {"id": "a", "fields": {"name": {"text": "ANA"}, "birth": {"date": "1990-01-02"}}},
            {"id": "b", "fields": {"age": {"number": 31.0}, "sex": "null"}}
        ]"#;
        let set: RecordSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        let b = set.get(&RecordId::from("b")).unwrap();
        assert_eq!(b.get("age"), Some(&FieldValue::Number(31.0)));
        assert!(b.get("sex").is_none());

        let dup = r#"[{"id": "a"}, {"id": "a"}]"#;
        assert!(serde_json::from_str::<RecordSet>(dup).is_err());
    }
}
