// src/blocking/sorted_neighbourhood.rs

use chrono::NaiveDate;
use log::debug;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::matching_config::validate_window;
use crate::config::MatchingConfig;
use crate::errors::{DataIntegrityError, Result};
use crate::models::{CandidatePair, FieldValue, RecordId, RecordSet};

/// A blocking key as read from the blocking field.
///
/// Equality follows the ordering, so two numeric keys compare with
/// `total_cmp` and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
enum BlockingKey {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl BlockingKey {
    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(s) | FieldValue::Category(s) => Some(BlockingKey::Text(s.clone())),
            FieldValue::Number(n) if n.is_finite() => Some(BlockingKey::Number(*n)),
            FieldValue::Date(d) => Some(BlockingKey::Date(*d)),
            FieldValue::Number(_) | FieldValue::Null => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BlockingKey::Number(_) => "number",
            BlockingKey::Date(_) => "date",
            BlockingKey::Text(_) => "text",
        }
    }

    fn rank_of_kind(&self) -> u8 {
        match self {
            BlockingKey::Number(_) => 0,
            BlockingKey::Date(_) => 1,
            BlockingKey::Text(_) => 2,
        }
    }
}

impl Ord for BlockingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (BlockingKey::Number(a), BlockingKey::Number(b)) => a.total_cmp(b),
            (BlockingKey::Date(a), BlockingKey::Date(b)) => a.cmp(b),
            (BlockingKey::Text(a), BlockingKey::Text(b)) => a.cmp(b),
            _ => self.rank_of_kind().cmp(&other.rank_of_kind()),
        }
    }
}

impl PartialOrd for BlockingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BlockingKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BlockingKey {}

/// Result of one blocking pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockingOutput {
    /// Sorted, free of duplicates.
    pub pairs: Vec<CandidatePair>,
    /// Records left out because the blocking field was missing or null.
    pub skipped_missing_key: usize,
    /// Distinct blocking key values seen.
    pub key_groups: usize,
}

/// Sorted-neighbourhood blocking over one field.
///
/// Records are ranked by the distinct values of their blocking key; two
/// records become a candidate pair when their key ranks differ by at most
/// `window / 2`. Records sharing a key value share a rank, so ties are always
/// paired and `window == 1` is exact blocking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedNeighbourhood {
    field: String,
    half_window: usize,
}

impl SortedNeighbourhood {
    pub fn new(field: impl Into<String>, window: i64) -> Result<Self> {
        let window = validate_window(window)?;
        Ok(Self {
            field: field.into(),
            half_window: window / 2,
        })
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            field: config.blocking_field().to_string(),
            half_window: config.window() / 2,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn window(&self) -> usize {
        self.half_window * 2 + 1
    }

    /// Candidate pairs within one record set, stored as `left < right`.
    pub fn index(&self, records: &RecordSet) -> Result<BlockingOutput> {
        let mut kind: Option<&'static str> = None;
        let mut groups: BTreeMap<BlockingKey, Vec<&RecordId>> = BTreeMap::new();
        let mut skipped = 0usize;
        for record in records.iter() {
            match self.key_of(record.get(&self.field), &mut kind)? {
                Some(key) => groups.entry(key).or_default().push(&record.id),
                None => skipped += 1,
            }
        }

        let ranked: Vec<Vec<&RecordId>> = groups.into_values().collect();
        let mut pairs: BTreeSet<CandidatePair> = BTreeSet::new();
        for (rank, members) in ranked.iter().enumerate() {
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    pairs.insert(CandidatePair::unordered((*a).clone(), (*b).clone()));
                }
            }
            for other in ranked.iter().skip(rank + 1).take(self.half_window) {
                for a in members {
                    for b in other {
                        pairs.insert(CandidatePair::unordered((*a).clone(), (*b).clone()));
                    }
                }
            }
        }

        debug!(
            "Blocking on '{}' (window {}): {} records, {} keys, {} pairs, {} skipped",
            self.field,
            self.window(),
            records.len(),
            ranked.len(),
            pairs.len(),
            skipped
        );
        Ok(BlockingOutput {
            pairs: pairs.into_iter().collect(),
            skipped_missing_key: skipped,
            key_groups: ranked.len(),
        })
    }

    /// Candidate pairs across two record sets. Ranks are taken over the union
    /// of both key spaces; every pair has its left id from `left` and its right
    /// id from `right`.
    pub fn index_link(&self, left: &RecordSet, right: &RecordSet) -> Result<BlockingOutput> {
        let mut kind: Option<&'static str> = None;
        let mut groups: BTreeMap<BlockingKey, (Vec<&RecordId>, Vec<&RecordId>)> = BTreeMap::new();
        let mut skipped = 0usize;
        for record in left.iter() {
            match self.key_of(record.get(&self.field), &mut kind)? {
                Some(key) => groups.entry(key).or_default().0.push(&record.id),
                None => skipped += 1,
            }
        }
        for record in right.iter() {
            match self.key_of(record.get(&self.field), &mut kind)? {
                Some(key) => groups.entry(key).or_default().1.push(&record.id),
                None => skipped += 1,
            }
        }

        let ranked: Vec<(Vec<&RecordId>, Vec<&RecordId>)> = groups.into_values().collect();
        let mut pairs: BTreeSet<CandidatePair> = BTreeSet::new();
        for (rank, (lefts, _)) in ranked.iter().enumerate() {
            if lefts.is_empty() {
                continue;
            }
            let lo = rank.saturating_sub(self.half_window);
            let hi = (rank + self.half_window).min(ranked.len() - 1);
            for (_, rights) in &ranked[lo..=hi] {
                for l in lefts {
                    for r in rights {
                        pairs.insert(CandidatePair::linked((*l).clone(), (*r).clone()));
                    }
                }
            }
        }

        debug!(
            "Linkage blocking on '{}' (window {}): {} x {} records, {} keys, {} pairs, {} skipped",
            self.field,
            self.window(),
            left.len(),
            right.len(),
            ranked.len(),
            pairs.len(),
            skipped
        );
        Ok(BlockingOutput {
            pairs: pairs.into_iter().collect(),
            skipped_missing_key: skipped,
            key_groups: ranked.len(),
        })
    }

    fn key_of(
        &self,
        value: Option<&FieldValue>,
        kind: &mut Option<&'static str>,
    ) -> Result<Option<BlockingKey>> {
        let key = match value.and_then(BlockingKey::from_value) {
            Some(key) => key,
            None => return Ok(None),
        };
        match *kind {
            None => *kind = Some(key.kind()),
            Some(first) if first != key.kind() => {
                return Err(DataIntegrityError::MixedKeyTypes {
                    field: self.field.clone(),
                    first,
                    second: key.kind(),
                }
                .into())
            }
            Some(_) => {}
        }
        Ok(Some(key))
    }
}

/// One-shot deduplication blocking.
pub fn index(records: &RecordSet, blocking_field: &str, window: i64) -> Result<BlockingOutput> {
    SortedNeighbourhood::new(blocking_field, window)?.index(records)
}
