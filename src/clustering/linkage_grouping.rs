// src/clustering/linkage_grouping.rs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{CandidatePair, RecordId};

/// One-to-many mapping from left ids to the right ids they matched.
///
/// No transitive closure: two right records sharing a left record are not
/// treated as the same entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkedGroups {
    groups: BTreeMap<RecordId, Vec<RecordId>>,
}

impl LinkedGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, left: &RecordId) -> Option<&[RecordId]> {
        self.groups.get(left).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &Vec<RecordId>)> {
        self.groups.iter()
    }

    pub fn links(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Groups matched linkage pairs by their left id. Right ids are sorted and
/// repeated pairs collapse.
pub fn group_by_left(pairs: &[CandidatePair]) -> LinkedGroups {
    let mut groups: BTreeMap<RecordId, Vec<RecordId>> = BTreeMap::new();
    for pair in pairs {
        groups
            .entry(pair.left.clone())
            .or_default()
            .push(pair.right.clone());
    }
    for rights in groups.values_mut() {
        rights.sort();
        rights.dedup();
    }
    LinkedGroups { groups }
}
