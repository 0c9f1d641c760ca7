// src/clustering/entity_clustering.rs

use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::clustering::union_find::DisjointForest;
use crate::errors::{ConfigurationError, DataIntegrityError, Result};
use crate::models::{CandidatePair, ClusterStats, RecordId};

/// Final grouping of matched records.
///
/// Keys are canonical ids, the smallest id of each group; values are the
/// remaining members in ascending order. Records that were never merged
/// with another record do not appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntityGroups {
    groups: BTreeMap<RecordId, Vec<RecordId>>,
}

impl EntityGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, canonical: &RecordId) -> Option<&[RecordId]> {
        self.groups.get(canonical).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &Vec<RecordId>)> {
        self.groups.iter()
    }

    /// Canonical id of the group containing `id`, if it was clustered.
    pub fn canonical_of(&self, id: &RecordId) -> Option<&RecordId> {
        if self.groups.contains_key(id) {
            return self.groups.get_key_value(id).map(|(k, _)| k);
        }
        self.groups
            .iter()
            .find(|(_, members)| members.binary_search(id).is_ok())
            .map(|(canonical, _)| canonical)
    }

    /// Groups as sorted member sets, canonical included.
    pub fn member_sets(&self) -> Vec<Vec<RecordId>> {
        self.groups
            .iter()
            .map(|(canonical, rest)| {
                let mut all = Vec::with_capacity(rest.len() + 1);
                all.push(canonical.clone());
                all.extend(rest.iter().cloned());
                all
            })
            .collect()
    }

    pub fn stats(&self) -> ClusterStats {
        ClusterStats::from_sizes(self.groups.values().map(|rest| rest.len() + 1))
    }
}

/// Sorted distinct ids across `pairs`; position in the vector is the dense id.
fn dense_ids(pairs: &[CandidatePair]) -> Result<Vec<RecordId>> {
    let mut ids = BTreeSet::new();
    for pair in pairs {
        if pair.left == pair.right {
            return Err(DataIntegrityError::SelfPair(pair.left.to_string()).into());
        }
        ids.insert(&pair.left);
        ids.insert(&pair.right);
    }
    Ok(ids.into_iter().cloned().collect())
}

fn position_index(ids: &[RecordId]) -> HashMap<&RecordId, usize> {
    ids.iter().enumerate().map(|(i, id)| (id, i)).collect()
}

fn extract(forest: &mut DisjointForest, ids: &[RecordId]) -> EntityGroups {
    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for (x, root) in forest.roots().into_iter().enumerate() {
        by_root.entry(root).or_default().push(x);
    }
    let mut groups = BTreeMap::new();
    for members in by_root.into_values() {
        if members.len() < 2 {
            continue;
        }
        // dense ids follow id order, so the first member is the smallest id
        let canonical = ids[members[0]].clone();
        let rest = members[1..].iter().map(|&m| ids[m].clone()).collect();
        groups.insert(canonical, rest);
    }
    EntityGroups { groups }
}

/// Transitive clustering of matched pairs on a single forest.
///
/// Pairs are applied in input order; repeating a pair has no effect. The
/// membership of each group depends only on the set of pairs.
pub fn cluster(pairs: &[CandidatePair]) -> Result<EntityGroups> {
    let ids = dense_ids(pairs)?;
    let index = position_index(&ids);
    let mut forest = DisjointForest::new(ids.len());
    let mut merges = 0usize;
    for pair in pairs {
        if forest.union(index[&pair.left], index[&pair.right]) {
            merges += 1;
        }
    }
    let groups = extract(&mut forest, &ids);
    debug!(
        "Clustered {} pairs over {} ids: {} merges, {} groups",
        pairs.len(),
        ids.len(),
        merges,
        groups.len()
    );
    Ok(groups)
}

/// Sharded clustering.
///
/// `pairs` is cut into `shards` contiguous chunks. Each chunk is unioned on
/// its own forest in parallel and reduced to `(member, local root)` edges;
/// the edges are then merged sequentially on one global forest with the
/// same union rule. The result equals [`cluster`] on the same pairs.
pub fn cluster_sharded(pairs: &[CandidatePair], shards: usize) -> Result<EntityGroups> {
    if shards == 0 {
        return Err(ConfigurationError::InvalidShardCount.into());
    }
    let ids = dense_ids(pairs)?;
    if shards == 1 || pairs.len() < 2 {
        return cluster(pairs);
    }

    let chunk = (pairs.len() + shards - 1) / shards;
    let shard_edges: Vec<Vec<(RecordId, RecordId)>> = pairs
        .par_chunks(chunk)
        .map(|shard| {
            let local_ids = local_ids(shard);
            let local_index = position_index(&local_ids);
            let mut forest = DisjointForest::new(local_ids.len());
            for pair in shard {
                forest.union(local_index[&pair.left], local_index[&pair.right]);
            }
            forest
                .roots()
                .into_iter()
                .enumerate()
                .filter(|(x, root)| x != root)
                .map(|(x, root)| (local_ids[x].clone(), local_ids[root].clone()))
                .collect()
        })
        .collect();

    let index = position_index(&ids);
    let mut forest = DisjointForest::new(ids.len());
    for (member, root) in shard_edges.iter().flatten() {
        forest.union(index[member], index[root]);
    }
    let groups = extract(&mut forest, &ids);
    debug!(
        "Sharded clustering: {} pairs in {} shards, {} merge edges, {} groups",
        pairs.len(),
        shard_edges.len(),
        shard_edges.iter().map(Vec::len).sum::<usize>(),
        groups.len()
    );
    Ok(groups)
}

// self pairs were rejected by the caller
fn local_ids(shard: &[CandidatePair]) -> Vec<RecordId> {
    let ids: BTreeSet<&RecordId> = shard.iter().flat_map(|p| [&p.left, &p.right]).collect();
    ids.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<CandidatePair> {
        list.iter()
            .map(|(a, b)| CandidatePair::unordered((*a).into(), (*b).into()))
            .collect()
    }

    fn ids(list: &[&str]) -> Vec<RecordId> {
        list.iter().map(|s| RecordId::from(*s)).collect()
    }

    #[test]
    fn test_transitive_closure() {
        let groups = cluster(&pairs(&[("A", "B"), ("B", "C"), ("D", "E")])).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get(&"A".into()), Some(ids(&["B", "C"]).as_slice()));
        assert_eq!(groups.get(&"D".into()), Some(ids(&["E"]).as_slice()));
        assert_eq!(groups.canonical_of(&"C".into()), Some(&RecordId::from("A")));
        assert_eq!(groups.canonical_of(&"D".into()), Some(&RecordId::from("D")));
    }

    #[test]
    fn test_order_invariance() {
        let forward = cluster(&pairs(&[("A", "B"), ("B", "C")])).unwrap();
        let backward = cluster(&pairs(&[("B", "C"), ("A", "B")])).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.get(&"A".into()), Some(ids(&["B", "C"]).as_slice()));
    }

    #[test]
    fn test_idempotent_union() {
        let once = cluster(&pairs(&[("1", "2")])).unwrap();
        let twice = cluster(&pairs(&[("1", "2"), ("2", "1"), ("1", "2")])).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unmatched_ids_never_appear() {
        let groups = cluster(&pairs(&[("1", "2")])).unwrap();
        assert_eq!(groups.canonical_of(&"3".into()), None);
        assert!(cluster(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_canonical_is_smallest_id_not_root() {
        // "8" ends up as the forest root, "1" is still canonical
        let groups = cluster(&pairs(&[("8", "9"), ("7", "9"), ("1", "9")])).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(&"1".into()), Some(ids(&["7", "8", "9"]).as_slice()));
        let stats = groups.stats();
        assert_eq!(stats.largest_group, 4);
        assert_eq!(stats.records_clustered, 4);
    }

    #[test]
    fn test_self_pair_rejected() {
        let bad = vec![CandidatePair::linked("4".into(), "4".into())];
        assert!(cluster(&bad).unwrap_err().is_data_integrity());
        assert!(cluster_sharded(&bad, 2).unwrap_err().is_data_integrity());
    }

    #[test]
    fn test_sharded_matches_baseline() {
        let input = pairs(&[
            ("a", "b"),
            ("c", "d"),
            ("e", "f"),
            ("b", "c"),
            ("g", "h"),
            ("f", "a"),
            ("i", "j"),
            ("h", "i"),
        ]);
        let baseline = cluster(&input).unwrap();
        for shards in 1..=10 {
            assert_eq!(cluster_sharded(&input, shards).unwrap(), baseline, "{} shards", shards);
        }
        assert!(cluster_sharded(&input, 0).unwrap_err().is_configuration());
    }
}
