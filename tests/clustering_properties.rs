// Property tests for union-find clustering.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;
use petgraph::unionfind::UnionFind;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use linkage_lib::clustering::{cluster, cluster_sharded, EntityGroups};
use linkage_lib::models::{CandidatePair, RecordId};

const ID_SPACE: u8 = 24;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// Zero padded so string order equals numeric order.
fn id(n: u8) -> RecordId {
    RecordId(format!("{:02}", n))
}

/// Matched pairs over a small id space, self pairs removed.
fn arb_pairs() -> impl Strategy<Value = Vec<CandidatePair>> {
    prop::collection::vec((0..ID_SPACE, 0..ID_SPACE), 0..64).prop_map(|raw| {
        raw.into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| CandidatePair::unordered(id(a), id(b)))
            .collect()
    })
}

fn membership(groups: &EntityGroups) -> BTreeSet<BTreeSet<RecordId>> {
    groups
        .member_sets()
        .into_iter()
        .map(|members| members.into_iter().collect())
        .collect()
}

/// Connected components of the pair graph, computed by petgraph.
fn oracle(pairs: &[CandidatePair]) -> (BTreeSet<BTreeSet<RecordId>>, usize) {
    let mut uf = UnionFind::<usize>::new(ID_SPACE as usize);
    let mut graph = UnGraph::<(), ()>::new_undirected();
    let nodes: Vec<_> = (0..ID_SPACE).map(|_| graph.add_node(())).collect();
    let mut seen = BTreeSet::new();
    for pair in pairs {
        let a: usize = pair.left.as_str().parse().unwrap();
        let b: usize = pair.right.as_str().parse().unwrap();
        uf.union(a, b);
        graph.add_edge(nodes[a], nodes[b], ());
        seen.insert(a);
        seen.insert(b);
    }

    let labels = uf.into_labeling();
    let mut by_label: std::collections::BTreeMap<usize, BTreeSet<RecordId>> = Default::default();
    for &x in &seen {
        by_label.entry(labels[x]).or_default().insert(id(x as u8));
    }
    // ids that never appear are isolated nodes, one component each
    let components = connected_components(&graph) - (ID_SPACE as usize - seen.len());
    (by_label.into_values().collect(), components)
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn prop_repeating_pairs_changes_nothing(pairs in arb_pairs()) {
        let once = cluster(&pairs).unwrap();
        let mut doubled = pairs.clone();
        doubled.extend(pairs.iter().cloned());
        prop_assert_eq!(cluster(&doubled).unwrap(), once);
    }

    #[test]
    fn prop_pair_order_is_irrelevant(pairs in arb_pairs(), seed in any::<u64>()) {
        let baseline = cluster(&pairs).unwrap();
        let mut shuffled = pairs.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(cluster(&shuffled).unwrap(), baseline);
    }

    #[test]
    fn prop_sharding_matches_single_forest(pairs in arb_pairs(), shards in 1usize..9) {
        let baseline = cluster(&pairs).unwrap();
        prop_assert_eq!(cluster_sharded(&pairs, shards).unwrap(), baseline);
    }

    #[test]
    fn prop_groups_are_connected_components(pairs in arb_pairs()) {
        let groups = cluster(&pairs).unwrap();
        let (expected, components) = oracle(&pairs);
        prop_assert_eq!(groups.len(), components);
        prop_assert_eq!(membership(&groups), expected);
        for (canonical, rest) in groups.iter() {
            prop_assert!(rest.iter().all(|member| member > canonical));
        }
    }
}

#[test]
fn test_shuffled_chain_keeps_one_group() {
    let mut pairs: Vec<CandidatePair> = (0..ID_SPACE - 1)
        .map(|n| CandidatePair::unordered(id(n), id(n + 1)))
        .collect();
    let mut rng = StdRng::seed_from_u64(42);
    for shards in 1..=6 {
        pairs.shuffle(&mut rng);
        let groups = cluster_sharded(&pairs, shards).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(&id(0)).map(|rest| rest.len()), Some(ID_SPACE as usize - 1));
    }
}
