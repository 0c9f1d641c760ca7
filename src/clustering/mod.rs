pub mod entity_clustering;
pub mod linkage_grouping;
pub mod union_find;

pub use self::entity_clustering::{cluster, cluster_sharded, EntityGroups};
pub use self::linkage_grouping::{group_by_left, LinkedGroups};
pub use self::union_find::DisjointForest;
