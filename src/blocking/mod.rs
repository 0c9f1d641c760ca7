pub mod sorted_neighbourhood;

pub use self::sorted_neighbourhood::{index, BlockingOutput, SortedNeighbourhood};
