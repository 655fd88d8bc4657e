mod error;
mod tree;
mod builder;
mod newick;

pub use error::*;
pub use tree::*;
pub use builder::*;

/// Position of a node in the `Tree` arena. Tips occupy `0..leaf_count`,
/// internal nodes follow, the root is always the last node.
pub type NodeIdx = usize;

/// The view of a phylogeny that the phylodynamic models consume.
///
/// All times are *backward* times, i.e. measured from the present (the
/// youngest sample sits at height 0.0) towards the root.
pub trait TimedTree {
    fn root_height(&self) -> f64;

    fn leaf_count(&self) -> usize;

    /// Number of lineages extant at the given backward time.
    fn lineage_count_at_time(&self, time: f64) -> usize;
}
