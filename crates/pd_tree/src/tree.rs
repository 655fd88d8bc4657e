use std::ops::Index;
use ahash::AHashMap;

use crate::NodeIdx;
use crate::TimedTree;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub height: f64,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    pub label: Option<String>,
}

impl Node {
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A rooted, timed phylogeny stored as a node arena.
///
/// Trees are only ever constructed through `TreeBuilder` (or the Newick
/// parser, which uses it), so the following always holds:
///
/// - tips are the nodes `0..leaf_count`, internal nodes follow, the root is
///   the last node,
/// - every non-root node is at most as old as its parent,
/// - labelled tips are unique.
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) leaf_count: usize,
    pub(crate) taxa: AHashMap<String, NodeIdx>,
}

impl Tree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> NodeIdx {
        self.nodes.len() - 1
    }

    pub fn node(&self, i: NodeIdx) -> &Node {
        &self.nodes[i]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn tips(&self) -> &[Node] {
        &self.nodes[..self.leaf_count]
    }

    pub fn internal_nodes(&self) -> &[Node] {
        &self.nodes[self.leaf_count..]
    }

    /// Look up a tip by its taxon label.
    pub fn tip_index(&self, label: &str) -> Option<NodeIdx> {
        self.taxa.get(label).copied()
    }

    /// Length of the branch above node `i` (0.0 for the root).
    pub fn branch_length(&self, i: NodeIdx) -> f64 {
        let node = &self.nodes[i];
        match node.parent {
            Some(p) => self.nodes[p].height - node.height,
            None => 0.0,
        }
    }

    /// Sum over all branch lengths.
    pub fn tree_length(&self) -> f64 {
        (0..self.nodes.len()).map(|i| self.branch_length(i)).sum()
    }

    pub fn tip_heights(&self) -> Vec<f64> {
        self.tips().iter().map(|n| n.height).collect()
    }
}

impl Index<NodeIdx> for Tree {
    type Output = Node;
    fn index(&self, i: NodeIdx) -> &Self::Output {
        &self.nodes[i]
    }
}

impl TimedTree for Tree {
    fn root_height(&self) -> f64 {
        self.nodes[self.root()].height
    }

    fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Branches spanning the backward time `time`. A branch covers the
    /// half-open interval [child height, parent height), so a tip sampled
    /// exactly at `time` is counted. Above the root only the stem towards
    /// the origin remains, which counts as one lineage. Negative times are
    /// read as the present.
    fn lineage_count_at_time(&self, time: f64) -> usize {
        let time = time.max(0.0);
        if time >= self.root_height() {
            return 1;
        }
        self.nodes.iter()
            .filter(|n| match n.parent {
                Some(p) => n.height <= time && self.nodes[p].height > time,
                None => false,
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeBuilder;

    fn caterpillar() -> Tree {
        // ((A:1,B:1):1,C:2) with C sampled 0.5 before the present.
        let mut builder = TreeBuilder::new();
        let a = builder.add_tip(Some("A".into()), 0.0);
        let b = builder.add_tip(Some("B".into()), 0.0);
        let c = builder.add_tip(Some("C".into()), 0.5);
        let ab = builder.join(&[a, b], 1.0).unwrap();
        builder.join(&[ab, c], 2.0).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_basic_properties() {
        let tree = caterpillar();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.root(), 4);
        assert_eq!(tree.root_height(), 2.0);
        assert!(tree[tree.root()].is_root());
        assert!(tree.tips().iter().all(|n| n.is_tip()));
        assert_eq!(tree.tip_index("C"), Some(2));
        assert_eq!(tree.tip_index("D"), None);
    }

    #[test]
    fn test_branch_lengths() {
        let tree = caterpillar();
        assert_eq!(tree.branch_length(0), 1.0);
        assert_eq!(tree.branch_length(2), 1.5);
        assert_eq!(tree.branch_length(tree.root()), 0.0);
        assert!((tree.tree_length() - 4.5).abs() < 1e-12);
        assert_eq!(tree.tip_heights(), vec![0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_lineage_count_at_time() {
        let tree = caterpillar();
        assert_eq!(tree.lineage_count_at_time(0.0), 2);
        assert_eq!(tree.lineage_count_at_time(0.25), 2);
        assert_eq!(tree.lineage_count_at_time(0.5), 3);
        assert_eq!(tree.lineage_count_at_time(1.0), 2);
        assert_eq!(tree.lineage_count_at_time(1.999), 2);
        assert_eq!(tree.lineage_count_at_time(2.0), 1);
        assert_eq!(tree.lineage_count_at_time(10.0), 1);
    }

    #[test]
    fn test_lineage_count_below_present() {
        let tree = caterpillar();
        assert_eq!(tree.lineage_count_at_time(-4.4e-16), 2);
        assert_eq!(tree.lineage_count_at_time(-1.0), 2);
    }
}
