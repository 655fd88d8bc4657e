use ahash::AHashMap;

use crate::Node;
use crate::NodeIdx;
use crate::Tree;
use crate::TreeError;

/// Incremental tree construction in any order of tips and joins.
///
/// Indices returned by `add_tip` and `join` are builder-local; `finish`
/// renumbers the nodes into the `Tree` layout (tips first, root last).
///
/// # Example
/// ```rust
/// use pd_tree::TreeBuilder;
/// use pd_tree::TimedTree;
///
/// let mut builder = TreeBuilder::new();
/// let a = builder.add_tip(Some("A".into()), 0.0);
/// let b = builder.add_tip(Some("B".into()), 0.0);
/// builder.join(&[a, b], 1.5).unwrap();
/// let tree = builder.finish().unwrap();
/// assert_eq!(tree.root_height(), 1.5);
/// assert_eq!(format!("{}", tree), "(A:1.5,B:1.5);");
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(num_tips: usize) -> Self {
        Self { nodes: Vec::with_capacity(2 * num_tips) }
    }

    pub fn add_tip(&mut self, label: Option<String>, height: f64) -> NodeIdx {
        self.nodes.push(Node {
            height,
            parent: None,
            children: Vec::new(),
            label,
        });
        self.nodes.len() - 1
    }

    /// Join existing subtrees under a new parent at the given height.
    pub fn join(&mut self, children: &[NodeIdx], height: f64) -> Result<NodeIdx, TreeError> {
        if children.len() < 2 {
            return Err(TreeError::DegenerateJoin(children.len()));
        }
        for &c in children {
            let child = self.nodes.get(c).ok_or(TreeError::UnknownNode(c))?;
            if child.parent.is_some() {
                return Err(TreeError::NodeReused(c));
            }
            if child.height > height {
                return Err(TreeError::NegativeBranch(c));
            }
        }
        let parent = self.nodes.len();
        for &c in children {
            self.nodes[c].parent = Some(parent);
        }
        self.nodes.push(Node {
            height,
            parent: None,
            children: children.to_vec(),
            label: None,
        });
        Ok(parent)
    }

    /// Label an already existing node, e.g. an internal node read from Newick.
    pub fn set_label(&mut self, i: NodeIdx, label: String) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(i).ok_or(TreeError::UnknownNode(i))?;
        node.label = Some(label);
        Ok(())
    }

    pub fn finish(self) -> Result<Tree, TreeError> {
        if self.nodes.is_empty() {
            return Err(TreeError::EmptyTree);
        }
        let roots = self.nodes.iter().filter(|n| n.is_root()).count();
        if roots != 1 {
            return Err(TreeError::MultipleRoots(roots));
        }

        // Tips first (stable), internal nodes in creation order. Parents are
        // always created after their children, so the root ends up last.
        let mut order: Vec<NodeIdx> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_tip())
            .collect();
        let leaf_count = order.len();
        order.extend((0..self.nodes.len()).filter(|&i| !self.nodes[i].is_tip()));

        let mut remap = vec![0; self.nodes.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }

        let mut taxa = AHashMap::with_capacity(leaf_count);
        let mut old_nodes: Vec<Option<Node>> = self.nodes.into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for (new, &old) in order.iter().enumerate() {
            let Some(mut node) = old_nodes[old].take() else {
                return Err(TreeError::UnknownNode(old));
            };
            node.parent = node.parent.map(|p| remap[p]);
            node.children.iter_mut().for_each(|c| *c = remap[*c]);
            if node.is_tip() {
                if let Some(label) = &node.label {
                    if taxa.insert(label.clone(), new).is_some() {
                        return Err(TreeError::DuplicateTaxon(label.clone()));
                    }
                }
            }
            nodes.push(node);
        }
        debug_assert!(nodes.last().is_some_and(|n| n.is_root()));

        Ok(Tree { nodes, leaf_count, taxa })
    }
}
