use std::fmt;

use crate::NodeIdx;
use crate::Tree;
use crate::TreeBuilder;
use crate::TreeError;

/// Intermediate parse tree; heights are only known once the deepest tip is.
#[derive(Debug)]
struct NewickNode {
    label: Option<String>,
    length: f64,
    children: Vec<NewickNode>,
}

struct NewickParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> NewickParser<'a> {
    fn new(source: &'a str) -> Self {
        Self { chars: source.chars().collect(), pos: 0, source }
    }

    fn peek(&mut self) -> Option<char> {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
        self.chars.get(self.pos).copied()
    }

    fn subtree(&mut self) -> Result<NewickNode, TreeError> {
        let mut children = Vec::new();
        if self.peek() == Some('(') {
            let open = self.pos;
            self.pos += 1;
            loop {
                children.push(self.subtree()?);
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some(')') => {
                        self.pos += 1;
                        break;
                    }
                    Some(';') | None => return Err(TreeError::UnbalancedParentheses(open)),
                    Some(c) => return Err(TreeError::UnexpectedToken(c, self.pos)),
                }
            }
        }
        let label = self.label();
        let length = self.length()?;
        Ok(NewickNode { label, length, children })
    }

    fn label(&mut self) -> Option<String> {
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                let start = self.pos + 1;
                let end = self.chars[start..].iter()
                    .position(|&c| c == q)
                    .map_or(self.chars.len(), |p| start + p);
                self.pos = (end + 1).min(self.chars.len());
                Some(self.chars[start..end].iter().collect())
            }
            _ => {
                let start = self.pos;
                while self.pos < self.chars.len()
                    && !matches!(self.chars[self.pos], '(' | ')' | ',' | ':' | ';')
                    && !self.chars[self.pos].is_whitespace()
                {
                    self.pos += 1;
                }
                if self.pos > start {
                    Some(self.chars[start..self.pos].iter().collect())
                } else {
                    None
                }
            }
        }
    }

    fn length(&mut self) -> Result<f64, TreeError> {
        if self.peek() != Some(':') {
            return Ok(0.0);
        }
        self.pos += 1;
        self.peek();
        let start = self.pos;
        while self.pos < self.chars.len()
            && matches!(self.chars[self.pos], '0'..='9' | '.' | '-' | '+' | 'e' | 'E')
        {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        match token.parse::<f64>() {
            Ok(x) if x.is_finite() && x >= 0.0 => Ok(x),
            _ => Err(TreeError::InvalidBranchLength(token, start)),
        }
    }

    fn parse(mut self) -> Result<NewickNode, TreeError> {
        if self.source.trim().is_empty() {
            return Err(TreeError::EmptyTree);
        }
        let root = self.subtree()?;
        match self.peek() {
            Some(';') | None => {}
            Some(')') => return Err(TreeError::UnbalancedParentheses(self.pos)),
            Some(c) => return Err(TreeError::UnexpectedToken(c, self.pos)),
        }
        Ok(root)
    }
}

fn max_depth(node: &NewickNode, depth: f64) -> f64 {
    let depth = depth + node.length;
    node.children.iter()
        .map(|c| max_depth(c, depth))
        .fold(depth, f64::max)
}

fn build(
    node: NewickNode,
    depth: f64,
    tree_depth: f64,
    builder: &mut TreeBuilder,
) -> Result<NodeIdx, TreeError> {
    let depth = depth + node.length;
    // Clamp round-off so that the deepest tips sit exactly at 0.0.
    let height = (tree_depth - depth).max(0.0);
    if node.children.is_empty() {
        return Ok(builder.add_tip(node.label, height));
    }
    let mut children = Vec::with_capacity(node.children.len());
    for child in node.children {
        children.push(build(child, depth, tree_depth, builder)?);
    }
    let idx = if children.len() == 1 {
        // Unary nodes (e.g. a stem written as "(A:1):2") collapse into the child.
        children[0]
    } else {
        builder.join(&children, height)?
    };
    if let Some(label) = node.label {
        builder.set_label(idx, label)?;
    }
    Ok(idx)
}

impl Tree {
    /// Parse a rooted Newick string. Node heights are derived from branch
    /// lengths such that the tip farthest from the root has height 0.0.
    /// The branch length of the root (if any) is ignored.
    pub fn from_newick(s: &str) -> Result<Self, TreeError> {
        let mut root = NewickParser::new(s).parse()?;
        root.length = 0.0;
        let tree_depth = max_depth(&root, 0.0);
        let mut builder = TreeBuilder::new();
        build(root, 0.0, tree_depth, &mut builder)?;
        builder.finish()
    }

    fn write_newick(&self, f: &mut fmt::Formatter<'_>, i: NodeIdx) -> fmt::Result {
        let node = &self.nodes[i];
        if !node.is_tip() {
            write!(f, "(")?;
            for (k, &c) in node.children.iter().enumerate() {
                if k > 0 {
                    write!(f, ",")?;
                }
                self.write_newick(f, c)?;
            }
            write!(f, ")")?;
        }
        if let Some(label) = &node.label {
            write!(f, "{}", label)?;
        }
        if !node.is_root() {
            write!(f, ":{}", self.branch_length(i))?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for Tree {
    type Error = TreeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Tree::from_newick(s)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_newick(f, self.root())?;
        write!(f, ";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimedTree;

    #[test]
    fn test_parse_ultrametric() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:2);").unwrap();
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.root_height(), 2.0);
        assert_eq!(tree.tip_heights(), vec![0.0, 0.0, 0.0]);
        assert_eq!(tree.lineage_count_at_time(0.0), 3);
        assert_eq!(tree.lineage_count_at_time(1.5), 2);
    }

    #[test]
    fn test_parse_serially_sampled() {
        let tree = Tree::from_newick("((A:1.5,B:1):0.5,C:1.25);").unwrap();
        let a = tree.tip_index("A").unwrap();
        let b = tree.tip_index("B").unwrap();
        let c = tree.tip_index("C").unwrap();
        assert_eq!(tree[a].height, 0.0);
        assert_eq!(tree[b].height, 0.5);
        assert_eq!(tree[c].height, 0.75);
        assert_eq!(tree.root_height(), 2.0);
    }

    #[test]
    fn test_display_roundtrip() {
        let s = "((A:1,B:1):1,C:2);";
        let tree = Tree::from_newick(s).unwrap();
        assert_eq!(format!("{}", tree), s);
    }

    #[test]
    fn test_quoted_and_internal_labels() {
        let tree = Tree::try_from("(('taxon one':1,B:1)ab:1,C:2)root;").unwrap();
        assert!(tree.tip_index("taxon one").is_some());
        assert_eq!(tree[tree.root()].label.as_deref(), Some("root"));
        assert_eq!(tree.internal_nodes()[0].label.as_deref(), Some("ab"));
    }

    #[test]
    fn test_unary_stem_collapses() {
        let tree = Tree::from_newick("((A:1,B:1):2);").unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root_height(), 1.0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Tree::from_newick("   ").unwrap_err(), TreeError::EmptyTree);
        assert!(matches!(Tree::from_newick("((A:1,B:1);"),
            Err(TreeError::UnbalancedParentheses(_))));
        assert!(matches!(Tree::from_newick("(A:1,B:1));"),
            Err(TreeError::UnbalancedParentheses(_))));
        assert!(matches!(Tree::from_newick("(A:x,B:1);"),
            Err(TreeError::InvalidBranchLength(_, _))));
        assert!(matches!(Tree::from_newick("(A:-1,B:1);"),
            Err(TreeError::InvalidBranchLength(_, _))));
        assert!(matches!(Tree::from_newick("(A:1,A:1);"),
            Err(TreeError::DuplicateTaxon(_))));
    }
}
