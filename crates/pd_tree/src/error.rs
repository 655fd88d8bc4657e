use std::fmt;

use crate::NodeIdx;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    EmptyTree,
    UnbalancedParentheses(usize),     // position of the offending token
    UnexpectedToken(char, usize),     // token and position
    InvalidBranchLength(String, usize),
    NegativeBranch(NodeIdx),          // child is older than its parent
    UnknownNode(NodeIdx),
    NodeReused(NodeIdx),              // node already has a parent
    DegenerateJoin(usize),            // number of children passed to join
    DuplicateTaxon(String),
    MultipleRoots(usize),             // number of unjoined subtrees
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::EmptyTree => {
                write!(f, "Tree has no nodes")
            }
            TreeError::UnbalancedParentheses(i) => {
                write!(f, "Unbalanced parentheses at position {}", i)
            }
            TreeError::UnexpectedToken(c, i) => {
                write!(f, "Unexpected '{}' at position {}", c, i)
            }
            TreeError::InvalidBranchLength(s, i) => {
                write!(f, "Invalid branch length '{}' at position {}", s, i)
            }
            TreeError::NegativeBranch(n) => {
                write!(f, "Node {} is older than its parent", n)
            }
            TreeError::UnknownNode(n) => {
                write!(f, "Unknown node {}", n)
            }
            TreeError::NodeReused(n) => {
                write!(f, "Node {} already has a parent", n)
            }
            TreeError::DegenerateJoin(k) => {
                write!(f, "Cannot join {} subtree(s), need at least two", k)
            }
            TreeError::DuplicateTaxon(s) => {
                write!(f, "Taxon '{}' occurs more than once", s)
            }
            TreeError::MultipleRoots(k) => {
                write!(f, "Tree is disconnected ({} unjoined subtrees)", k)
            }
        }
    }
}

impl std::error::Error for TreeError {}
