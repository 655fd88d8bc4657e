//! # phylodyn
//!
//! Unified API for birth-death SIR trajectory reconstruction and
//! constrained coalescent simulation on timed phylogenies.
//!
//! This crate re-exports the main functionality from its submodules.

pub mod input_parsers;
pub mod coalescent_parsers;

pub mod tree {
    pub use ::pd_tree::*;
}

pub mod epidemic {
    pub use ::pd_epidemic::*;
}

pub mod coalescent {
    pub use ::pd_coalescent::*;
}
