/// Scalar and vector parameters, and the trait the models read them through.
mod parameters;

/// Configuration errors raised while wiring up a model.
mod error;

/// The SIR trajectory recursion and its feasibility checks.
mod trajectory;

/// Birth-death SIR model on top of live parameter sources.
mod bdsir;

/// Serializable model configuration.
pub mod config;

/// SVG plots of reconstructed trajectories.
pub mod trajectory_plotting;

pub use parameters::*;
pub use error::*;
pub use trajectory::*;
pub use bdsir::*;
