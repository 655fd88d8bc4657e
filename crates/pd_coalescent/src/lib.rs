pub mod logger;

mod population;
mod sir_population;
mod trait_set;
mod generator;
mod sampler;

pub use population::*;
pub use sir_population::*;
pub use trait_set::*;
pub use generator::*;
pub use sampler::*;
