use std::path::PathBuf;
use clap::Args;
use clap::ValueEnum;
use anyhow::Result;
use anyhow::bail;
use log::debug;

use pd_coalescent::TraitKind;
use pd_coalescent::PopulationFunction;
use pd_coalescent::ConstantPopulation;
use pd_coalescent::ExponentialGrowth;
use pd_coalescent::StochasticSirPopulation;
use pd_coalescent::ConstrainedCoalescentSampler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateKind {
    /// Calendar dates (larger is more recent).
    Forward,
    /// Ages before present (larger is older).
    Backward,
}

impl From<DateKind> for TraitKind {
    fn from(kind: DateKind) -> Self {
        match kind {
            DateKind::Forward => TraitKind::DateForward,
            DateKind::Backward => TraitKind::DateBackward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PopulationModel {
    Constant,
    Exponential,
    Sir,
}

/// Demographic model parameters.
#[derive(Debug, Args)]
pub struct PopulationArgs {
    /// Population model.
    #[arg(long, value_enum, default_value_t = PopulationModel::Constant)]
    pub population: PopulationModel,

    /// Effective population size at the present (constant, exponential).
    #[arg(long, default_value_t = 1.0)]
    pub pop_size: f64,

    /// Exponential growth rate towards the present.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub growth_rate: f64,

    /// Total host population of the SIR epidemic.
    #[arg(long, default_value_t = 1000)]
    pub sir_hosts: u64,

    /// SIR infection rate.
    #[arg(long, default_value_t = 2.0)]
    pub sir_beta: f64,

    /// SIR recovery rate.
    #[arg(long, default_value_t = 1.0)]
    pub sir_gamma: f64,

    /// Time from the start of the epidemic to the present.
    #[arg(long, default_value_t = 10.0)]
    pub sir_duration: f64,
}

impl PopulationArgs {
    /// Validate that all parameters make sense.
    pub fn validate(&self) -> Result<()> {
        match self.population {
            PopulationModel::Constant | PopulationModel::Exponential => {
                if !(self.pop_size > 0.0 && self.pop_size.is_finite()) {
                    bail!("pop_size must be positive and finite (got {})", self.pop_size);
                }
                if !self.growth_rate.is_finite() {
                    bail!("growth_rate must be finite (got {})", self.growth_rate);
                }
            }
            PopulationModel::Sir => {
                if self.sir_hosts < 2 {
                    bail!("sir_hosts must be at least 2 (got {})", self.sir_hosts);
                }
                if !(self.sir_beta > 0.0) || !(self.sir_gamma >= 0.0) {
                    bail!("SIR rates must satisfy beta > 0 and gamma >= 0 (got {}, {})",
                        self.sir_beta, self.sir_gamma);
                }
                if !(self.sir_duration > 0.0 && self.sir_duration.is_finite()) {
                    bail!("sir_duration must be positive and finite (got {})", self.sir_duration);
                }
            }
        }
        Ok(())
    }

    /// Build the population function. Call `validate` first.
    pub fn build(&self, seed: u64) -> Box<dyn PopulationFunction> {
        debug!("Population model: {:?}", self.population);
        match self.population {
            PopulationModel::Constant => Box::new(ConstantPopulation::new(self.pop_size)),
            PopulationModel::Exponential =>
                Box::new(ExponentialGrowth::new(self.pop_size, self.growth_rate)),
            PopulationModel::Sir => Box::new(StochasticSirPopulation::new(
                self.sir_hosts,
                self.sir_beta,
                self.sir_gamma,
                self.sir_duration,
                seed,
            )),
        }
    }
}

/// Rejection sampling parameters.
#[derive(Debug, Args)]
pub struct SamplerArgs {
    /// Number of trees to sample.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub replicates: usize,

    /// Reject trees with a root height at or above this value.
    #[arg(long)]
    pub max_height: Option<f64>,

    /// Give up after this many rejected trees per replicate.
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Seed for reproducible runs.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SamplerArgs {
    /// Validate that all parameters make sense.
    pub fn validate(&self) -> Result<()> {
        if self.replicates == 0 {
            bail!("replicates must be > 0");
        }
        if let Some(h) = self.max_height {
            if !(h > 0.0) {
                bail!("max_height must be > 0 (got {})", h);
            }
        }
        if self.max_attempts == Some(0) {
            bail!("max_attempts must be > 0");
        }
        Ok(())
    }

    pub fn build(&self) -> ConstrainedCoalescentSampler {
        let mut sampler = ConstrainedCoalescentSampler::new(self.replicates);
        if let Some(h) = self.max_height {
            sampler = sampler.with_max_height(h);
        }
        if let Some(cap) = self.max_attempts {
            sampler = sampler.with_max_attempts(cap);
        }
        sampler
    }
}

/// Where sampled trees go.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write sampled trees to this file (stdout if no output is given).
    #[arg(long, value_name = "FILE")]
    pub newick: Option<PathBuf>,

    /// Wrap the trees in a NEXUS trees block.
    #[arg(long, requires = "newick")]
    pub nexus: bool,

    /// Write root heights and tree lengths to this file.
    #[arg(long, value_name = "FILE")]
    pub heights: Option<PathBuf>,
}
