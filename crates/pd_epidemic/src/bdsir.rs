use log::debug;
use pd_tree::TimedTree;

use crate::ParameterSource;
use crate::ConfigurationError;
use crate::EpidemicIncrements;
use crate::Feasibility;
use crate::recompute;

/// The two ways a birth-death skyline model can be parameterized.
///
/// In the epidemiological transform the rates are derived from the basic
/// reproductive number `R0`, the become-uninfectious rate `delta` and the
/// sampling proportion `p`: birth = `R0 * delta`, death = `delta * (1 - p)`,
/// sampling = `delta * p`.
#[derive(Clone, Copy)]
pub enum SkylineRates<'a> {
    Canonical {
        birth_rate: &'a dyn ParameterSource,
        death_rate: &'a dyn ParameterSource,
        sampling_rate: &'a dyn ParameterSource,
    },
    Epidemiological {
        r0: &'a dyn ParameterSource,
        become_uninfectious_rate: &'a dyn ParameterSource,
        sampling_proportion: &'a dyn ParameterSource,
    },
}

impl<'a> SkylineRates<'a> {
    pub fn is_transform(&self) -> bool {
        matches!(self, SkylineRates::Epidemiological { .. })
    }

    /// The SIR reparameterization replaces the birth-rate skyline, so the
    /// rate that seeds it must be a single value.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let (leading, others): (_, [(&'static str, &dyn ParameterSource); 2]) = match self {
            SkylineRates::Canonical { birth_rate, death_rate, sampling_rate } => (
                ("birthRate", *birth_rate),
                [("deathRate", *death_rate), ("samplingRate", *sampling_rate)],
            ),
            SkylineRates::Epidemiological { r0, become_uninfectious_rate, sampling_proportion } => (
                ("R0", *r0),
                [("becomeUninfectiousRate", *become_uninfectious_rate),
                 ("samplingProportion", *sampling_proportion)],
            ),
        };
        let (name, param) = leading;
        if param.dimension() != 1 {
            return Err(ConfigurationError::RateDimension { name, found: param.dimension() });
        }
        for (name, param) in others {
            if param.dimension() == 0 {
                return Err(ConfigurationError::EmptyParameter(name));
            }
        }
        Ok(())
    }

    pub fn birth_rate0(&self) -> f64 {
        match self {
            SkylineRates::Canonical { birth_rate, .. } => birth_rate.value(0),
            SkylineRates::Epidemiological { r0, become_uninfectious_rate, .. } =>
                r0.value(0) * become_uninfectious_rate.value(0),
        }
    }

    pub fn death_rate0(&self) -> f64 {
        match self {
            SkylineRates::Canonical { death_rate, .. } => death_rate.value(0),
            SkylineRates::Epidemiological { become_uninfectious_rate, sampling_proportion, .. } =>
                become_uninfectious_rate.value(0) * (1.0 - sampling_proportion.value(0)),
        }
    }

    pub fn sampling_rate0(&self) -> f64 {
        match self {
            SkylineRates::Canonical { sampling_rate, .. } => sampling_rate.value(0),
            SkylineRates::Epidemiological { become_uninfectious_rate, sampling_proportion, .. } =>
                become_uninfectious_rate.value(0) * sampling_proportion.value(0),
        }
    }
}

/// Everything a `BirthDeathSir` model reads from its host.
#[derive(Clone, Copy)]
pub struct BirthDeathSirInputs<'a> {
    /// Initial number of susceptibles (scalar).
    pub s0: &'a dyn ParameterSource,
    pub ds: &'a dyn ParameterSource,
    pub de: Option<&'a dyn ParameterSource>,
    pub dr: &'a dyn ParameterSource,
    /// Time between the origin of the epidemic and the root of the tree.
    pub origin_to_root: &'a dyn ParameterSource,
    pub rates: SkylineRates<'a>,
}

/// Birth-death-sampling model whose birth rate follows the susceptible
/// depletion of an SIR epidemic.
///
/// The model holds on to its parameter sources and re-reads them on every
/// evaluation; nothing is cached between calls.
pub struct BirthDeathSir<'a> {
    inputs: BirthDeathSirInputs<'a>,
}

impl<'a> BirthDeathSir<'a> {
    pub fn new(inputs: BirthDeathSirInputs<'a>) -> Result<Self, ConfigurationError> {
        inputs.rates.validate()?;

        let dim = inputs.ds.dimension();
        if dim == 0 {
            return Err(ConfigurationError::EmptyParameter("dS"));
        }
        if inputs.dr.dimension() != dim {
            return Err(ConfigurationError::IncrementLength {
                name: "dR", found: inputs.dr.dimension(), expected: dim,
            });
        }
        if let Some(de) = inputs.de {
            if de.dimension() != dim {
                return Err(ConfigurationError::IncrementLength {
                    name: "dE", found: de.dimension(), expected: dim,
                });
            }
        }
        if inputs.s0.dimension() == 0 {
            return Err(ConfigurationError::EmptyParameter("S0"));
        }
        let s0 = inputs.s0.scalar_value() as i64;
        if s0 < 1 {
            return Err(ConfigurationError::InitialSusceptibles(s0));
        }
        if inputs.origin_to_root.dimension() == 0 {
            return Err(ConfigurationError::EmptyParameter("origin"));
        }
        let offset = inputs.origin_to_root.scalar_value();
        if !offset.is_finite() || offset < 0.0 {
            return Err(ConfigurationError::OriginOffset(offset));
        }

        debug!("BDSIR model: S0 = {}, {} intervals, transform = {}",
            s0, dim, inputs.rates.is_transform());
        Ok(Self { inputs })
    }

    /// Number of birth-rate changes: one per interval boundary.
    pub fn birth_rate_changes(&self) -> usize {
        self.inputs.ds.dimension() - 1
    }

    pub fn rates(&self) -> &SkylineRates<'a> {
        &self.inputs.rates
    }

    pub fn origin_offset(&self) -> f64 {
        self.inputs.origin_to_root.scalar_value()
    }

    /// Read the current parameter values into an immutable snapshot.
    ///
    /// Sources may change size after construction, so every snapshot is
    /// checked again before it is handed to the recursion.
    pub fn snapshot(&self) -> Result<EpidemicIncrements, ConfigurationError> {
        let increments = EpidemicIncrements {
            s0: self.inputs.s0.scalar_value() as i64,
            ds: self.inputs.ds.integer_values(),
            de: self.inputs.de.map(|de| de.integer_values()),
            dr: self.inputs.dr.integer_values(),
        };
        increments.validate()?;
        Ok(increments)
    }

    /// Recompute the birth-rate schedule for the current parameters and tree.
    pub fn update_rates_and_times<T: TimedTree + ?Sized>(
        &self,
        tree: &T,
    ) -> Result<Feasibility, ConfigurationError> {
        let increments = self.snapshot()?;
        Ok(recompute(
            &increments,
            tree,
            self.origin_offset(),
            self.inputs.rates.birth_rate0(),
        ))
    }

    pub fn log_likelihood<T: TimedTree + ?Sized>(
        &self,
        tree: &T,
    ) -> Result<f64, ConfigurationError> {
        Ok(self.update_rates_and_times(tree)?.log_likelihood())
    }
}
