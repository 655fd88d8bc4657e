use std::fmt;
use log::{debug, trace};
use serde::Serialize;

use pd_tree::TimedTree;

use crate::ConfigurationError;

/// Immutable snapshot of the compartment increments for one evaluation.
///
/// `ds[i]` is the number of susceptibles lost during interval `i`, `de[i]`
/// and `dr[i]` the inflow into the exposed and recovered compartments.
/// A missing `de` behaves like a vector of zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpidemicIncrements {
    pub s0: i64,
    pub ds: Vec<i64>,
    pub de: Option<Vec<i64>>,
    pub dr: Vec<i64>,
}

impl EpidemicIncrements {
    /// Number of birth-rate intervals.
    pub fn dim(&self) -> usize {
        self.ds.len()
    }

    /// Check the lengths `recompute` relies on, and `S0 >= 1`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let dim = self.dim();
        if dim == 0 {
            return Err(ConfigurationError::EmptyParameter("dS"));
        }
        if self.dr.len() != dim {
            return Err(ConfigurationError::IncrementLength {
                name: "dR", found: self.dr.len(), expected: dim,
            });
        }
        if let Some(de) = &self.de {
            if de.len() != dim {
                return Err(ConfigurationError::IncrementLength {
                    name: "dE", found: de.len(), expected: dim,
                });
            }
        }
        if self.s0 < 1 {
            return Err(ConfigurationError::InitialSusceptibles(self.s0));
        }
        Ok(())
    }

    fn de_at(&self, i: usize) -> i64 {
        self.de.as_ref().map_or(0, |de| de[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Compartments {
    pub susceptible: i64,
    pub infected: i64,
    pub recovered: i64,
}

impl Compartments {
    pub fn total(&self) -> i64 {
        self.susceptible + self.infected + self.recovered
    }
}

/// A reconstructed epidemic that is consistent with the tree.
///
/// `birth[k]` is the transmission rate that applies from forward time
/// `times[k]` (measured from the origin) onward, and `compartments[k]` the
/// compartment counts at that time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpidemicTrajectory {
    pub birth: Vec<f64>,
    pub times: Vec<f64>,
    pub compartments: Vec<Compartments>,
    /// Total duration of the process: root height plus origin offset.
    pub origin_time: f64,
    pub ntaxa: usize,
}

impl EpidemicTrajectory {
    pub fn final_state(&self) -> Compartments {
        // Never empty: the initial state is always recorded.
        self.compartments[self.compartments.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum InfeasibleReason {
    /// No infected individuals left at the end of an interval.
    Extinct { interval: usize, infected: i64 },
    /// Fewer infected individuals than lineages the tree needs at that time.
    TooFewInfected { interval: usize, infected: i64, lineages: usize },
    NegativeSusceptibles(i64),
    /// Fewer infections than sampled taxa.
    TooFewInfections { infections: i64, ntaxa: usize },
    /// S + I + R does not add up to S0.
    NotConserved { total: i64, s0: i64 },
}

impl fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extinct { interval, infected } =>
                write!(f, "epidemic extinct after interval {interval} (I = {infected})"),
            Self::TooFewInfected { interval, infected, lineages } =>
                write!(f, "I = {infected} < {lineages} lineages after interval {interval}"),
            Self::NegativeSusceptibles(s) =>
                write!(f, "negative number of susceptibles (S = {s})"),
            Self::TooFewInfections { infections, ntaxa } =>
                write!(f, "{infections} infections cannot explain {ntaxa} sampled taxa"),
            Self::NotConserved { total, s0 } =>
                write!(f, "S + I + R = {total} differs from S0 = {s0}"),
        }
    }
}

/// Outcome of one trajectory reconstruction. An infeasible trajectory is a
/// routine result (a rejected proposal), not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Feasibility {
    Feasible(EpidemicTrajectory),
    Infeasible(InfeasibleReason),
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible(_))
    }

    pub fn trajectory(&self) -> Option<&EpidemicTrajectory> {
        match self {
            Feasibility::Feasible(t) => Some(t),
            Feasibility::Infeasible(_) => None,
        }
    }

    pub fn birth_schedule(&self) -> Option<&[f64]> {
        self.trajectory().map(|t| &t.birth[..])
    }

    /// Contribution to the log-likelihood of the birth-death model: zero
    /// for a feasible trajectory, negative infinity otherwise.
    pub fn log_likelihood(&self) -> f64 {
        match self {
            Feasibility::Feasible(_) => 0.0,
            Feasibility::Infeasible(_) => f64::NEG_INFINITY,
        }
    }
}

/// Reconstruct the piecewise-constant birth-rate schedule from the
/// susceptible depletion and check that the implied number of infected
/// individuals can carry the tree.
///
/// The per-susceptible rate `b = prior_birth_rate0 / S0` is fixed by the
/// interval-0 rate; interval `k` then has rate `b * S_k` where `S_k` is the
/// susceptible count at the start of the interval. Interval boundaries
/// split `T = root height + origin_offset` evenly.
///
/// The tree is queried at most `dim - 1` times. The first failing interval
/// ends the evaluation. A transiently negative susceptible count is not
/// checked inside the loop; it propagates into non-positive rates and is
/// only rejected by the final checks.
///
/// Panics if the increments fail `EpidemicIncrements::validate`;
/// `BirthDeathSir` validates every snapshot before calling this.
pub fn recompute<T: TimedTree + ?Sized>(
    increments: &EpidemicIncrements,
    tree: &T,
    origin_offset: f64,
    prior_birth_rate0: f64,
) -> Feasibility {
    let dim = increments.dim();
    if let Err(e) = increments.validate() {
        panic!("invalid increments: {e}");
    }

    let s0 = increments.s0;
    let origin_time = tree.root_height() + origin_offset;
    let ntaxa = tree.leaf_count();

    let b = prior_birth_rate0 / s0 as f64;
    let mut cum_s = s0 - 1;
    let mut infected: i64 = 1;
    let mut recovered: i64 = 0;

    let mut birth = Vec::with_capacity(dim);
    let mut times = Vec::with_capacity(dim);
    let mut compartments = Vec::with_capacity(dim);

    birth.push(b * cum_s as f64);
    times.push(0.0);
    compartments.push(Compartments { susceptible: cum_s, infected, recovered });

    for i in 0..dim - 1 {
        let ds = increments.ds[i];
        let dr = increments.dr[i];

        cum_s -= ds;
        birth.push(b * cum_s as f64);

        infected += ds - increments.de_at(i) - dr;
        recovered += dr;
        let time = (i + 1) as f64 * origin_time / (dim - 1) as f64;
        trace!("interval {}: t = {:.6}, S = {}, I = {}, R = {}", i, time, cum_s, infected, recovered);

        if infected <= 0 {
            let reason = InfeasibleReason::Extinct { interval: i, infected };
            debug!("infeasible trajectory: {}", reason);
            return Feasibility::Infeasible(reason);
        }
        // The last boundary is the present; rounding must not push it below.
        let lineages = tree.lineage_count_at_time((origin_time - time).max(0.0));
        if infected < lineages as i64 {
            let reason = InfeasibleReason::TooFewInfected { interval: i, infected, lineages };
            debug!("infeasible trajectory: {}", reason);
            return Feasibility::Infeasible(reason);
        }

        times.push(time);
        compartments.push(Compartments { susceptible: cum_s, infected, recovered });
    }

    let reason = if cum_s < 0 {
        Some(InfeasibleReason::NegativeSusceptibles(cum_s))
    } else if s0 - cum_s < ntaxa as i64 {
        Some(InfeasibleReason::TooFewInfections { infections: s0 - cum_s, ntaxa })
    } else if cum_s + infected + recovered != s0 {
        Some(InfeasibleReason::NotConserved { total: cum_s + infected + recovered, s0 })
    } else {
        None
    };

    if let Some(reason) = reason {
        debug!("infeasible trajectory: {}", reason);
        return Feasibility::Infeasible(reason);
    }

    Feasibility::Feasible(EpidemicTrajectory {
        birth,
        times,
        compartments,
        origin_time,
        ntaxa,
    })
}
