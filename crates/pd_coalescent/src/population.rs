/// Effective population size through (backward) time.
///
/// Coalescent simulation only needs the intensity `I(t) = ∫_0^t 1/N(s) ds`
/// and its inverse; `pop_size` is used for sanity checks and output.
pub trait PopulationFunction {
    fn pop_size(&self, t: f64) -> f64;

    fn intensity(&self, t: f64) -> f64;

    /// Smallest `t` with `intensity(t) >= x`, or infinity if the
    /// intensity never gets there.
    fn inverse_intensity(&self, x: f64) -> f64;

    /// Functions returning `true` are re-prepared before every tree draw.
    fn is_prepared_per_draw(&self) -> bool {
        false
    }

    /// Per-draw precomputation, e.g. simulating a new epidemic.
    fn prepare(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPopulation {
    pub n0: f64,
}

impl ConstantPopulation {
    pub fn new(n0: f64) -> Self {
        assert!(n0 > 0.0, "population size must be positive");
        Self { n0 }
    }
}

impl PopulationFunction for ConstantPopulation {
    fn pop_size(&self, _t: f64) -> f64 {
        self.n0
    }

    fn intensity(&self, t: f64) -> f64 {
        t / self.n0
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        x * self.n0
    }
}

/// `N(t) = N0 * exp(-r t)`: a population that grew at rate `r` towards the
/// present (or shrank, for negative `r`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialGrowth {
    pub n0: f64,
    pub growth_rate: f64,
}

impl ExponentialGrowth {
    pub fn new(n0: f64, growth_rate: f64) -> Self {
        assert!(n0 > 0.0, "population size must be positive");
        Self { n0, growth_rate }
    }
}

impl PopulationFunction for ExponentialGrowth {
    fn pop_size(&self, t: f64) -> f64 {
        self.n0 * (-self.growth_rate * t).exp()
    }

    fn intensity(&self, t: f64) -> f64 {
        let r = self.growth_rate;
        if r == 0.0 {
            t / self.n0
        } else {
            (r * t).exp_m1() / (self.n0 * r)
        }
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        let r = self.growth_rate;
        if r == 0.0 {
            return x * self.n0;
        }
        let arg = x * self.n0 * r;
        if arg <= -1.0 {
            // A shrinking-into-the-past population saturates.
            f64::INFINITY
        } else {
            arg.ln_1p() / r
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_population() {
        let pop = ConstantPopulation::new(4.0);
        assert_eq!(pop.pop_size(17.0), 4.0);
        assert_eq!(pop.intensity(2.0), 0.5);
        assert_eq!(pop.inverse_intensity(0.5), 2.0);
        assert!(!pop.is_prepared_per_draw());
    }

    #[test]
    fn test_exponential_growth_inverse() {
        let pop = ExponentialGrowth::new(10.0, 0.7);
        for t in [0.0, 0.3, 1.0, 4.5] {
            let x = pop.intensity(t);
            assert!((pop.inverse_intensity(x) - t).abs() < 1e-9);
        }
        assert!((pop.pop_size(1.0) - 10.0 * (-0.7f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_growth_zero_rate() {
        let pop = ExponentialGrowth::new(2.0, 0.0);
        assert_eq!(pop.intensity(3.0), 1.5);
        assert_eq!(pop.inverse_intensity(1.5), 3.0);
    }

    #[test]
    fn test_exponential_decline_saturates() {
        // I(t) -> 1 / (n0 * |r|) = 0.5 as t -> infinity.
        let pop = ExponentialGrowth::new(1.0, -2.0);
        assert!(pop.intensity(5.0) < 0.5);
        assert!(pop.inverse_intensity(0.4).is_finite());
        assert_eq!(pop.inverse_intensity(0.5), f64::INFINITY);
        assert_eq!(pop.inverse_intensity(0.7), f64::INFINITY);
    }
}
