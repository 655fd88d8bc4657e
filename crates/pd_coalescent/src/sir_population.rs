use log::trace;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::PopulationFunction;

/// State of a simulated SIR epidemic after an event at forward time `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirEvent {
    pub time: f64,
    pub susceptible: u64,
    pub infected: u64,
}

/// Effective population size derived from a stochastic SIR epidemic.
///
/// The epidemic starts with one infected individual in a population of
/// `n` and runs for `duration` time units up to the present, with mass
/// action infection rate `beta * S * I / n` and recovery rate `gamma * I`.
/// Trajectories are drawn with the Gillespie direct method; every call to
/// `prepare` draws a new one.
///
/// The coalescent rate of a pair of lineages is `2 beta S / (n I)`, so the
/// effective size is its inverse. Where no one is infected (or susceptible)
/// the size is infinite: lineages cannot coalesce there. Before the origin
/// the initial state applies.
#[derive(Debug, Clone)]
pub struct StochasticSirPopulation {
    n: u64,
    beta: f64,
    gamma: f64,
    duration: f64,
    rng: StdRng,
    events: Vec<SirEvent>,
    /// Backward start time and coalescent rate factor (1/N) of each segment.
    segments: Vec<(f64, f64)>,
    /// Intensity accumulated up to the start of each segment.
    cumulative: Vec<f64>,
}

impl StochasticSirPopulation {
    pub fn new(n: u64, beta: f64, gamma: f64, duration: f64, seed: u64) -> Self {
        assert!(n >= 2, "population needs at least two individuals");
        assert!(beta > 0.0 && gamma >= 0.0, "rates must be non-negative (beta > 0)");
        assert!(duration > 0.0 && duration.is_finite(), "duration must be positive");
        let mut pop = Self {
            n,
            beta,
            gamma,
            duration,
            rng: StdRng::seed_from_u64(seed),
            events: Vec::new(),
            segments: Vec::new(),
            cumulative: Vec::new(),
        };
        pop.prepare();
        pop
    }

    /// Events of the current trajectory in forward time, starting with the
    /// initial state at time 0.
    pub fn events(&self) -> &[SirEvent] {
        &self.events
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    fn inverse_size(&self, event: &SirEvent) -> f64 {
        if event.infected == 0 {
            return 0.0;
        }
        2.0 * self.beta * event.susceptible as f64 / (self.n as f64 * event.infected as f64)
    }

    fn simulate(&mut self) {
        let n = self.n as f64;
        let mut state = SirEvent { time: 0.0, susceptible: self.n - 1, infected: 1 };
        self.events.clear();
        self.events.push(state);

        while state.infected > 0 {
            let infection = self.beta * state.susceptible as f64 * state.infected as f64 / n;
            let recovery = self.gamma * state.infected as f64;
            let total = infection + recovery;
            if total <= 0.0 {
                break;
            }
            let tinc = -(1.0 - self.rng.random::<f64>()).ln() / total;
            if state.time + tinc > self.duration {
                break;
            }
            state.time += tinc;
            if self.rng.random::<f64>() * total < infection {
                state.susceptible -= 1;
                state.infected += 1;
            } else {
                state.infected -= 1;
            }
            self.events.push(state);
        }
        trace!("SIR trajectory with {} events, final I = {}", self.events.len() - 1, state.infected);
    }

    fn rebuild_segments(&mut self) {
        self.segments.clear();
        self.cumulative.clear();
        // Newest event first: it covers the present.
        for (k, event) in self.events.iter().enumerate().rev() {
            let start = if k + 1 == self.events.len() {
                0.0
            } else {
                self.duration - self.events[k + 1].time
            };
            self.segments.push((start, self.inverse_size(event)));
        }
        let mut acc = 0.0;
        for k in 0..self.segments.len() {
            if k > 0 {
                let (start, rate) = self.segments[k - 1];
                acc += (self.segments[k].0 - start) * rate;
            }
            self.cumulative.push(acc);
        }
    }

    fn segment_at(&self, t: f64) -> usize {
        self.segments.partition_point(|&(start, _)| start <= t).saturating_sub(1)
    }
}

impl PopulationFunction for StochasticSirPopulation {
    fn pop_size(&self, t: f64) -> f64 {
        let rate = self.segments[self.segment_at(t)].1;
        if rate > 0.0 { 1.0 / rate } else { f64::INFINITY }
    }

    fn intensity(&self, t: f64) -> f64 {
        let k = self.segment_at(t);
        let (start, rate) = self.segments[k];
        self.cumulative[k] + (t - start).max(0.0) * rate
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        let k = self.cumulative.partition_point(|&c| c <= x).saturating_sub(1);
        let (start, rate) = self.segments[k];
        if rate > 0.0 {
            start + (x - self.cumulative[k]) / rate
        } else {
            f64::INFINITY
        }
    }

    fn is_prepared_per_draw(&self) -> bool {
        true
    }

    fn prepare(&mut self) {
        self.simulate();
        self.rebuild_segments();
    }
}
