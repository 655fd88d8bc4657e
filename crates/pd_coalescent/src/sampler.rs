use std::fmt;
use std::io;
use log::{debug, info};
use rand::Rng;

use pd_tree::Tree;
use pd_tree::TimedTree;

use crate::TraitSource;
use crate::PopulationFunction;
use crate::GeneratorError;
use crate::RandomTreeGenerator;
use crate::logger::TreeLogger;

#[derive(Debug)]
pub enum SamplerError {
    /// Sampling dates are required to place the tips.
    NonTemporalTraits,
    /// The population function is not finite at a sampling time.
    NonFiniteIntensity { taxon: String, time: f64 },
    /// No tree below the height limit within the attempt cap.
    SamplingExhausted { replicate: usize, cap: usize, best_height: f64 },
    Generator(GeneratorError),
    Logger(io::Error),
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonTemporalTraits =>
                write!(f, "Trait set is not temporal: sampling dates are required"),
            Self::NonFiniteIntensity { taxon, time } => write!(f,
                "Population function is not finite at time {time} (sample of taxon '{taxon}')"),
            Self::SamplingExhausted { replicate, cap, best_height } => write!(f,
                "Replicate {replicate}: no tree below the height limit after {cap} attempts \
                 (lowest root height {best_height})"),
            Self::Generator(e) => write!(f, "Tree simulation failed: {e}"),
            Self::Logger(e) => write!(f, "Logger failed: {e}"),
        }
    }
}

impl std::error::Error for SamplerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generator(e) => Some(e),
            Self::Logger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeneratorError> for SamplerError {
    fn from(e: GeneratorError) -> Self { Self::Generator(e) }
}

impl From<io::Error> for SamplerError {
    fn from(e: io::Error) -> Self { Self::Logger(e) }
}

/// Summary of one accepted replicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub replicate: usize,
    /// Number of trees drawn until one was accepted.
    pub attempts: usize,
    pub root_height: f64,
}

/// Rejection sampler for coalescent trees with a bounded root height.
///
/// Each replicate draws trees until one has a root height strictly below
/// `max_height`. Population functions that must be prepared per draw are
/// prepared before every attempt, so rejected draws never reuse the same
/// population trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstrainedCoalescentSampler {
    max_height: f64,
    replicates: usize,
    max_attempts: Option<usize>,
}

impl ConstrainedCoalescentSampler {
    pub fn new(replicates: usize) -> Self {
        Self {
            max_height: f64::INFINITY,
            replicates,
            max_attempts: None,
        }
    }

    pub fn with_max_height(mut self, max_height: f64) -> Self {
        self.max_height = max_height;
        self
    }

    /// Give up on a replicate after this many rejected draws.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    pub fn replicates(&self) -> usize {
        self.replicates
    }

    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    pub fn validate<S, P>(&self, traits: &S, population: &P) -> Result<(), SamplerError>
    where
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
    {
        if !traits.is_temporal() {
            return Err(SamplerError::NonTemporalTraits);
        }
        for i in 0..traits.taxon_count() {
            let time = traits.value_at(i);
            if !population.pop_size(time).is_finite() {
                return Err(SamplerError::NonFiniteIntensity {
                    taxon: traits.taxon(i).to_string(),
                    time,
                });
            }
        }
        Ok(())
    }

    /// Draw a single tree below the height limit.
    pub fn draw<G, S, P, R>(
        &self,
        replicate: usize,
        generator: &G,
        traits: &S,
        population: &mut P,
        rng: &mut R,
    ) -> Result<(Tree, usize), SamplerError>
    where
        G: RandomTreeGenerator + ?Sized,
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
        R: Rng + ?Sized,
    {
        let mut attempts = 0;
        let mut best_height = f64::INFINITY;
        loop {
            if self.max_attempts.is_some_and(|cap| attempts >= cap) {
                return Err(SamplerError::SamplingExhausted {
                    replicate,
                    cap: attempts,
                    best_height,
                });
            }
            if population.is_prepared_per_draw() {
                population.prepare();
            }
            let tree = generator.generate(traits, &*population, rng)?;
            attempts += 1;
            let height = tree.root_height();
            if height < self.max_height {
                return Ok((tree, attempts));
            }
            best_height = best_height.min(height);
        }
    }

    pub fn run<G, S, P, R>(
        &self,
        generator: &G,
        traits: &S,
        population: &mut P,
        rng: &mut R,
        loggers: &mut [&mut dyn TreeLogger],
    ) -> Result<Vec<SampleStats>, SamplerError>
    where
        G: RandomTreeGenerator + ?Sized,
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
        R: Rng + ?Sized,
    {
        self.run_with(generator, traits, population, rng, loggers, |_| {})
    }

    /// Like `run`, but reports every accepted replicate to `callback`.
    ///
    /// Loggers that were initialized are closed on every exit path. The
    /// first error encountered is returned.
    pub fn run_with<G, S, P, R, F>(
        &self,
        generator: &G,
        traits: &S,
        population: &mut P,
        rng: &mut R,
        loggers: &mut [&mut dyn TreeLogger],
        mut callback: F,
    ) -> Result<Vec<SampleStats>, SamplerError>
    where
        G: RandomTreeGenerator + ?Sized,
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
        R: Rng + ?Sized,
        F: FnMut(&SampleStats),
    {
        self.validate(traits, &*population)?;
        info!("Sampling {} trees over {} taxa (max height {})",
            self.replicates, traits.taxon_count(), self.max_height);

        let mut initialized = 0;
        let mut result = Ok(());
        for logger in loggers.iter_mut() {
            result = logger.init().map_err(SamplerError::from);
            if result.is_err() {
                break;
            }
            initialized += 1;
        }

        let mut stats = Vec::with_capacity(self.replicates);
        if result.is_ok() {
            result = self.sample_all(generator, traits, population, rng, loggers, &mut stats, &mut callback);
        }

        for logger in loggers[..initialized].iter_mut() {
            if let Err(e) = logger.close() {
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }
        result.map(|()| stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_all<G, S, P, R, F>(
        &self,
        generator: &G,
        traits: &S,
        population: &mut P,
        rng: &mut R,
        loggers: &mut [&mut dyn TreeLogger],
        stats: &mut Vec<SampleStats>,
        callback: &mut F,
    ) -> Result<(), SamplerError>
    where
        G: RandomTreeGenerator + ?Sized,
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
        R: Rng + ?Sized,
        F: FnMut(&SampleStats),
    {
        for replicate in 0..self.replicates {
            let (tree, attempts) = self.draw(replicate, generator, traits, population, rng)?;
            let sample = SampleStats { replicate, attempts, root_height: tree.root_height() };
            debug!("Replicate {replicate}: root height {:.4} after {attempts} attempts",
                sample.root_height);
            for logger in loggers.iter_mut() {
                logger.log(replicate, &tree)?;
            }
            callback(&sample);
            stats.push(sample);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::{ConstantPopulation, CoalescentTreeGenerator, TraitSet, TraitKind};
    use crate::logger::HeightLogger;

    #[derive(Default)]
    struct Recorder {
        inits: usize,
        logged: Vec<usize>,
        closes: usize,
        fail_at: Option<usize>,
    }

    impl TreeLogger for Recorder {
        fn init(&mut self) -> io::Result<()> {
            self.inits += 1;
            Ok(())
        }

        fn log(&mut self, sample: usize, _tree: &Tree) -> io::Result<()> {
            if self.fail_at == Some(sample) {
                return Err(io::Error::other("disk full"));
            }
            self.logged.push(sample);
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes += 1;
            Ok(())
        }
    }

    struct FailingInit;

    impl TreeLogger for FailingInit {
        fn init(&mut self) -> io::Result<()> { Err(io::Error::other("no such file")) }
        fn log(&mut self, _: usize, _: &Tree) -> io::Result<()> { Ok(()) }
        fn close(&mut self) -> io::Result<()> { panic!("closed without init") }
    }

    /// Constant population that counts `prepare` calls.
    struct Counting {
        inner: ConstantPopulation,
        prepared: usize,
    }

    impl PopulationFunction for Counting {
        fn pop_size(&self, t: f64) -> f64 { self.inner.pop_size(t) }
        fn intensity(&self, t: f64) -> f64 { self.inner.intensity(t) }
        fn inverse_intensity(&self, x: f64) -> f64 { self.inner.inverse_intensity(x) }
        fn is_prepared_per_draw(&self) -> bool { true }
        fn prepare(&mut self) { self.prepared += 1; }
    }

    fn taxa() -> TraitSet {
        TraitSet::contemporaneous(["A", "B", "C", "D"]).unwrap()
    }

    #[test]
    fn test_unbounded_height_accepts_first_draw() {
        let sampler = ConstrainedCoalescentSampler::new(10);
        let mut pop = ConstantPopulation::new(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut rec = Recorder::default();
        let stats = sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
            &mut [&mut rec]).unwrap();
        assert_eq!(stats.len(), 10);
        assert!(stats.iter().all(|s| s.attempts == 1));
        assert_eq!(rec.inits, 1);
        assert_eq!(rec.closes, 1);
        assert_eq!(rec.logged, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_height_limit_is_respected() {
        let sampler = ConstrainedCoalescentSampler::new(50).with_max_height(1.0);
        let mut pop = ConstantPopulation::new(1.0);
        let mut rng = StdRng::seed_from_u64(8);
        let stats = sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
            &mut []).unwrap();
        assert!(stats.iter().all(|s| s.root_height < 1.0));
        // Expected root height of four taxa under N = 1 is 1.5.
        assert!(stats.iter().any(|s| s.attempts > 1));
    }

    #[test]
    fn test_prepare_once_per_attempt() {
        let sampler = ConstrainedCoalescentSampler::new(20).with_max_height(0.8);
        let mut pop = Counting { inner: ConstantPopulation::new(1.0), prepared: 0 };
        let mut rng = StdRng::seed_from_u64(5);
        let stats = sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
            &mut []).unwrap();
        let attempts: usize = stats.iter().map(|s| s.attempts).sum();
        assert_eq!(pop.prepared, attempts);
    }

    #[test]
    fn test_attempt_cap() {
        let sampler = ConstrainedCoalescentSampler::new(3)
            .with_max_height(0.0)
            .with_max_attempts(25);
        let mut pop = ConstantPopulation::new(1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut rec = Recorder::default();
        let err = sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
            &mut [&mut rec]).unwrap_err();
        match err {
            SamplerError::SamplingExhausted { replicate, cap, best_height } => {
                assert_eq!(replicate, 0);
                assert_eq!(cap, 25);
                assert!(best_height > 0.0 && best_height.is_finite());
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(rec.logged.is_empty());
        assert_eq!(rec.closes, 1);
    }

    #[test]
    fn test_loggers_closed_after_log_failure() {
        let sampler = ConstrainedCoalescentSampler::new(5);
        let mut pop = ConstantPopulation::new(1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut failing = Recorder { fail_at: Some(2), ..Default::default() };
        let mut other = Recorder::default();
        let err = sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
            &mut [&mut failing, &mut other]).unwrap_err();
        assert!(matches!(err, SamplerError::Logger(_)));
        assert_eq!(failing.logged, [0, 1]);
        assert_eq!(other.logged, [0, 1]);
        assert_eq!((failing.closes, other.closes), (1, 1));
    }

    #[test]
    fn test_only_initialized_loggers_are_closed() {
        let sampler = ConstrainedCoalescentSampler::new(2);
        let mut pop = ConstantPopulation::new(1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut first = Recorder::default();
        let mut broken = FailingInit;
        let mut never = Recorder::default();
        let err = sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
            &mut [&mut first, &mut broken, &mut never]).unwrap_err();
        assert!(matches!(err, SamplerError::Logger(_)));
        assert_eq!((first.inits, first.closes), (1, 1));
        assert_eq!((never.inits, never.closes), (0, 0));
        assert!(first.logged.is_empty());
    }

    #[test]
    fn test_validation() {
        let sampler = ConstrainedCoalescentSampler::new(1);
        let pop = ConstantPopulation::new(1.0);
        let locations = TraitSet::new(TraitKind::Categorical, [("A", "x"), ("B", "y")]).unwrap();
        assert!(matches!(sampler.validate(&locations, &pop),
            Err(SamplerError::NonTemporalTraits)));

        struct Empty;
        impl PopulationFunction for Empty {
            fn pop_size(&self, _t: f64) -> f64 { f64::INFINITY }
            fn intensity(&self, _t: f64) -> f64 { 0.0 }
            fn inverse_intensity(&self, _x: f64) -> f64 { f64::INFINITY }
        }
        match sampler.validate(&taxa(), &Empty) {
            Err(SamplerError::NonFiniteIntensity { taxon, time }) => {
                assert_eq!(taxon, "A");
                assert_eq!(time, 0.0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let sampler = ConstrainedCoalescentSampler::new(5).with_max_height(2.0);
        let run = |seed| {
            let mut pop = ConstantPopulation::new(1.0);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut heights = HeightLogger::new(Vec::new());
            sampler.run(&CoalescentTreeGenerator, &taxa(), &mut pop, &mut rng,
                &mut [&mut heights]).unwrap();
            String::from_utf8(heights.into_inner()).unwrap()
        };
        assert_eq!(run(17), run(17));
        assert_eq!(run(17).lines().count(), 6);
    }
}
