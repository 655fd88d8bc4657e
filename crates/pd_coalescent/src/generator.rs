use std::fmt;
use rand::Rng;

use pd_tree::Tree;
use pd_tree::TreeBuilder;
use pd_tree::TreeError;
use pd_tree::NodeIdx;

use crate::TraitSource;
use crate::PopulationFunction;

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorError {
    NoTaxa,
    /// The population function does not allow the remaining lineages to
    /// ever coalesce.
    NoCoalescence { lineages: usize, time: f64 },
    Tree(TreeError),
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTaxa => write!(f, "Cannot simulate a tree without taxa"),
            Self::NoCoalescence { lineages, time } =>
                write!(f, "{lineages} lineages can never coalesce beyond time {time}"),
            Self::Tree(e) => write!(f, "Tree construction failed: {e}"),
        }
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TreeError> for GeneratorError {
    fn from(e: TreeError) -> Self { Self::Tree(e) }
}

/// Draws random trees over a set of (possibly serially sampled) taxa.
pub trait RandomTreeGenerator {
    fn generate<S, P, R>(
        &self,
        traits: &S,
        population: &P,
        rng: &mut R,
    ) -> Result<Tree, GeneratorError>
    where
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
        R: Rng + ?Sized;
}

/// Kingman's coalescent with heterochronous samples.
///
/// Starting from the most recent sample, the waiting time to the next
/// coalescence among `k` lineages is found by inverting the intensity of
/// the population function: an exponential draw divided by `k choose 2` is
/// the intensity that has to accumulate. Samples that enter before the
/// proposed coalescence restart the wait (the process is memoryless).
#[derive(Debug, Clone, Copy, Default)]
pub struct CoalescentTreeGenerator;

impl RandomTreeGenerator for CoalescentTreeGenerator {
    fn generate<S, P, R>(
        &self,
        traits: &S,
        population: &P,
        rng: &mut R,
    ) -> Result<Tree, GeneratorError>
    where
        S: TraitSource + ?Sized,
        P: PopulationFunction + ?Sized,
        R: Rng + ?Sized,
    {
        let n = traits.taxon_count();
        if n == 0 {
            return Err(GeneratorError::NoTaxa);
        }

        let mut builder = TreeBuilder::with_capacity(n);
        let mut samples: Vec<(f64, NodeIdx)> = (0..n)
            .map(|i| {
                let height = traits.value_at(i);
                (height, builder.add_tip(Some(traits.taxon(i).to_string()), height))
            })
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut active: Vec<NodeIdx> = Vec::with_capacity(n);
        let mut next = 0;
        let mut t = samples[0].0;

        loop {
            while next < n && samples[next].0 <= t {
                active.push(samples[next].1);
                next += 1;
            }
            let next_sample = samples.get(next).map_or(f64::INFINITY, |s| s.0);
            let k = active.len();
            if k < 2 {
                if next == n {
                    break;
                }
                t = next_sample;
                continue;
            }

            let pairs = (k * (k - 1) / 2) as f64;
            let waiting = -(1.0 - rng.random::<f64>()).ln() / pairs;
            let t_coal = population.inverse_intensity(population.intensity(t) + waiting);

            if !(t_coal < next_sample) {
                if next_sample.is_finite() {
                    t = next_sample;
                    continue;
                }
                return Err(GeneratorError::NoCoalescence { lineages: k, time: t });
            }

            let i = rng.random_range(0..k);
            let mut j = rng.random_range(0..k - 1);
            if j >= i {
                j += 1;
            }
            let (a, b) = (active[i], active[j]);
            active.swap_remove(i.max(j));
            active.swap_remove(i.min(j));
            // Guard against round-off in the intensity inversion.
            t = t_coal.max(t);
            active.push(builder.join(&[a, b], t)?);
        }

        Ok(builder.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use pd_tree::TimedTree;

    use crate::{ConstantPopulation, TraitSet, TraitKind};

    #[test]
    fn test_contemporaneous_tree() {
        let traits = TraitSet::contemporaneous(["A", "B", "C", "D", "E"]).unwrap();
        let pop = ConstantPopulation::new(1.0);
        let mut rng = StdRng::seed_from_u64(42);
        let tree = CoalescentTreeGenerator.generate(&traits, &pop, &mut rng).unwrap();

        assert_eq!(tree.leaf_count(), 5);
        assert_eq!(tree.len(), 9);
        assert!(tree.root_height() > 0.0);
        assert!(tree.tips().iter().all(|n| n.height == 0.0));
        for name in ["A", "B", "C", "D", "E"] {
            assert!(tree.tip_index(name).is_some());
        }
        // Strictly bifurcating, every internal node above its children.
        for node in tree.internal_nodes() {
            assert_eq!(node.children.len(), 2);
            assert!(node.children.iter().all(|&c| tree[c].height <= node.height));
        }
    }

    #[test]
    fn test_serial_samples_keep_heights() {
        let traits = TraitSet::new(TraitKind::DateBackward,
            [("A", "0"), ("B", "3"), ("C", "10")]).unwrap();
        let pop = ConstantPopulation::new(0.5);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let tree = CoalescentTreeGenerator.generate(&traits, &pop, &mut rng).unwrap();
            let c = tree.tip_index("C").unwrap();
            assert_eq!(tree[c].height, 10.0);
            assert!(tree.root_height() > 10.0);
        }
    }

    #[test]
    fn test_single_taxon() {
        let traits = TraitSet::contemporaneous(["A"]).unwrap();
        let pop = ConstantPopulation::new(1.0);
        let tree = CoalescentTreeGenerator
            .generate(&traits, &pop, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_height(), 0.0);
    }

    #[test]
    fn test_mean_root_height_two_taxa() {
        // Two lineages under N = 2 coalesce after Exp(1/2): mean 2.
        let traits = TraitSet::contemporaneous(["A", "B"]).unwrap();
        let pop = ConstantPopulation::new(2.0);
        let mut rng = StdRng::seed_from_u64(2024);
        let reps = 4000;
        let mean: f64 = (0..reps)
            .map(|_| CoalescentTreeGenerator.generate(&traits, &pop, &mut rng).unwrap().root_height())
            .sum::<f64>() / reps as f64;
        assert!((mean - 2.0).abs() < 0.2, "mean root height {mean}");
    }

    #[test]
    fn test_no_coalescence() {
        struct Frozen;
        impl PopulationFunction for Frozen {
            fn pop_size(&self, _t: f64) -> f64 { f64::INFINITY }
            fn intensity(&self, _t: f64) -> f64 { 0.0 }
            fn inverse_intensity(&self, _x: f64) -> f64 { f64::INFINITY }
        }
        let traits = TraitSet::contemporaneous(["A", "B"]).unwrap();
        let err = CoalescentTreeGenerator
            .generate(&traits, &Frozen, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert_eq!(err, GeneratorError::NoCoalescence { lineages: 2, time: 0.0 });
    }
}
