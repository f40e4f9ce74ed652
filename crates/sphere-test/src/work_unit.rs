//! Work units: accepted sphere samples and their permutation p-values.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::config::{ControlSampling, NullModel, SphereTestConfig};
use crate::error::SphereTestError;
use crate::sampler::{RandomSampler, SphereSampler};
use crate::statistic::SphereStatistic;
use crate::types::{Gene, Population};

/// Salt separating shared null-distribution generators from work-unit ones.
const NULL_SEED_SALT: u64 = 0xD1B5_4A32_D192_ED03;

/// Derive an independent generator seed for stream `index` of a run.
pub fn stream_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64)
        .wrapping_add(1)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// One accepted sphere sample together with its test results.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Indices of the genes inside the sphere, in population order.
    pub genes: Vec<usize>,
    /// Statistic over the sphere's genes.
    pub observed_statistic: f64,
    /// Statistic of the last random comparison set.
    pub random_statistic: f64,
    /// Random comparison sets at least as extreme as the sphere.
    pub extreme_count: usize,
    /// Raw p-value, never below `1 / random_sample_count`.
    pub p_value: f64,
    /// 1-based rank by raw p-value, set by the corrector.
    pub rank: usize,
    /// Benjamini-Hochberg adjusted p-value.
    pub adjusted_p_value: f64,
    sampler: RandomSampler,
}

impl WorkUnit {
    pub fn new(genes: Vec<usize>, sampler: RandomSampler) -> Self {
        Self {
            genes,
            observed_statistic: 0.0,
            random_statistic: 0.0,
            extreme_count: 0,
            p_value: 1.0,
            rank: 0,
            adjusted_p_value: 1.0,
            sampler,
        }
    }

    /// Number of genes in the sphere.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Compute the observed statistic, then draw `random_sample_count`
    /// size-matched comparison sets with this unit's own sampler.
    pub fn calculate_p_value<G, S>(
        &mut self,
        population: &Population<G>,
        statistic: &S,
        random_sample_count: usize,
        control: ControlSampling,
    ) -> Result<(), SphereTestError>
    where
        G: Gene,
        S: SphereStatistic<G> + ?Sized,
    {
        if random_sample_count == 0 {
            return Err(SphereTestError::InvalidConfig(
                "random sample count must be at least 1".into(),
            ));
        }
        self.observed_statistic = statistic.statistic(&population.resolve(&self.genes))?;
        self.extreme_count = 0;

        let mut random_genes = Vec::with_capacity(self.genes.len());
        for _ in 0..random_sample_count {
            self.sampler
                .draw_into(control, self.genes.len(), &mut random_genes)?;
            self.random_statistic = statistic.statistic(&population.resolve(&random_genes))?;
            if statistic.is_more_extreme(self.random_statistic, self.observed_statistic) {
                self.extreme_count += 1;
            }
        }

        self.p_value = floored(
            statistic.p_value(self.extreme_count, random_sample_count),
            random_sample_count,
        );
        Ok(())
    }

    /// Compute the observed statistic and compare it against a precomputed
    /// null distribution for this unit's size.
    pub fn score_against_null<G, S>(
        &mut self,
        population: &Population<G>,
        statistic: &S,
        null: &[f64],
    ) -> Result<(), SphereTestError>
    where
        G: Gene,
        S: SphereStatistic<G> + ?Sized,
    {
        if null.is_empty() {
            return Err(SphereTestError::size_mismatch(
                "null distribution length",
                1,
                0,
            ));
        }
        self.observed_statistic = statistic.statistic(&population.resolve(&self.genes))?;
        let observed = self.observed_statistic;
        self.extreme_count = null
            .iter()
            .filter(|&&random| statistic.is_more_extreme(random, observed))
            .count();
        self.random_statistic = null[null.len() - 1];
        self.p_value = floored(statistic.p_value(self.extreme_count, null.len()), null.len());
        Ok(())
    }
}

/// Floor a p-value at `1 / total` so no unit reports zero.
fn floored(p_value: f64, total: usize) -> f64 {
    p_value.max(1.0 / total as f64)
}

/// Bookkeeping from the sampling phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingReport {
    /// Spheres drawn, accepted or not.
    pub attempts: usize,
    /// Spheres rejected by size or by the statistic's acceptance predicate.
    pub rejected: usize,
    /// Mean gene count of accepted spheres.
    pub average_genes_in_sphere: f64,
}

/// Rejection-sample spheres until `config.sample_count` are accepted.
///
/// Fails with [`SphereTestError::SamplingExhausted`] once the attempt
/// budget is spent.
pub fn create_work_units<G, S>(
    population: &Population<G>,
    statistic: &S,
    config: &SphereTestConfig,
) -> Result<(Vec<WorkUnit>, SamplingReport), SphereTestError>
where
    G: Gene,
    S: SphereStatistic<G> + ?Sized,
{
    let target = config.sample_count;
    let max_attempts = config.sampling_attempts();
    let mut sphere_sampler =
        SphereSampler::new(population, config.box_min, config.box_max, config.seed)?;

    let mut units = Vec::with_capacity(target);
    let mut report = SamplingReport::default();
    let mut total_genes = 0usize;

    while units.len() < target {
        if report.attempts >= max_attempts {
            return Err(SphereTestError::SamplingExhausted {
                accepted: units.len(),
                target,
                attempts: report.attempts,
            });
        }
        report.attempts += 1;

        let genes = sphere_sampler.sample(config.sphere_radius);
        if genes.len() < config.minimum_gene_count
            || !statistic.accept_sample(&population.resolve(&genes))
        {
            report.rejected += 1;
            continue;
        }

        total_genes += genes.len();
        let sampler = RandomSampler::new(population.len(), stream_seed(config.seed, units.len()))?;
        units.push(WorkUnit::new(genes, sampler));
    }

    if !units.is_empty() {
        report.average_genes_in_sphere = total_genes as f64 / units.len() as f64;
    }
    Ok((units, report))
}

/// Fill in observed statistics and raw p-values for every work unit.
///
/// Units are independent and run on the rayon pool; each uses only its own
/// generator and the shared, read-only population.
pub fn calculate_p_values<G, S>(
    units: &mut [WorkUnit],
    population: &Population<G>,
    statistic: &S,
    config: &SphereTestConfig,
) -> Result<(), SphereTestError>
where
    G: Gene + Sync,
    S: SphereStatistic<G>,
{
    let random_sample_count = config.random_samples();
    if random_sample_count == 0 {
        return Err(SphereTestError::InvalidConfig(
            "random sample count must be at least 1".into(),
        ));
    }

    match config.null_model {
        NullModel::PerWorkUnit => units.par_iter_mut().try_for_each(|unit| {
            unit.calculate_p_value(population, statistic, random_sample_count, config.control)
        }),
        NullModel::SharedBySize => {
            let sizes: BTreeSet<usize> = units.iter().map(WorkUnit::len).collect();
            let nulls = null_distributions(population, statistic, config, &sizes)?;
            units.par_iter_mut().try_for_each(|unit| {
                let null = nulls
                    .get(&unit.len())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                unit.score_against_null(population, statistic, null)
            })
        }
    }
}

/// One distribution of `random_samples()` random statistics per gene count.
///
/// Each size gets its own generator so the result does not depend on how
/// sizes are spread over threads.
pub fn null_distributions<G, S>(
    population: &Population<G>,
    statistic: &S,
    config: &SphereTestConfig,
    sizes: &BTreeSet<usize>,
) -> Result<BTreeMap<usize, Vec<f64>>, SphereTestError>
where
    G: Gene + Sync,
    S: SphereStatistic<G>,
{
    let random_sample_count = config.random_samples();
    let sizes: Vec<usize> = sizes.iter().copied().collect();
    log::debug!(
        "Drawing shared null distributions for {} distinct sphere sizes",
        sizes.len()
    );

    sizes
        .par_iter()
        .map(|&size| {
            let seed = stream_seed(config.seed ^ NULL_SEED_SALT, size);
            let mut sampler = RandomSampler::new(population.len(), seed)?;
            let mut random_genes = Vec::with_capacity(size);
            let mut stats = Vec::with_capacity(random_sample_count);
            for _ in 0..random_sample_count {
                sampler.draw_into(config.control, size, &mut random_genes)?;
                stats.push(statistic.statistic(&population.resolve(&random_genes))?);
            }
            Ok((size, stats))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistic::{mean_and_std_dev, Polarity, Tails};
    use glam::Vec3;

    struct Valued {
        name: String,
        position: Vec3,
        value: f64,
    }

    impl Gene for Valued {
        fn name(&self) -> &str {
            &self.name
        }

        fn position(&self) -> Vec3 {
            self.position
        }
    }

    struct Spread;

    impl SphereStatistic<Valued> for Spread {
        fn statistic(&self, genes: &[&Valued]) -> Result<f64, SphereTestError> {
            if genes.is_empty() {
                return Err(SphereTestError::EmptyGeneSet);
            }
            Ok(mean_and_std_dev(genes.iter().map(|g| g.value)).1)
        }

        fn polarity(&self) -> Polarity {
            Polarity::Less
        }
    }

    /// A line of genes along x with alternating values.
    fn line_population(n: usize) -> Population<Valued> {
        let genes = (0..n)
            .map(|i| Valued {
                name: format!("g{}", i),
                position: Vec3::new(i as f32, 0.0, 0.0),
                value: if i % 2 == 0 { 1.0 } else { -1.0 },
            })
            .collect();
        Population::new(genes).unwrap()
    }

    fn small_config() -> SphereTestConfig {
        SphereTestConfig {
            sphere_radius: 3.0,
            box_min: 0.0,
            box_max: 20.0,
            minimum_gene_count: 2,
            sample_count: 40,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_work_units_respects_minimum() {
        let population = line_population(21);
        let config = small_config();
        let (units, report) = create_work_units(&population, &Spread, &config).unwrap();

        assert_eq!(units.len(), 40);
        assert!(units.iter().all(|u| u.len() >= 2));
        assert_eq!(report.attempts, report.rejected + 40);
        assert!(report.average_genes_in_sphere >= 2.0);
    }

    #[test]
    fn test_sampling_exhausted_when_minimum_unreachable() {
        let population = line_population(5);
        let config = SphereTestConfig {
            minimum_gene_count: 6,
            max_sampling_attempts: Some(500),
            ..small_config()
        };
        let result = create_work_units(&population, &Spread, &config);
        assert_eq!(
            result.err(),
            Some(SphereTestError::SamplingExhausted {
                accepted: 0,
                target: 40,
                attempts: 500,
            })
        );
    }

    #[test]
    fn test_p_value_is_floored() {
        // No draw is ever more extreme, so the raw value would be exactly 0.
        struct Never;
        impl SphereStatistic<Valued> for Never {
            fn statistic(&self, genes: &[&Valued]) -> Result<f64, SphereTestError> {
                Spread.statistic(genes)
            }
            fn polarity(&self) -> Polarity {
                Polarity::Less
            }
            fn is_more_extreme(&self, _random: f64, _observed: f64) -> bool {
                false
            }
        }

        let population = line_population(10);
        let mut unit = WorkUnit::new(vec![0, 1, 2], RandomSampler::new(10, 1).unwrap());
        unit.calculate_p_value(&population, &Never, 250, ControlSampling::Uniform)
            .unwrap();
        assert_eq!(unit.extreme_count, 0);
        assert_eq!(unit.p_value, 1.0 / 250.0);
    }

    #[test]
    fn test_two_tailed_p_value_used() {
        struct TwoTailed;
        impl SphereStatistic<Valued> for TwoTailed {
            fn statistic(&self, genes: &[&Valued]) -> Result<f64, SphereTestError> {
                Spread.statistic(genes)
            }
            fn polarity(&self) -> Polarity {
                Polarity::Less
            }
            fn tails(&self) -> Tails {
                Tails::Two
            }
        }

        let population = line_population(10);
        let mut unit = WorkUnit::new(vec![0, 1], RandomSampler::new(10, 1).unwrap());
        unit.score_against_null(&population, &TwoTailed, &[0.0, 0.5, 2.0, 3.0])
            .unwrap();
        // observed spread of {1, -1} is 1.0; two of four draws are <= 1.0
        assert_eq!(unit.observed_statistic, 1.0);
        assert_eq!(unit.extreme_count, 2);
        assert_eq!(unit.p_value, 1.0);
        assert_eq!(unit.random_statistic, 3.0);
    }

    #[test]
    fn test_parallel_results_are_reproducible() {
        let population = line_population(21);
        let config = SphereTestConfig {
            random_sample_count: Some(200),
            ..small_config()
        };

        let run = || {
            let (mut units, _) = create_work_units(&population, &Spread, &config).unwrap();
            calculate_p_values(&mut units, &population, &Spread, &config).unwrap();
            units
                .iter()
                .map(|u| (u.extreme_count, u.p_value))
                .collect::<Vec<_>>()
        };

        let first = run();
        assert_eq!(first, run());
        assert!(first.iter().all(|&(_, p)| p >= 1.0 / 200.0 && p <= 1.0));
    }

    #[test]
    fn test_shared_null_covers_every_size() {
        let population = line_population(21);
        let config = SphereTestConfig {
            random_sample_count: Some(50),
            null_model: NullModel::SharedBySize,
            ..small_config()
        };
        let (mut units, _) = create_work_units(&population, &Spread, &config).unwrap();
        calculate_p_values(&mut units, &population, &Spread, &config).unwrap();

        for unit in &units {
            assert!(unit.extreme_count <= 50);
            assert!(unit.p_value >= 1.0 / 50.0);
        }

        let sizes: BTreeSet<usize> = units.iter().map(WorkUnit::len).collect();
        let nulls = null_distributions(&population, &Spread, &config, &sizes).unwrap();
        assert_eq!(nulls.len(), sizes.len());
        assert!(nulls.values().all(|v| v.len() == 50));
    }

    #[test]
    fn test_genome_window_control_fails_cleanly_when_too_large() {
        let population = line_population(4);
        let mut unit = WorkUnit::new(vec![0, 1, 2, 3], RandomSampler::new(3, 1).unwrap());
        let result =
            unit.calculate_p_value(&population, &Spread, 10, ControlSampling::GenomeWindow);
        assert_eq!(
            result,
            Err(SphereTestError::WindowTooLarge { window: 4, pool: 3 })
        );
    }
}
