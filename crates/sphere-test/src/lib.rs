//! Spatial permutation tests over genes placed in a 3D genome model.
//!
//! A sphere test asks whether a measurement taken inside random spherical
//! neighborhoods is more extreme than the same measurement over random gene
//! sets of equal size. Many spheres are sampled, each gets an empirical
//! p-value, p-values are Benjamini-Hochberg corrected, and the significant
//! spheres are merged by gene overlap into disjoint, letter-named fields.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use sphere_test::{
//!     Gene, Polarity, Population, SphereStatistic, SphereTestConfig, SphereTestError,
//! };
//!
//! struct Locus {
//!     name: String,
//!     position: Vec3,
//!     signal: f64,
//! }
//!
//! impl Gene for Locus {
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//!     fn position(&self) -> Vec3 {
//!         self.position
//!     }
//! }
//!
//! /// Mean signal; high is interesting.
//! struct MeanSignal;
//!
//! impl SphereStatistic<Locus> for MeanSignal {
//!     fn statistic(&self, genes: &[&Locus]) -> Result<f64, SphereTestError> {
//!         if genes.is_empty() {
//!             return Err(SphereTestError::EmptyGeneSet);
//!         }
//!         Ok(genes.iter().map(|g| g.signal).sum::<f64>() / genes.len() as f64)
//!     }
//!     fn polarity(&self) -> Polarity {
//!         Polarity::Greater
//!     }
//! }
//!
//! let genes = (0..200)
//!     .map(|i| Locus {
//!         name: format!("g{}", i),
//!         position: Vec3::new((i % 10) as f32, ((i / 10) % 10) as f32, (i / 100) as f32),
//!         signal: (i % 7) as f64,
//!     })
//!     .collect();
//! let population = Population::new(genes).expect("valid population");
//!
//! let config = SphereTestConfig {
//!     sphere_radius: 2.0,
//!     box_min: 0.0,
//!     box_max: 9.0,
//!     minimum_gene_count: 5,
//!     sample_count: 50,
//!     ..Default::default()
//! };
//! let output = sphere_test::run(&population, &MeanSignal, config).expect("run should succeed");
//! assert_eq!(output.work_units.len(), 50);
//! ```

mod benjamini;
mod cluster;
mod config;
mod constants;
mod error;
mod field;
mod sampler;
mod statistic;
mod types;
mod work_unit;

pub use benjamini::{adjust_p_values, benjamini_hochberg};
pub use cluster::{cluster_by_gene_overlap, overlap_ratio, ClusterOutcome, GeneSet};
pub use config::{ControlSampling, NullModel, SphereTestConfig};
pub use constants::*;
pub use error::SphereTestError;
pub use field::{
    field_name, field_overlaps, field_table, into_fields, Field, FieldOverlap, FieldTable,
};
pub use sampler::{RandomSampler, SphereSampler};
pub use statistic::{mean_and_std_dev, mean_pairwise, Polarity, SphereStatistic, Tails};
pub use types::{Gene, Population};
pub use work_unit::{
    calculate_p_values, create_work_units, null_distributions, stream_seed, SamplingReport,
    WorkUnit,
};

/// Output of a complete sphere test run.
#[derive(Debug, Clone)]
pub struct SphereTestOutput {
    /// Every accepted sphere, sorted by raw p-value and ranked.
    pub work_units: Vec<WorkUnit>,
    /// The disjoint fields built from significant spheres.
    pub fields: Vec<Field>,
    /// Diagnostic information about the run.
    pub diagnostics: SphereTestDiagnostics,
}

impl SphereTestOutput {
    /// Work units whose adjusted p-value is at most `threshold`.
    pub fn significant(&self, threshold: f64) -> impl Iterator<Item = &WorkUnit> {
        self.work_units
            .iter()
            .filter(move |u| u.adjusted_p_value <= threshold)
    }

    /// The work unit with the smallest raw p-value.
    pub fn best(&self) -> Option<&WorkUnit> {
        self.work_units.first()
    }
}

/// Counters describing how a run went.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphereTestDiagnostics {
    pub sampling: SamplingReport,
    /// Work units at or below the adjusted p-value threshold.
    pub significant_units: usize,
    /// Distinct genes covered by significant work units.
    pub significant_genes: usize,
    /// Clusters at the merge fixed point, before the disjointness cleanup.
    pub clusters_before_cleanup: usize,
    /// Highest overlap ratio left between clusters when merging stopped.
    pub max_overlap_ratio: f64,
    pub merges: usize,
}

/// A configured sphere test over one population and one statistic.
///
/// Phases run in order: [`sample`](Self::sample) (sequential rejection
/// sampling), [`test`](Self::test) (parallel across work units),
/// [`correct`](Self::correct) and [`cluster`](Self::cluster) (global, after
/// every unit is tested). [`run`](Self::run) chains them.
pub struct SphereTest<'a, G, S> {
    population: &'a Population<G>,
    statistic: &'a S,
    config: SphereTestConfig,
}

impl<'a, G, S> SphereTest<'a, G, S>
where
    G: Gene + Sync,
    S: SphereStatistic<G>,
{
    /// Validate `config` and bind it to a population and statistic.
    pub fn new(
        population: &'a Population<G>,
        statistic: &'a S,
        config: SphereTestConfig,
    ) -> Result<Self, SphereTestError> {
        config.validate()?;
        Ok(Self {
            population,
            statistic,
            config,
        })
    }

    pub fn config(&self) -> &SphereTestConfig {
        &self.config
    }

    pub fn population(&self) -> &Population<G> {
        self.population
    }

    pub fn statistic(&self) -> &S {
        self.statistic
    }

    /// Draw spheres until `sample_count` are accepted.
    pub fn sample(&self) -> Result<(Vec<WorkUnit>, SamplingReport), SphereTestError> {
        let (units, report) = create_work_units(self.population, self.statistic, &self.config)?;
        log::debug!(
            "Accepted {} spheres in {} attempts ({} rejected), {:.1} genes per sphere",
            units.len(),
            report.attempts,
            report.rejected,
            report.average_genes_in_sphere
        );
        Ok((units, report))
    }

    /// Observed statistics and raw p-values for every work unit.
    pub fn test(&self, units: &mut [WorkUnit]) -> Result<(), SphereTestError> {
        calculate_p_values(units, self.population, self.statistic, &self.config)
    }

    /// Sort, rank and Benjamini-Hochberg adjust.
    pub fn correct(&self, units: &mut [WorkUnit]) {
        benjamini_hochberg(units);
    }

    /// Merge the gene sets of significant work units into disjoint fields.
    pub fn cluster(&self, units: &[WorkUnit]) -> (Vec<Field>, ClusterOutcome) {
        let gene_sets: Vec<GeneSet> = units
            .iter()
            .filter(|u| u.adjusted_p_value <= self.config.p_adj_threshold)
            .map(|u| u.genes.iter().copied().collect())
            .collect();
        let outcome = cluster_by_gene_overlap(gene_sets, self.config.overlap_threshold);
        let fields = into_fields(outcome.clusters.clone());
        log::debug!(
            "Clustering stopped with {} clusters after {} merges, max overlap {:.2}%",
            outcome.clusters.len(),
            outcome.merges,
            outcome.max_overlap_ratio * 100.0
        );
        (fields, outcome)
    }

    /// Bundle the results of the phases with their diagnostics.
    pub fn assemble(
        &self,
        work_units: Vec<WorkUnit>,
        sampling: SamplingReport,
        fields: Vec<Field>,
        outcome: &ClusterOutcome,
    ) -> SphereTestOutput {
        let significant: Vec<&WorkUnit> = work_units
            .iter()
            .filter(|u| u.adjusted_p_value <= self.config.p_adj_threshold)
            .collect();
        let significant_genes = significant
            .iter()
            .flat_map(|u| u.genes.iter().copied())
            .collect::<GeneSet>()
            .len();

        let diagnostics = SphereTestDiagnostics {
            sampling,
            significant_units: significant.len(),
            significant_genes,
            clusters_before_cleanup: outcome.clusters.len(),
            max_overlap_ratio: outcome.max_overlap_ratio,
            merges: outcome.merges,
        };

        SphereTestOutput {
            work_units,
            fields,
            diagnostics,
        }
    }

    /// Sample, test, correct and cluster.
    pub fn run(&self) -> Result<SphereTestOutput, SphereTestError> {
        let (mut work_units, sampling) = self.sample()?;
        self.test(&mut work_units)?;
        self.correct(&mut work_units);
        let (fields, outcome) = self.cluster(&work_units);
        Ok(self.assemble(work_units, sampling, fields, &outcome))
    }
}

/// Run a complete sphere test.
pub fn run<G, S>(
    population: &Population<G>,
    statistic: &S,
    config: SphereTestConfig,
) -> Result<SphereTestOutput, SphereTestError>
where
    G: Gene + Sync,
    S: SphereStatistic<G>,
{
    SphereTest::new(population, statistic, config)?.run()
}
