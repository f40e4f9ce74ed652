//! Sphere test configuration.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::SphereTestError;

/// How random comparison statistics are produced for each work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullModel {
    /// Every work unit draws its own comparison sets.
    #[default]
    PerWorkUnit,
    /// One null distribution per distinct sphere size, shared by all work
    /// units of that size.
    SharedBySize,
}

/// How a size-matched random comparison set is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSampling {
    /// Uniform draws with replacement from the whole population.
    #[default]
    Uniform,
    /// A contiguous run of genes in population (genome) order.
    GenomeWindow,
}

/// Parameters of one sphere test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereTestConfig {
    /// Radius of each sampling sphere.
    pub sphere_radius: f32,
    /// Minimum coordinate of the cube sphere centers are drawn from.
    pub box_min: f32,
    /// Maximum coordinate of the cube sphere centers are drawn from.
    pub box_max: f32,
    /// Spheres with fewer genes are rejected.
    pub minimum_gene_count: usize,
    /// Number of spheres to accept.
    pub sample_count: usize,
    /// Random comparison sets per sphere. Defaults to `sample_count`.
    pub random_sample_count: Option<usize>,
    /// Significance cutoff on the adjusted p-value.
    pub p_adj_threshold: f64,
    /// Minimum overlap ratio at which clusters keep merging.
    pub overlap_threshold: f64,
    /// Total sphere draws allowed before giving up. Defaults to a multiple of
    /// `sample_count`.
    pub max_sampling_attempts: Option<usize>,
    /// Master seed; sphere centers and every work unit's generator derive from it.
    pub seed: u64,
    pub null_model: NullModel,
    pub control: ControlSampling,
}

impl Default for SphereTestConfig {
    fn default() -> Self {
        Self {
            sphere_radius: DEFAULT_SPHERE_RADIUS,
            box_min: DEFAULT_BOX_MIN,
            box_max: DEFAULT_BOX_MAX,
            minimum_gene_count: DEFAULT_MINIMUM_GENE_COUNT,
            sample_count: DEFAULT_SAMPLE_COUNT,
            random_sample_count: None,
            p_adj_threshold: DEFAULT_P_ADJ_THRESHOLD,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            max_sampling_attempts: None,
            seed: DEFAULT_SEED,
            null_model: NullModel::default(),
            control: ControlSampling::default(),
        }
    }
}

impl SphereTestConfig {
    /// Number of random comparison sets drawn per sphere.
    pub fn random_samples(&self) -> usize {
        self.random_sample_count.unwrap_or(self.sample_count)
    }

    /// Attempt budget for the rejection-sampling loop.
    pub fn sampling_attempts(&self) -> usize {
        self.max_sampling_attempts.unwrap_or_else(|| {
            self.sample_count
                .saturating_mul(DEFAULT_ATTEMPTS_PER_SAMPLE)
                .max(MIN_SAMPLING_ATTEMPTS)
        })
    }

    /// Check that every option is in range.
    pub fn validate(&self) -> Result<(), SphereTestError> {
        let invalid = |msg: String| -> Result<(), SphereTestError> {
            Err(SphereTestError::InvalidConfig(msg))
        };

        if !(self.sphere_radius.is_finite() && self.sphere_radius > 0.0) {
            return invalid(format!(
                "sphere radius must be positive, got {}",
                self.sphere_radius
            ));
        }
        if !(self.box_min.is_finite() && self.box_max.is_finite()) || self.box_min > self.box_max {
            return invalid(format!(
                "center box [{}, {}] is not a valid range",
                self.box_min, self.box_max
            ));
        }
        if self.minimum_gene_count == 0 {
            return invalid("minimum gene count must be at least 1".into());
        }
        if self.sample_count == 0 {
            return invalid("sample count must be at least 1".into());
        }
        if self.random_samples() == 0 {
            return invalid("random sample count must be at least 1".into());
        }
        if self.sampling_attempts() == 0 {
            return invalid("sampling attempt budget must be at least 1".into());
        }
        if !(self.p_adj_threshold > 0.0 && self.p_adj_threshold <= 1.0) {
            return invalid(format!(
                "adjusted p-value threshold must be in (0, 1], got {}",
                self.p_adj_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return invalid(format!(
                "overlap threshold must be in [0, 1], got {}",
                self.overlap_threshold
            ));
        }
        Ok(())
    }
}
