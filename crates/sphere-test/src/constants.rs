//! Default parameters for sphere tests.

/// Radius of the sampling sphere, in genome-model units.
pub const DEFAULT_SPHERE_RADIUS: f32 = 10.0;

/// Spheres holding fewer genes than this are rejected as mostly empty space.
pub const DEFAULT_MINIMUM_GENE_COUNT: usize = 20;

// Bounding box for sphere centers (same range on every axis).

/// Lower corner coordinate of the center box.
pub const DEFAULT_BOX_MIN: f32 = 0.0;

/// Upper corner coordinate of the center box.
pub const DEFAULT_BOX_MAX: f32 = 210.0;

/// Number of accepted spheres, and by convention the number of random
/// comparison sets drawn per sphere. Work is quadratic in this.
pub const DEFAULT_SAMPLE_COUNT: usize = 20_000;

/// Spheres with an adjusted p-value above this are not clustered.
pub const DEFAULT_P_ADJ_THRESHOLD: f64 = 0.05;

/// Clusters whose overlap ratio falls below this are considered distinct.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.05;

/// Sampling attempt budget per requested sphere.
pub const DEFAULT_ATTEMPTS_PER_SAMPLE: usize = 1_000;

/// Lower bound on the total sampling attempt budget.
pub const MIN_SAMPLING_ATTEMPTS: usize = 10_000;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 12345;
