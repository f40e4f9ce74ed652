//! Synthetic gene populations for demos and tests.
//!
//! Genes are placed uniformly in the sampling box. Payloads are drawn from
//! broad distributions, except inside an optional planted sphere where they
//! are drawn so that the matching statistic becomes extreme there.

use std::sync::Arc;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use sphere_test::{Gene, Population, SphereTestConfig};

use crate::error::Result;
use crate::statistics::{MotifGene, MotifSet, ProfileGene, ScalarGene, TaxonGene};

/// Taxa used for synthetic genes, oldest first. The last one is reserved
/// for planted genes.
pub const SYNTHETIC_TAXA: [&str; 6] = [
    "Eukaryota",
    "Metazoa",
    "Chordata",
    "Vertebrata",
    "Mammalia",
    "Primates",
];

/// A region whose genes get a coherent payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantedSphere {
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub gene_count: usize,
    pub box_min: f32,
    pub box_max: f32,
    /// Payload width for motif and profile genes.
    pub payload_width: usize,
    pub planted: Option<PlantedSphere>,
    pub seed: u64,
}

impl SyntheticConfig {
    /// Genes in the test's sampling box with a sphere planted at its center,
    /// half again as wide as the test spheres.
    pub fn for_test(gene_count: usize, config: &SphereTestConfig) -> Self {
        let center = (config.box_min + config.box_max) / 2.0;
        Self {
            gene_count,
            box_min: config.box_min,
            box_max: config.box_max,
            payload_width: 16,
            planted: Some(PlantedSphere {
                center: Vec3::splat(center),
                radius: config.sphere_radius * 1.5,
            }),
            seed: config.seed,
        }
    }
}

/// A gene type with a synthetic payload generator.
pub trait Synthesize: Gene + Sized {
    fn synthesize<R: Rng>(
        name: String,
        position: Vec3,
        order: usize,
        planted: bool,
        width: usize,
        rng: &mut R,
    ) -> Self;
}

impl Synthesize for ScalarGene {
    /// Background values spread widely; planted values are tightly bunched.
    fn synthesize<R: Rng>(
        name: String,
        position: Vec3,
        order: usize,
        planted: bool,
        _width: usize,
        rng: &mut R,
    ) -> Self {
        let (mean, std_dev) = if planted { (30.0, 0.5) } else { (30.0, 10.0) };
        let value = sample_normal(mean, std_dev, rng);
        ScalarGene {
            name,
            position,
            value,
            order,
        }
    }
}

impl Synthesize for TaxonGene {
    fn synthesize<R: Rng>(
        name: String,
        position: Vec3,
        _order: usize,
        planted: bool,
        _width: usize,
        rng: &mut R,
    ) -> Self {
        let taxon = if planted {
            SYNTHETIC_TAXA[SYNTHETIC_TAXA.len() - 1]
        } else {
            SYNTHETIC_TAXA[rng.gen_range(0..SYNTHETIC_TAXA.len() - 1)]
        };
        TaxonGene {
            name,
            position,
            taxon: Arc::from(taxon),
        }
    }
}

impl Synthesize for MotifGene {
    /// Background motifs are sparse and independent; planted genes share the
    /// first half of the motif space.
    fn synthesize<R: Rng>(
        name: String,
        position: Vec3,
        _order: usize,
        planted: bool,
        width: usize,
        rng: &mut R,
    ) -> Self {
        let mut motifs = MotifSet::new(width);
        for i in 0..width {
            let hit = if planted {
                i < width / 2
            } else {
                rng.gen_bool(0.2)
            };
            if hit {
                motifs.insert(i);
            }
        }
        MotifGene {
            name,
            position,
            motifs,
        }
    }
}

impl Synthesize for ProfileGene {
    fn synthesize<R: Rng>(
        name: String,
        position: Vec3,
        _order: usize,
        planted: bool,
        width: usize,
        rng: &mut R,
    ) -> Self {
        let std_dev = if planted { 0.1 } else { 2.0 };
        let features = (0..width).map(|_| sample_normal(0.0, std_dev, rng)).collect();
        ProfileGene {
            name,
            position,
            features,
        }
    }
}

fn sample_normal<R: Rng>(mean: f64, std_dev: f64, rng: &mut R) -> f64 {
    Normal::new(mean, std_dev).map_or(mean, |n| n.sample(rng))
}

/// Generate a population of `G` according to `config`.
pub fn generate<G: Synthesize>(config: &SyntheticConfig) -> Result<Population<G>> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut planted_count = 0usize;

    let genes: Vec<G> = (0..config.gene_count)
        .map(|i| {
            let position = Vec3::new(
                rng.gen_range(config.box_min..=config.box_max),
                rng.gen_range(config.box_min..=config.box_max),
                rng.gen_range(config.box_min..=config.box_max),
            );
            let planted = config
                .planted
                .is_some_and(|p| position.distance(p.center) <= p.radius);
            planted_count += planted as usize;
            G::synthesize(
                format!("SYN{:06}", i),
                position,
                i,
                planted,
                config.payload_width,
                &mut rng,
            )
        })
        .collect();

    log::info!(
        "Generated {} synthetic genes ({} planted)",
        genes.len(),
        planted_count
    );
    Ok(Population::new(genes)?)
}
