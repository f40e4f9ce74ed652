//! Sphere and random gene samplers.
//!
//! Both samplers hand out gene indices into a [`Population`]; resolving them
//! to genes is left to the caller so work units stay free of borrows.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ControlSampling;
use crate::error::SphereTestError;
use crate::types::{Gene, Population};

/// Draws spheres with uniformly random centers inside an axis-aligned cube.
pub struct SphereSampler<'a, G> {
    population: &'a Population<G>,
    box_min: f32,
    box_max: f32,
    rng: ChaCha8Rng,
}

impl<'a, G: Gene> SphereSampler<'a, G> {
    /// Create a sampler over `population` drawing centers in `[box_min, box_max]^3`.
    pub fn new(
        population: &'a Population<G>,
        box_min: f32,
        box_max: f32,
        seed: u64,
    ) -> Result<Self, SphereTestError> {
        if population.is_empty() {
            return Err(SphereTestError::EmptyPool);
        }
        if !(box_min.is_finite() && box_max.is_finite()) || box_min > box_max {
            return Err(SphereTestError::InvalidConfig(format!(
                "center box [{}, {}] is not a valid range",
                box_min, box_max
            )));
        }
        Ok(Self {
            population,
            box_min,
            box_max,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Pick a center; each axis is drawn independently and uniformly.
    pub fn random_center(&mut self) -> Vec3 {
        let range = self.box_min..=self.box_max;
        Vec3::new(
            self.rng.gen_range(range.clone()),
            self.rng.gen_range(range.clone()),
            self.rng.gen_range(range),
        )
    }

    /// Genes inside a sphere of `radius` around a random center. May be empty.
    pub fn sample(&mut self, radius: f32) -> Vec<usize> {
        let center = self.random_center();
        self.sample_at(center, radius)
    }

    /// Genes inside a sphere of `radius` around `center`, in population order.
    pub fn sample_at(&self, center: Vec3, radius: f32) -> Vec<usize> {
        self.population.within(center, radius)
    }
}

/// Draws size-matched random comparison sets.
///
/// Each instance owns its generator. Work units that run in parallel each
/// hold their own sampler; never share one across threads.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    pool_len: usize,
    rng: ChaCha8Rng,
}

impl RandomSampler {
    /// Create a sampler over a pool of `pool_len` genes.
    pub fn new(pool_len: usize, seed: u64) -> Result<Self, SphereTestError> {
        if pool_len == 0 {
            return Err(SphereTestError::EmptyPool);
        }
        Ok(Self {
            pool_len,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// `count` indices drawn independently and uniformly, with replacement.
    pub fn sample(&mut self, count: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(count);
        self.sample_into(count, &mut out);
        out
    }

    /// Like [`sample`](Self::sample), reusing `out`'s allocation.
    pub fn sample_into(&mut self, count: usize, out: &mut Vec<usize>) {
        out.clear();
        out.extend((0..count).map(|_| self.rng.gen_range(0..self.pool_len)));
    }

    /// A contiguous run of `count` indices starting at a uniformly random offset.
    pub fn sample_window_into(
        &mut self,
        count: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), SphereTestError> {
        if count > self.pool_len {
            return Err(SphereTestError::WindowTooLarge {
                window: count,
                pool: self.pool_len,
            });
        }
        let start = self.rng.gen_range(0..=self.pool_len - count);
        out.clear();
        out.extend(start..start + count);
        Ok(())
    }

    /// Draw one comparison set of `count` genes according to `control`.
    pub fn draw_into(
        &mut self,
        control: ControlSampling,
        count: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), SphereTestError> {
        match control {
            ControlSampling::Uniform => {
                self.sample_into(count, out);
                Ok(())
            }
            ControlSampling::GenomeWindow => self.sample_window_into(count, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point(String, Vec3);

    impl Gene for Point {
        fn name(&self) -> &str {
            &self.0
        }

        fn position(&self) -> Vec3 {
            self.1
        }
    }

    fn five_points() -> Population<Point> {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(9.0, 9.0, 9.0),
            Vec3::new(0.5, 0.5, 0.5),
        ];
        let genes = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| Point(format!("g{}", i), p))
            .collect();
        Population::new(genes).unwrap()
    }

    #[test]
    fn test_sphere_at_origin_selects_close_genes() {
        let population = five_points();
        let sampler = SphereSampler::new(&population, 0.0, 10.0, 1).unwrap();
        let inside = sampler.sample_at(Vec3::ZERO, 2.0);

        assert_eq!(inside, vec![0, 1, 4]);
        let positions: Vec<Vec3> = inside.iter().map(|&i| population.gene(i).1).collect();
        assert!(positions.contains(&Vec3::new(0.5, 0.5, 0.5)));
        assert!(!positions.contains(&Vec3::new(5.0, 5.0, 5.0)));
        assert!(!positions.contains(&Vec3::new(9.0, 9.0, 9.0)));
    }

    #[test]
    fn test_random_centers_stay_in_box() {
        let population = five_points();
        let mut sampler = SphereSampler::new(&population, -3.0, 4.0, 7).unwrap();
        for _ in 0..1000 {
            let c = sampler.random_center();
            for v in [c.x, c.y, c.z] {
                assert!((-3.0..=4.0).contains(&v), "center {:?} outside box", c);
            }
        }
    }

    #[test]
    fn test_inverted_box_rejected() {
        let population = five_points();
        let result = SphereSampler::new(&population, 4.0, -3.0, 7);
        assert!(matches!(result, Err(SphereTestError::InvalidConfig(_))));
    }

    #[test]
    fn test_random_sampler_draws_with_replacement() {
        let mut sampler = RandomSampler::new(3, 42).unwrap();
        let drawn = sampler.sample(300);
        assert_eq!(drawn.len(), 300);
        assert!(drawn.iter().all(|&i| i < 3));

        // 300 draws from 3 genes must repeat
        let mut distinct = drawn.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_random_sampler_is_reproducible_per_seed() {
        let a = RandomSampler::new(1000, 9).unwrap().sample(50);
        let b = RandomSampler::new(1000, 9).unwrap().sample(50);
        let c = RandomSampler::new(1000, 10).unwrap().sample(50);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            RandomSampler::new(0, 1),
            Err(SphereTestError::EmptyPool)
        ));
    }

    #[test]
    fn test_window_is_contiguous_and_bounded() {
        let mut sampler = RandomSampler::new(10, 3).unwrap();
        let mut out = Vec::new();
        for _ in 0..100 {
            sampler.sample_window_into(4, &mut out).unwrap();
            assert_eq!(out.len(), 4);
            assert!(out.windows(2).all(|w| w[1] == w[0] + 1));
            assert!(*out.last().unwrap() < 10);
        }

        sampler.sample_window_into(10, &mut out).unwrap();
        assert_eq!(out, (0..10).collect::<Vec<_>>());

        assert_eq!(
            sampler.sample_window_into(11, &mut out),
            Err(SphereTestError::WindowTooLarge { window: 11, pool: 10 })
        );
    }
}
