//! Genes and the population they are sampled from.

use std::fmt;

use glam::Vec3;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use rustc_hash::FxHashMap;

use crate::error::SphereTestError;

/// The common denominator of every gene shape: an identity and a 3D position.
///
/// Test-specific payloads (scalars, labels, bitsets, profiles) live on the
/// implementing type and are read only by the matching statistic.
pub trait Gene {
    /// Stable, unique name of the gene.
    fn name(&self) -> &str;

    /// Position in the 3D genome model.
    fn position(&self) -> Vec3;
}

/// An immutable, spatially indexed list of genes.
///
/// Order is meaningful: it is the genome order used by window sampling and
/// by acceptance predicates that look at index distances.
pub struct Population<G> {
    genes: Vec<G>,
    tree: ImmutableKdTree<f32, 3>,
    by_name: FxHashMap<String, usize>,
}

impl<G> fmt::Debug for Population<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("genes", &self.genes.len())
            .finish_non_exhaustive()
    }
}

impl<G: Gene> Population<G> {
    /// Build a population, rejecting an empty pool and duplicate names.
    pub fn new(genes: Vec<G>) -> Result<Self, SphereTestError> {
        if genes.is_empty() {
            return Err(SphereTestError::EmptyPool);
        }

        let mut by_name = FxHashMap::default();
        by_name.reserve(genes.len());
        for (i, gene) in genes.iter().enumerate() {
            if by_name.insert(gene.name().to_string(), i).is_some() {
                return Err(SphereTestError::DuplicateGene(gene.name().to_string()));
            }
        }

        let entries: Vec<[f32; 3]> = genes
            .iter()
            .map(|g| {
                let p = g.position();
                [p.x, p.y, p.z]
            })
            .collect();
        let tree = ImmutableKdTree::new_from_slice(&entries);

        Ok(Self {
            genes,
            tree,
            by_name,
        })
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Always false for a constructed population; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// All genes in population order.
    pub fn genes(&self) -> &[G] {
        &self.genes
    }

    /// Gene at `idx`.
    pub fn gene(&self, idx: usize) -> &G {
        &self.genes[idx]
    }

    /// Index of the gene called `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Resolve gene indices to references, preserving order and repeats.
    pub fn resolve(&self, indices: &[usize]) -> Vec<&G> {
        indices.iter().map(|&i| &self.genes[i]).collect()
    }

    /// References to every gene, in population order.
    pub fn all(&self) -> Vec<&G> {
        self.genes.iter().collect()
    }

    /// Indices of all genes whose Euclidean distance to `center` is at most
    /// `radius`, in ascending population order.
    pub fn within(&self, center: Vec3, radius: f32) -> Vec<usize> {
        // Slightly widened tree query, then the exact inclusive test.
        let query_dist = radius * radius * (1.0 + 1e-5) + f32::EPSILON;
        let mut result: Vec<usize> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&[center.x, center.y, center.z], query_dist)
            .into_iter()
            .map(|n| n.item as usize)
            .filter(|&i| self.genes[i].position().distance(center) <= radius)
            .collect();
        result.sort_unstable();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        name: String,
        position: Vec3,
    }

    impl Gene for Point {
        fn name(&self) -> &str {
            &self.name
        }

        fn position(&self) -> Vec3 {
            self.position
        }
    }

    fn point(name: &str, x: f32, y: f32, z: f32) -> Point {
        Point {
            name: name.to_string(),
            position: Vec3::new(x, y, z),
        }
    }

    #[test]
    fn test_empty_population_rejected() {
        let result = Population::<Point>::new(Vec::new());
        assert!(matches!(result, Err(SphereTestError::EmptyPool)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Population::new(vec![point("a", 0.0, 0.0, 0.0), point("a", 1.0, 0.0, 0.0)]);
        assert_eq!(result.err(), Some(SphereTestError::DuplicateGene("a".into())));
    }

    #[test]
    fn test_within_is_inclusive_and_ordered() {
        let population = Population::new(vec![
            point("far", 10.0, 0.0, 0.0),
            point("edge", 2.0, 0.0, 0.0),
            point("origin", 0.0, 0.0, 0.0),
        ])
        .unwrap();

        assert_eq!(population.within(Vec3::ZERO, 2.0), vec![1, 2]);
        assert_eq!(population.within(Vec3::ZERO, 1.999), vec![2]);
        assert_eq!(population.index_of("edge"), Some(1));
        assert_eq!(population.index_of("missing"), None);
    }
}
