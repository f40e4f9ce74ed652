//! Distance between per-gene feature profiles (promoter histone marks).

use glam::Vec3;
use sphere_test::{mean_pairwise, Gene, Polarity, SphereStatistic, SphereTestError};

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileGene {
    pub name: String,
    pub position: Vec3,
    pub features: Vec<f64>,
}

impl Gene for ProfileGene {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Euclidean distance between two profiles of equal width.
pub fn profile_distance(a: &[f64], b: &[f64]) -> Result<f64, SphereTestError> {
    if a.len() != b.len() {
        return Err(SphereTestError::size_mismatch("feature profile", a.len(), b.len()));
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}

/// Mean pairwise profile distance; tight clusters in feature space stand out.
#[derive(Debug, Clone, Default)]
pub struct ProfileDistance;

impl SphereStatistic<ProfileGene> for ProfileDistance {
    fn description(&self) -> &str {
        "Average histone-space distance"
    }

    fn statistic(&self, genes: &[&ProfileGene]) -> Result<f64, SphereTestError> {
        mean_pairwise(genes, |a, b| profile_distance(&a.features, &b.features))
    }

    fn polarity(&self) -> Polarity {
        Polarity::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene(features: &[f64]) -> ProfileGene {
        ProfileGene {
            name: "g".into(),
            position: Vec3::ZERO,
            features: features.to_vec(),
        }
    }

    #[test]
    fn test_mean_pairwise_distance() {
        let genes = [gene(&[0.0, 0.0]), gene(&[3.0, 4.0]), gene(&[0.0, 0.0])];
        let refs: Vec<&ProfileGene> = genes.iter().collect();
        // Pairs: 5, 0, 5
        let d = ProfileDistance.statistic(&refs).unwrap();
        assert!((d - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(ProfileDistance.statistic(&refs[..1]).unwrap(), 0.0);
    }

    #[test]
    fn test_width_mismatch_and_empty() {
        let genes = [gene(&[1.0, 2.0]), gene(&[1.0])];
        let refs: Vec<&ProfileGene> = genes.iter().collect();
        assert_eq!(
            ProfileDistance.statistic(&refs),
            Err(SphereTestError::size_mismatch("feature profile", 2, 1))
        );
        assert_eq!(ProfileDistance.statistic(&[]), Err(SphereTestError::EmptyGeneSet));
        assert_eq!(ProfileDistance.polarity(), Polarity::Less);
    }
}
