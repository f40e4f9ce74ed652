//! The test-statistic contract.

use serde::{Deserialize, Serialize};

use crate::error::SphereTestError;

/// Which direction of a random statistic counts as "at least as extreme".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Random draws at or above the observed value are more extreme.
    Greater,
    /// Random draws at or below the observed value are more extreme.
    Less,
}

impl Polarity {
    pub fn is_more_extreme(self, random: f64, observed: f64) -> bool {
        match self {
            Polarity::Greater => random >= observed,
            Polarity::Less => random <= observed,
        }
    }
}

/// One- or two-tailed conversion of an extreme count into a p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tails {
    #[default]
    One,
    /// `2 * min(p, 1 - p)` of the one-tailed value.
    Two,
}

impl Tails {
    pub fn p_value(self, extreme_count: usize, total_samples: usize) -> f64 {
        let p = extreme_count as f64 / total_samples as f64;
        match self {
            Tails::One => p,
            Tails::Two => 2.0 * p.min(1.0 - p),
        }
    }
}

/// A pluggable statistic over a set of genes of type `G`.
///
/// Implementations carry any context they need (background frequencies,
/// feature widths) from construction; the engine only calls these methods.
/// `Sync` is required because work units are tested in parallel.
pub trait SphereStatistic<G>: Sync {
    /// Human-readable summary of what is measured, for logs.
    fn description(&self) -> &str {
        "sphere test statistic"
    }

    /// Summarize `genes`. Must fail with [`SphereTestError::EmptyGeneSet`]
    /// when `genes` is empty. Repeated genes (draws with replacement) count
    /// once per occurrence.
    fn statistic(&self, genes: &[&G]) -> Result<f64, SphereTestError>;

    /// Polarity of this test.
    fn polarity(&self) -> Polarity;

    /// Tailedness of this test.
    fn tails(&self) -> Tails {
        Tails::One
    }

    /// Is a random statistic at least as extreme as the observed one?
    fn is_more_extreme(&self, random: f64, observed: f64) -> bool {
        self.polarity().is_more_extreme(random, observed)
    }

    /// Raw p-value from the count of more-extreme random draws.
    fn p_value(&self, extreme_count: usize, total_samples: usize) -> f64 {
        self.tails().p_value(extreme_count, total_samples)
    }

    /// Extra acceptance predicate for sphere samples, applied after the
    /// minimum gene count.
    fn accept_sample(&self, _genes: &[&G]) -> bool {
        true
    }
}

/// Mean and population standard deviation of `values`.
pub fn mean_and_std_dev(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let (sum, n) = values.clone().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}

/// Average of `distance` over all unordered pairs of `genes`; 0 for a single gene.
pub fn mean_pairwise<G, F>(genes: &[&G], mut distance: F) -> Result<f64, SphereTestError>
where
    F: FnMut(&G, &G) -> Result<f64, SphereTestError>,
{
    if genes.is_empty() {
        return Err(SphereTestError::EmptyGeneSet);
    }
    let n = genes.len();
    if n == 1 {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += distance(genes[i], genes[j])?;
        }
    }
    let pairs = n * (n - 1) / 2;
    Ok(total / pairs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity() {
        assert!(Polarity::Greater.is_more_extreme(2.0, 1.0));
        assert!(Polarity::Greater.is_more_extreme(1.0, 1.0));
        assert!(!Polarity::Greater.is_more_extreme(0.5, 1.0));
        assert!(Polarity::Less.is_more_extreme(0.5, 1.0));
        assert!(Polarity::Less.is_more_extreme(1.0, 1.0));
        assert!(!Polarity::Less.is_more_extreme(2.0, 1.0));
    }

    #[test]
    fn test_tails() {
        assert_eq!(Tails::One.p_value(5, 100), 0.05);
        assert!((Tails::Two.p_value(5, 100) - 0.1).abs() < 1e-12);
        assert!((Tails::Two.p_value(95, 100) - 0.1).abs() < 1e-12);
        assert_eq!(Tails::Two.p_value(50, 100), 1.0);
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (mean, sd) = mean_and_std_dev(values.iter().copied());
        assert_eq!(mean, 5.0);
        assert_eq!(sd, 2.0);
    }

    #[test]
    fn test_mean_pairwise() {
        let values = [0.0f64, 1.0, 3.0];
        let refs: Vec<&f64> = values.iter().collect();
        // pairs: 1, 3, 2
        let mean = mean_pairwise(&refs, |a, b| Ok((a - b).abs())).unwrap();
        assert_eq!(mean, 2.0);

        let single = mean_pairwise(&refs[..1], |a, b| Ok((a - b).abs())).unwrap();
        assert_eq!(single, 0.0);

        let empty: Vec<&f64> = Vec::new();
        assert_eq!(
            mean_pairwise(&empty, |a, b| Ok((a - b).abs())),
            Err(SphereTestError::EmptyGeneSet)
        );
    }
}
