//! Spread of one scalar measurement per gene.
//!
//! Used by the conservation test (species count per gene, low spread is
//! interesting) and the replication-timing test (timing value per gene, high
//! spread is interesting, and spheres must span distant genome positions).

use glam::Vec3;
use sphere_test::{mean_and_std_dev, Gene, Polarity, SphereStatistic, SphereTestError, Tails};

/// Smallest gap in genome order a replication-timing sphere must contain.
pub const REPLICATION_MIN_ORDER_GAP: usize = 100;

/// A gene carrying one numeric value and its position in genome order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarGene {
    pub name: String,
    pub position: Vec3,
    pub value: f64,
    /// Index of the gene along the linear genome.
    pub order: usize,
}

impl Gene for ScalarGene {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Population standard deviation of [`ScalarGene::value`].
#[derive(Debug, Clone)]
pub struct ScalarSpread {
    description: &'static str,
    polarity: Polarity,
    tails: Tails,
    minimum_order_gap: Option<usize>,
}

impl ScalarSpread {
    pub fn new(description: &'static str, polarity: Polarity, tails: Tails) -> Self {
        Self {
            description,
            polarity,
            tails,
            minimum_order_gap: None,
        }
    }

    /// Species-count spread; spheres of similarly conserved genes stand out.
    pub fn conservation() -> Self {
        Self::new(
            "Standard deviation in number of species having a gene",
            Polarity::Less,
            Tails::One,
        )
    }

    /// Replication-timing spread over spheres that join distant genome loci.
    pub fn replication_timing() -> Self {
        Self::new(
            "Standard deviation of replication timing",
            Polarity::Greater,
            Tails::One,
        )
        .with_minimum_order_gap(REPLICATION_MIN_ORDER_GAP)
    }

    /// Only accept spheres where some two genes, adjacent in genome order
    /// among the sphere's genes, are at least `gap` positions apart.
    pub fn with_minimum_order_gap(mut self, gap: usize) -> Self {
        self.minimum_order_gap = Some(gap);
        self
    }

    pub fn minimum_order_gap(&self) -> Option<usize> {
        self.minimum_order_gap
    }
}

impl SphereStatistic<ScalarGene> for ScalarSpread {
    fn description(&self) -> &str {
        self.description
    }

    fn statistic(&self, genes: &[&ScalarGene]) -> Result<f64, SphereTestError> {
        if genes.is_empty() {
            return Err(SphereTestError::EmptyGeneSet);
        }
        Ok(mean_and_std_dev(genes.iter().map(|g| g.value)).1)
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn tails(&self) -> Tails {
        self.tails
    }

    fn accept_sample(&self, genes: &[&ScalarGene]) -> bool {
        let Some(gap) = self.minimum_order_gap else {
            return true;
        };
        let mut order: Vec<usize> = genes.iter().map(|g| g.order).collect();
        order.sort_unstable();
        order.windows(2).any(|w| w[1] - w[0] >= gap)
    }
}
