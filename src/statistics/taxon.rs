//! Taxon enrichment: how far the taxon mix inside a sphere departs from the
//! genome-wide mix.

use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use sphere_test::{Gene, Polarity, SphereStatistic, SphereTestError};

/// A gene labelled with the taxon it first appeared in.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonGene {
    pub name: String,
    pub position: Vec3,
    pub taxon: Arc<str>,
}

impl Gene for TaxonGene {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Background frequency of each taxon over the whole population.
#[derive(Debug, Clone, Default)]
pub struct TaxonFrequencies {
    frequencies: FxHashMap<Arc<str>, f64>,
}

impl TaxonFrequencies {
    pub fn from_genes<'a>(genes: impl IntoIterator<Item = &'a TaxonGene>) -> Self {
        let mut counts: FxHashMap<Arc<str>, usize> = FxHashMap::default();
        let mut total = 0usize;
        for gene in genes {
            *counts.entry(gene.taxon.clone()).or_default() += 1;
            total += 1;
        }
        let frequencies = counts
            .into_iter()
            .map(|(taxon, n)| (taxon, n as f64 / total as f64))
            .collect();
        Self { frequencies }
    }

    pub fn get(&self, taxon: &str) -> Option<f64> {
        self.frequencies.get(taxon).copied()
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Taxa with their frequencies, sorted by name.
    pub fn sorted(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self
            .frequencies
            .iter()
            .map(|(t, &f)| (t.as_ref(), f))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Maximum absolute log enrichment of any taxon present in the gene set.
#[derive(Debug, Clone)]
pub struct TaxonEnrichment {
    background: TaxonFrequencies,
}

impl TaxonEnrichment {
    pub fn new(background: TaxonFrequencies) -> Self {
        Self { background }
    }

    pub fn background(&self) -> &TaxonFrequencies {
        &self.background
    }
}

impl SphereStatistic<TaxonGene> for TaxonEnrichment {
    fn description(&self) -> &str {
        "Maximum taxon absolute log enrichment"
    }

    fn statistic(&self, genes: &[&TaxonGene]) -> Result<f64, SphereTestError> {
        if genes.is_empty() {
            return Err(SphereTestError::EmptyGeneSet);
        }
        if genes.len() == 1 {
            return Ok(0.0);
        }

        let mut in_group: FxHashMap<&str, usize> = FxHashMap::default();
        for gene in genes {
            *in_group.entry(gene.taxon.as_ref()).or_default() += 1;
        }

        let n = genes.len() as f64;
        let mut best = 0.0f64;
        for (taxon, count) in in_group {
            let background = self
                .background
                .get(taxon)
                .filter(|&f| f > 0.0)
                .ok_or_else(|| {
                    SphereTestError::InvalidInput(format!(
                        "taxon '{}' has no background frequency",
                        taxon
                    ))
                })?;
            let enrichment = (count as f64 / n) / background;
            best = best.max(enrichment.ln().abs());
        }
        Ok(best)
    }

    fn polarity(&self) -> Polarity {
        Polarity::Greater
    }
}
