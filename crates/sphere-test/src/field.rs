//! Fields: the final, disjoint, letter-named gene groups.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::cluster::GeneSet;
use crate::error::SphereTestError;
use crate::statistic::SphereStatistic;
use crate::types::{Gene, Population};

/// A named group of genes. No gene belongs to more than one field of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    /// Gene indices, ascending.
    pub genes: Vec<usize>,
}

impl Field {
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Names of this field's genes, in population order.
    pub fn gene_names<'a, G: Gene>(
        &'a self,
        population: &'a Population<G>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.genes.iter().map(move |&i| population.gene(i).name())
    }

    /// The test statistic over this field's genes.
    pub fn statistic<G, S>(
        &self,
        population: &Population<G>,
        statistic: &S,
    ) -> Result<f64, SphereTestError>
    where
        G: Gene,
        S: SphereStatistic<G> + ?Sized,
    {
        statistic.statistic(&population.resolve(&self.genes))
    }
}

/// Name for the field at `index`: `A`..`Z`, then `AA`, `AB`, ... (bijective base 26).
pub fn field_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Turn overlapping clusters into a partition.
///
/// Clusters are ordered by ascending size (stable, so equal sizes keep their
/// order); each cluster loses the genes already claimed by a smaller one.
/// Clusters left empty are dropped; the rest are named in that order.
pub fn into_fields(mut clusters: Vec<GeneSet>) -> Vec<Field> {
    clusters.sort_by_key(|c| c.len());

    let mut claimed = FxHashSet::default();
    let mut fields = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let genes: Vec<usize> = cluster.into_iter().filter(|&g| claimed.insert(g)).collect();
        if genes.is_empty() {
            continue;
        }
        fields.push(Field {
            name: field_name(fields.len()),
            genes,
        });
    }
    fields
}

/// Field name → gene names, the persisted form of a partition.
pub type FieldTable = BTreeMap<String, BTreeSet<String>>;

/// Build the `(Field, Gene)` table of a run.
pub fn field_table<G: Gene>(fields: &[Field], population: &Population<G>) -> FieldTable {
    fields
        .iter()
        .map(|f| {
            let names = f.gene_names(population).map(str::to_string).collect();
            (f.name.clone(), names)
        })
        .collect()
}

/// How strongly a field of one partition overlaps a field of another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOverlap {
    pub field_a: String,
    pub field_b: String,
    /// Genes present in both fields.
    pub common: usize,
    /// `common / max(|a|, |b|)`.
    pub overlap_min: f64,
    /// `common / min(|a|, |b|)`.
    pub overlap_max: f64,
}

/// Compare every field of `a` against every field of `b`, keeping pairs whose
/// `overlap_max` is at least `min_overlap`.
pub fn field_overlaps(a: &FieldTable, b: &FieldTable, min_overlap: f64) -> Vec<FieldOverlap> {
    let mut result = Vec::new();
    for (name_a, genes_a) in a {
        for (name_b, genes_b) in b {
            let smaller = genes_a.len().min(genes_b.len());
            if smaller == 0 {
                continue;
            }
            let larger = genes_a.len().max(genes_b.len());
            let common = genes_a.intersection(genes_b).count();
            let overlap_max = common as f64 / smaller as f64;
            if overlap_max < min_overlap {
                continue;
            }
            result.push(FieldOverlap {
                field_a: name_a.clone(),
                field_b: name_b.clone(),
                common,
                overlap_min: common as f64 / larger as f64,
                overlap_max,
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(genes: &[usize]) -> GeneSet {
        genes.iter().copied().collect()
    }

    #[test]
    fn test_field_names() {
        assert_eq!(field_name(0), "A");
        assert_eq!(field_name(25), "Z");
        assert_eq!(field_name(26), "AA");
        assert_eq!(field_name(27), "AB");
        assert_eq!(field_name(701), "ZZ");
        assert_eq!(field_name(702), "AAA");
    }

    #[test]
    fn test_smaller_clusters_keep_shared_genes() {
        let fields = into_fields(vec![set(&[1, 2, 3, 4, 5]), set(&[4, 5, 6]), set(&[9])]);

        assert_eq!(
            fields,
            vec![
                Field {
                    name: "A".into(),
                    genes: vec![9]
                },
                Field {
                    name: "B".into(),
                    genes: vec![4, 5, 6]
                },
                Field {
                    name: "C".into(),
                    genes: vec![1, 2, 3]
                },
            ]
        );
    }

    #[test]
    fn test_fields_are_disjoint_and_emptied_clusters_dropped() {
        let fields = into_fields(vec![
            set(&[1, 2, 3, 4, 5, 6]),
            set(&[1, 2]),
            set(&[2, 3]),
            set(&[7, 8, 9, 10]),
            set(&[1, 2, 3]),
        ]);

        let mut seen = FxHashSet::default();
        for field in &fields {
            for &g in &field.genes {
                assert!(seen.insert(g), "gene {} in two fields", g);
            }
        }
        // {1,2,3} is fully claimed by {1,2} and {2,3}
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_field_overlaps() {
        let table = |entries: &[(&str, &[&str])]| -> FieldTable {
            entries
                .iter()
                .map(|(f, genes)| (f.to_string(), genes.iter().map(|g| g.to_string()).collect()))
                .collect()
        };
        let a = table(&[("A", &["g1", "g2", "g3", "g4"][..]), ("B", &["g9"][..])]);
        let b = table(&[("A", &["g1", "g2"][..]), ("B", &["g3", "g7", "g8", "g10"][..])]);

        let overlaps = field_overlaps(&a, &b, 0.5);
        assert_eq!(
            overlaps,
            vec![FieldOverlap {
                field_a: "A".into(),
                field_b: "A".into(),
                common: 2,
                overlap_min: 0.5,
                overlap_max: 1.0,
            }]
        );
        assert_eq!(field_overlaps(&a, &b, 0.0).len(), 4);
    }
}
