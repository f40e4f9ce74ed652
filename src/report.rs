//! Run outputs: tab-separated tables and a JSON run summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use sphere_test::{
    Field, FieldOverlap, Gene, Population, SphereTestConfig, SphereTestOutput, WorkUnit,
};

use crate::error::Result;
use crate::statistics::TestKind;

/// One `raw<TAB>adjusted` row per work unit, in rank order. No header.
pub fn write_p_values<W: Write>(mut out: W, units: &[WorkUnit]) -> Result<()> {
    for unit in units {
        writeln!(out, "{}\t{}", unit.p_value, unit.adjusted_p_value)?;
    }
    out.flush()?;
    Ok(())
}

/// One `observed<TAB>last random` row per work unit. No header.
pub fn write_statistics<W: Write>(mut out: W, units: &[WorkUnit]) -> Result<()> {
    for unit in units {
        writeln!(out, "{}\t{}", unit.observed_statistic, unit.random_statistic)?;
    }
    out.flush()?;
    Ok(())
}

/// `Gene<TAB>Field` table, fields in name order, genes in population order.
pub fn write_fields<W: Write, G: Gene>(
    mut out: W,
    fields: &[Field],
    population: &Population<G>,
) -> Result<()> {
    writeln!(out, "Gene\tField")?;
    for field in fields {
        for name in field.gene_names(population) {
            writeln!(out, "{}\t{}", name, field.name)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Field pairs of two partitions with their overlap, with a header row.
pub fn write_overlaps<W: Write>(mut out: W, overlaps: &[FieldOverlap]) -> Result<()> {
    writeln!(out, "FieldA\tFieldB\tCommon\tOverlapMin\tOverlapMax")?;
    for o in overlaps {
        writeln!(
            out,
            "{}\t{}\t{}\t{:.4}\t{:.4}",
            o.field_a, o.field_b, o.common, o.overlap_min, o.overlap_max
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Serialize `value` as JSON to `path`, gzipped when the path ends in `.gz`.
pub fn export_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let is_gzip = path.extension().is_some_and(|ext| ext == "gz");

    if is_gzip {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, value)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    Ok(())
}

/// Everything worth keeping about one run, for later analysis.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub metadata: Metadata,
    pub sampling: SamplingSummary,
    pub significance: SignificanceSummary,
    pub clustering: ClusteringSummary,
    pub fields: Vec<FieldSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overlaps: Vec<FieldOverlap>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub test: TestKind,
    pub description: String,
    pub name: String,
    pub gene_count: usize,
    pub config: SphereTestConfig,
    /// The statistic over the whole population, for scale.
    pub genome_statistic: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingSummary {
    pub accepted: usize,
    pub attempts: usize,
    pub rejected: usize,
    pub average_genes_in_sphere: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignificanceSummary {
    pub significant_spheres: usize,
    pub significant_genes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_sphere: Option<BestSphere>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestSphere {
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub statistic: f64,
    pub genes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringSummary {
    pub overlap_threshold: f64,
    pub clusters_before_cleanup: usize,
    pub merges: usize,
    pub max_overlap_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub size: usize,
    pub statistic: f64,
    pub genes: Vec<String>,
}

impl RunSummary {
    /// Collect a summary. `field_statistics` is parallel to `output.fields`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_output<G: Gene>(
        test: TestKind,
        description: &str,
        name: &str,
        config: &SphereTestConfig,
        population: &Population<G>,
        output: &SphereTestOutput,
        field_statistics: &[f64],
        genome_statistic: f64,
    ) -> Self {
        let diagnostics = &output.diagnostics;

        let best_sphere = output
            .best()
            .filter(|u| u.adjusted_p_value <= config.p_adj_threshold)
            .map(|u| BestSphere {
                p_value: u.p_value,
                adjusted_p_value: u.adjusted_p_value,
                statistic: u.observed_statistic,
                genes: u
                    .genes
                    .iter()
                    .map(|&g| population.gene(g).name().to_string())
                    .collect(),
            });

        let fields = output
            .fields
            .iter()
            .zip(field_statistics)
            .map(|(field, &statistic)| FieldSummary {
                name: field.name.clone(),
                size: field.len(),
                statistic,
                genes: field.gene_names(population).map(str::to_string).collect(),
            })
            .collect();

        Self {
            metadata: Metadata {
                test,
                description: description.to_string(),
                name: name.to_string(),
                gene_count: population.len(),
                config: config.clone(),
                genome_statistic,
            },
            sampling: SamplingSummary {
                accepted: output.work_units.len(),
                attempts: diagnostics.sampling.attempts,
                rejected: diagnostics.sampling.rejected,
                average_genes_in_sphere: diagnostics.sampling.average_genes_in_sphere,
            },
            significance: SignificanceSummary {
                significant_spheres: diagnostics.significant_units,
                significant_genes: diagnostics.significant_genes,
                best_sphere,
            },
            clustering: ClusteringSummary {
                overlap_threshold: config.overlap_threshold,
                clusters_before_cleanup: diagnostics.clusters_before_cleanup,
                merges: diagnostics.merges,
                max_overlap_ratio: diagnostics.max_overlap_ratio,
            },
            fields,
            overlaps: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use sphere_test::{into_fields, GeneSet, RandomSampler};

    use crate::statistics::ScalarGene;

    fn population() -> Population<ScalarGene> {
        let genes = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, n)| ScalarGene {
                name: n.to_string(),
                position: Vec3::splat(i as f32),
                value: i as f64,
                order: i,
            })
            .collect();
        Population::new(genes).unwrap()
    }

    #[test]
    fn test_write_fields() {
        let population = population();
        let fields = into_fields(vec![
            [0usize, 1, 2].into_iter().collect::<GeneSet>(),
            [3usize].into_iter().collect(),
        ]);
        let mut buffer = Vec::new();
        write_fields(&mut buffer, &fields, &population).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "Gene\tField\nd\tA\na\tB\nb\tB\nc\tB\n"
        );
    }

    #[test]
    fn test_write_overlaps() {
        let overlaps = vec![FieldOverlap {
            field_a: "A".into(),
            field_b: "C".into(),
            common: 3,
            overlap_min: 0.25,
            overlap_max: 0.75,
        }];
        let mut buffer = Vec::new();
        write_overlaps(&mut buffer, &overlaps).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "FieldA\tFieldB\tCommon\tOverlapMin\tOverlapMax\nA\tC\t3\t0.2500\t0.7500\n"
        );
    }

    #[test]
    fn test_work_unit_tables() {
        let mut unit = WorkUnit::new(vec![0, 1], RandomSampler::new(4, 1).unwrap());
        unit.p_value = 0.01;
        unit.adjusted_p_value = 0.02;
        unit.observed_statistic = 1.5;
        unit.random_statistic = 3.0;
        let units = vec![unit];

        let mut buffer = Vec::new();
        write_p_values(&mut buffer, &units).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "0.01\t0.02\n");

        let mut buffer = Vec::new();
        write_statistics(&mut buffer, &units).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "1.5\t3\n");

        let mut buffer = Vec::new();
        write_p_values(&mut buffer, &[]).unwrap();
        assert!(buffer.is_empty());
    }
}
