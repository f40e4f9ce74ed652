//! End-to-end runs: load genes, run a sphere test, log and write results.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::Level;
use rayon::prelude::*;
use sphere_test::{
    field_overlaps, field_table, FieldOverlap, Gene, Population, SphereStatistic, SphereTest,
    SphereTestConfig, SphereTestOutput,
};

use crate::error::Result;
use crate::input::{load_fields, load_population, GeneRecord};
use crate::report::{
    export_json, write_fields, write_overlaps, write_p_values, write_statistics, RunSummary,
};
use crate::statistics::{
    MotifGene, MotifSimilarity, ProfileDistance, ProfileGene, ScalarGene, ScalarSpread,
    TaxonEnrichment, TaxonFrequencies, TaxonGene, TestKind,
};
use crate::synthetic::{generate, Synthesize, SyntheticConfig};
use crate::util::Timed;

/// Fields of two partitions are reported when they share at least this
/// fraction of the smaller field.
pub const DEFAULT_COMPARE_MIN_OVERLAP: f64 = 0.5;

/// Where the genes of a run come from.
#[derive(Debug, Clone)]
pub enum PopulationSource {
    /// A `Gene x y z <payload...>` table.
    File(PathBuf),
    Synthetic(SyntheticConfig),
}

/// What to write and compare after a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Base name of the output tables.
    pub name: String,
    /// Directory for the TSV tables; nothing is written when unset.
    pub output_dir: Option<PathBuf>,
    /// JSON summary path (`.gz` for gzip).
    pub summary: Option<PathBuf>,
    /// Field table of an earlier run to compare the new fields against.
    pub compare: Option<PathBuf>,
    pub compare_min_overlap: f64,
}

impl RunOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output_dir: None,
            summary: None,
            compare: None,
            compare_min_overlap: DEFAULT_COMPARE_MIN_OVERLAP,
        }
    }

    fn output_path(&self, file_name: String) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| dir.join(file_name))
    }

    pub fn p_values_path(&self) -> Option<PathBuf> {
        self.output_path(format!("pValues.{}.tsv", self.name))
    }

    pub fn statistics_path(&self) -> Option<PathBuf> {
        self.output_path(format!("StatInSphereAndRandom.{}.tsv", self.name))
    }

    pub fn fields_path(&self) -> Option<PathBuf> {
        self.output_path(format!("{}.tsv", self.name))
    }

    pub fn overlaps_path(&self) -> Option<PathBuf> {
        self.output_path(format!("{}.overlaps.tsv", self.name))
    }
}

/// Results of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: SphereTestOutput,
    pub summary: RunSummary,
    /// Field overlaps against the `compare` partition, if one was given.
    pub overlaps: Vec<FieldOverlap>,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    log::info!("Writing {}", path.display());
    Ok(BufWriter::new(File::create(path)?))
}

/// Run `statistic` over `population` and write whatever `options` asks for.
pub fn run_test<G, S>(
    kind: TestKind,
    population: &Population<G>,
    statistic: &S,
    config: SphereTestConfig,
    options: &RunOptions,
) -> Result<RunReport>
where
    G: Gene + Sync,
    S: SphereStatistic<G>,
{
    log::info!("{} test: {}", kind, statistic.description());
    log::info!("{} genes", population.len());

    if let Some(dir) = &options.output_dir {
        fs::create_dir_all(dir)?;
    }

    let test = SphereTest::new(population, statistic, config)?;
    let config = test.config().clone();

    let (mut work_units, sampling) = {
        let _t = Timed::info(format!("{}: sampling", kind));
        log::info!("Generating {} sphere samples", config.sample_count);
        test.sample()?
    };
    log::info!(
        "Average genes in a sphere: {:.1} ({} attempts, {} rejected)",
        sampling.average_genes_in_sphere,
        sampling.attempts,
        sampling.rejected
    );

    {
        let _t = Timed::info(format!("{}: testing", kind));
        log::info!(
            "Calculating p-values for {} sphere samples using {} random samples each ({:?}, {:?})",
            work_units.len(),
            config.random_samples(),
            config.null_model,
            config.control
        );
        test.test(&mut work_units)?;
    }
    if let Some(path) = options.statistics_path() {
        write_statistics(create(&path)?, &work_units)?;
    }

    {
        let _t = Timed::new(Level::Debug, format!("{}: Benjamini-Hochberg correction", kind));
        test.correct(&mut work_units);
    }
    if let Some(path) = options.p_values_path() {
        write_p_values(create(&path)?, &work_units)?;
    }

    let (fields, outcome) = {
        let _t = Timed::info(format!("{}: clustering", kind));
        test.cluster(&work_units)
    };
    let output = test.assemble(work_units, sampling, fields, &outcome);
    let diagnostics = &output.diagnostics;

    log::info!(
        "{} significant spheres (adjusted p-value at most {}), {} significant genes",
        diagnostics.significant_units,
        config.p_adj_threshold,
        diagnostics.significant_genes
    );
    match output.significant(config.p_adj_threshold).next() {
        Some(best) => {
            let names: Vec<&str> = best
                .genes
                .iter()
                .map(|&g| population.gene(g).name())
                .collect();
            log::info!(
                "Best sphere: p-value {}, statistic {:.4}: {}",
                best.p_value,
                best.observed_statistic,
                names.join(" ")
            );
        }
        None => log::info!("No significant samples found"),
    }
    log::info!(
        "Stopping clustering with {} clusters, {:.2}% maximum gene overlap (threshold {:.2}%)",
        diagnostics.clusters_before_cleanup,
        diagnostics.max_overlap_ratio * 100.0,
        config.overlap_threshold * 100.0
    );

    let field_statistics = output
        .fields
        .par_iter()
        .map(|field| field.statistic(population, statistic))
        .collect::<std::result::Result<Vec<f64>, _>>()?;
    for (field, value) in output.fields.iter().zip(&field_statistics) {
        log::info!("\tField {}: {} genes, statistic {:.4}", field.name, field.len(), value);
    }

    let genome_statistic = {
        let _t = Timed::new(Level::Debug, format!("{}: genome-wide statistic", kind));
        statistic.statistic(&population.all())?
    };
    log::info!("Genome-wide statistic: {:.4}", genome_statistic);

    if let Some(path) = options.fields_path() {
        if output.fields.is_empty() {
            log::info!("No fields found, not writing a field table");
        } else {
            write_fields(create(&path)?, &output.fields, population)?;
        }
    }

    let mut overlaps = Vec::new();
    if let Some(previous) = &options.compare {
        let previous_table = load_fields(previous)?;
        let current_table = field_table(&output.fields, population);
        overlaps = field_overlaps(&previous_table, &current_table, options.compare_min_overlap);
        log::info!(
            "{} field pairs overlap {} by at least {:.0}%",
            overlaps.len(),
            previous.display(),
            options.compare_min_overlap * 100.0
        );
        for o in &overlaps {
            log::info!(
                "\t{} ~ {}: {} common genes, {:.2} / {:.2}",
                o.field_a,
                o.field_b,
                o.common,
                o.overlap_min,
                o.overlap_max
            );
        }
        if let Some(path) = options.overlaps_path() {
            write_overlaps(create(&path)?, &overlaps)?;
        }
    }

    let mut summary = RunSummary::from_output(
        kind,
        statistic.description(),
        &options.name,
        &config,
        population,
        &output,
        &field_statistics,
        genome_statistic,
    );
    summary.overlaps = overlaps.clone();
    if let Some(path) = &options.summary {
        let _t = Timed::new(Level::Debug, format!("{}: summary export", kind));
        log::info!("Exporting summary to {}", path.display());
        export_json(&summary, path)?;
    }

    Ok(RunReport {
        output,
        summary,
        overlaps,
    })
}

fn load<G: GeneRecord + Synthesize>(
    kind: TestKind,
    source: &PopulationSource,
) -> Result<Population<G>> {
    let _t = Timed::info(format!("{}: loading genes", kind));
    match source {
        PopulationSource::File(path) => load_population(path),
        PopulationSource::Synthetic(config) => generate(config),
    }
}

/// Load the genes `kind` needs from `source` and run it.
pub fn run(
    kind: TestKind,
    source: &PopulationSource,
    config: SphereTestConfig,
    options: &RunOptions,
) -> Result<RunReport> {
    match kind {
        TestKind::Conservation => {
            let population = load::<ScalarGene>(kind, source)?;
            run_test(kind, &population, &ScalarSpread::conservation(), config, options)
        }
        TestKind::ReplicationTiming => {
            let population = load::<ScalarGene>(kind, source)?;
            let statistic = ScalarSpread::replication_timing();
            if let Some(gap) = statistic.minimum_order_gap() {
                log::info!("Accepting spheres spanning a genome-order gap of at least {}", gap);
            }
            run_test(kind, &population, &statistic, config, options)
        }
        TestKind::Taxon => {
            let population = load::<TaxonGene>(kind, source)?;
            let statistic = TaxonEnrichment::new(TaxonFrequencies::from_genes(population.genes()));
            log::info!("Base taxon frequencies:");
            for (taxon, frequency) in statistic.background().sorted() {
                log::info!("\t{}: {:.2}", taxon, frequency);
            }
            run_test(kind, &population, &statistic, config, options)
        }
        TestKind::MotifDistance => {
            let population = load::<MotifGene>(kind, source)?;
            run_test(kind, &population, &MotifSimilarity::jaccard_distance(), config, options)
        }
        TestKind::MotifIndex => {
            let population = load::<MotifGene>(kind, source)?;
            run_test(kind, &population, &MotifSimilarity::jaccard_index(), config, options)
        }
        TestKind::Promoter => {
            let population = load::<ProfileGene>(kind, source)?;
            run_test(kind, &population, &ProfileDistance, config, options)
        }
    }
}
