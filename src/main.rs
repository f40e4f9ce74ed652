use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use sphere_test::{ControlSampling, NullModel, SphereTestConfig};

use gene_fields::pipeline::DEFAULT_COMPARE_MIN_OVERLAP;
use gene_fields::synthetic::SyntheticConfig;
use gene_fields::util::parse_count;
use gene_fields::{FieldsError, PopulationSource, RunOptions, TestKind};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliTest {
    Conservation,
    Taxon,
    #[value(name = "motif-distance")]
    MotifDistance,
    #[value(name = "motif-index")]
    MotifIndex,
    Promoter,
    #[value(name = "replication-timing")]
    ReplicationTiming,
}

impl From<CliTest> for TestKind {
    fn from(value: CliTest) -> Self {
        match value {
            CliTest::Conservation => TestKind::Conservation,
            CliTest::Taxon => TestKind::Taxon,
            CliTest::MotifDistance => TestKind::MotifDistance,
            CliTest::MotifIndex => TestKind::MotifIndex,
            CliTest::Promoter => TestKind::Promoter,
            CliTest::ReplicationTiming => TestKind::ReplicationTiming,
        }
    }
}

/// gene-fields - find spatially coherent gene fields with sphere tests
#[derive(Parser, Debug)]
#[command(name = "gene-fields", version, about)]
struct Cli {
    /// Which sphere test to run
    #[arg(long, value_enum)]
    test: CliTest,

    /// Gene table: `Gene x y z <payload columns...>`, tab-separated, genome order
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "synthetic",
        required_unless_present = "synthetic"
    )]
    input: Option<PathBuf>,

    /// Generate N synthetic genes (e.g. 5000, 20k) with a planted sphere instead of reading a file
    #[arg(long, value_name = "N", value_parser = parse_count)]
    synthetic: Option<usize>,

    /// Payload width of synthetic motif and histone profiles
    #[arg(long, default_value_t = 16)]
    synthetic_width: usize,

    /// Do not plant a coherent sphere in the synthetic population
    #[arg(long)]
    no_plant: bool,

    /// JSON configuration file; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Radius of the sampling spheres
    #[arg(long)]
    radius: Option<f32>,

    /// Minimum coordinate of the sampling box
    #[arg(long)]
    box_min: Option<f32>,

    /// Maximum coordinate of the sampling box
    #[arg(long)]
    box_max: Option<f32>,

    /// Spheres with fewer genes are rejected
    #[arg(long)]
    min_genes: Option<usize>,

    /// Sphere samples to accept (e.g. 20k)
    #[arg(long, value_parser = parse_count)]
    samples: Option<usize>,

    /// Random comparison sets per sphere (defaults to --samples)
    #[arg(long, value_parser = parse_count)]
    random_samples: Option<usize>,

    /// Significance threshold on the adjusted p-value
    #[arg(long)]
    p_adj: Option<f64>,

    /// Overlap ratio at which clusters keep merging
    #[arg(long)]
    overlap: Option<f64>,

    /// Sphere draws allowed before giving up
    #[arg(long, value_parser = parse_count)]
    max_attempts: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Share one null distribution per sphere size across work units
    #[arg(long)]
    shared_null: bool,

    /// Draw comparison sets as contiguous genome windows
    #[arg(long)]
    genome_window: bool,

    /// Directory for the p-value, statistic and field tables
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Base name of the output tables (defaults to the test's field table name)
    #[arg(long)]
    name: Option<String>,

    /// Write a JSON run summary (supports .json and .json.gz)
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Field table of an earlier run to compare the new fields against
    #[arg(long, value_name = "FILE")]
    compare: Option<PathBuf>,

    /// Minimum overlap of the smaller field for a compared pair to be reported
    #[arg(long, default_value_t = DEFAULT_COMPARE_MIN_OVERLAP)]
    compare_min_overlap: f64,
}

impl Cli {
    fn sphere_test_config(&self) -> Result<SphereTestConfig, FieldsError> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => SphereTestConfig::default(),
        };

        if let Some(v) = self.radius {
            config.sphere_radius = v;
        }
        if let Some(v) = self.box_min {
            config.box_min = v;
        }
        if let Some(v) = self.box_max {
            config.box_max = v;
        }
        if let Some(v) = self.min_genes {
            config.minimum_gene_count = v;
        }
        if let Some(v) = self.samples {
            config.sample_count = v;
        }
        if self.random_samples.is_some() {
            config.random_sample_count = self.random_samples;
        }
        if let Some(v) = self.p_adj {
            config.p_adj_threshold = v;
        }
        if let Some(v) = self.overlap {
            config.overlap_threshold = v;
        }
        if self.max_attempts.is_some() {
            config.max_sampling_attempts = self.max_attempts;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if self.shared_null {
            config.null_model = NullModel::SharedBySize;
        }
        if self.genome_window {
            config.control = ControlSampling::GenomeWindow;
        }

        config.validate()?;
        Ok(config)
    }

    fn population_source(&self, config: &SphereTestConfig) -> PopulationSource {
        match (&self.input, self.synthetic) {
            (Some(path), _) => PopulationSource::File(path.clone()),
            (None, count) => {
                let mut synthetic = SyntheticConfig::for_test(count.unwrap_or_default(), config);
                synthetic.payload_width = self.synthetic_width;
                if self.no_plant {
                    synthetic.planted = None;
                }
                PopulationSource::Synthetic(synthetic)
            }
        }
    }
}

fn run(cli: &Cli) -> Result<(), FieldsError> {
    let kind = TestKind::from(cli.test);
    let config = cli.sphere_test_config()?;
    let source = cli.population_source(&config);

    let options = RunOptions {
        name: cli
            .name
            .clone()
            .unwrap_or_else(|| kind.fields_name().to_string()),
        output_dir: cli.output_dir.clone(),
        summary: cli.summary.clone(),
        compare: cli.compare.clone(),
        compare_min_overlap: cli.compare_min_overlap,
    };

    let report = gene_fields::run(kind, &source, config, &options)?;
    println!(
        "{}: {} spheres, {} significant, {} fields",
        kind,
        report.output.work_units.len(),
        report.output.diagnostics.significant_units,
        report.output.fields.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let start = std::time::Instant::now();
    match run(&cli) {
        Ok(()) => {
            log::info!("Elapsed time: {:.2} minutes", start.elapsed().as_secs_f64() / 60.0);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
