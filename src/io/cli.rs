//! Command-line interface for discovering enriched niches in a spot table

use crate::algorithm::pipeline::discover_with;
use crate::analysis::statistics::{FdrMethod, TestMethod};
use crate::io::configuration::{
    CoverageWeighting, DEFAULT_CLUSTER_FIELD, DEFAULT_COL_FIELD, DEFAULT_COVERAGE_THRESHOLD,
    DEFAULT_ENRICHMENT_FOLD, DEFAULT_FC_THRESHOLD, DEFAULT_GROUP_FIELD, DEFAULT_P_THRESHOLD,
    DEFAULT_PERMUTATIONS, DEFAULT_ROW_FIELD, DEFAULT_SAMPLE_FIELD, DEFAULT_SEED, DiscoveryConfig,
    FieldNames, IntegrityPolicy, OUTPUT_SUFFIX,
};
use crate::io::error::Result;
use crate::io::export::DiscoveryReport;
use crate::io::progress::ProgressManager;
use crate::io::table::load_table;
use crate::spatial::grid::GridTopology;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "stniche")]
#[command(
    author,
    version,
    about = "Discover spatial niches enriched in one sample group"
)]
/// Command-line arguments for niche discovery
// Discovery exposes several independent on/off switches
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input JSON file: an array with one object per spot
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Group in which enrichment is sought
    #[arg(short, long, default_value = "disease")]
    pub focus: String,

    /// Group the focus group is compared against
    #[arg(short, long, default_value = "healthy")]
    pub comparison: String,

    /// Field holding the grid row
    #[arg(long, default_value = DEFAULT_ROW_FIELD)]
    pub row_field: String,

    /// Field holding the grid column
    #[arg(long, default_value = DEFAULT_COL_FIELD)]
    pub col_field: String,

    /// Field holding the sample identifier
    #[arg(long, default_value = DEFAULT_SAMPLE_FIELD)]
    pub sample_field: String,

    /// Field holding the cluster label
    #[arg(long, default_value = DEFAULT_CLUSTER_FIELD)]
    pub cluster_field: String,

    /// Field holding the group label
    #[arg(long, default_value = DEFAULT_GROUP_FIELD)]
    pub group_field: String,

    /// Field holding the spot identity (synthesised from coordinates if absent)
    #[arg(long)]
    pub spot_field: Option<String>,

    /// Minimum fold for significant cluster pairs
    #[arg(long, default_value_t = DEFAULT_ENRICHMENT_FOLD)]
    pub enrichment_fold: f64,

    /// Minimum fold for structures of order three and above
    #[arg(long, default_value_t = DEFAULT_FC_THRESHOLD)]
    pub fc_threshold: f64,

    /// Maximum raw and adjusted p-value
    #[arg(short, long, default_value_t = DEFAULT_P_THRESHOLD)]
    pub p_threshold: f64,

    /// Minimum aggregate coverage
    #[arg(long, default_value_t = DEFAULT_COVERAGE_THRESHOLD)]
    pub coverage_threshold: f64,

    /// Stop expanding after this order
    #[arg(short = 'k', long)]
    pub max_order: Option<usize>,

    /// Grid adjacency: hexagonal, visium-legacy, square4 or square8
    #[arg(short, long, default_value = "hexagonal")]
    pub topology: String,

    /// Two-group significance test
    #[arg(long, value_enum, default_value_t = TestMethod::default())]
    pub test: TestMethod,

    /// Multiple-testing correction
    #[arg(long, value_enum, default_value_t = FdrMethod::default())]
    pub fdr: FdrMethod,

    /// Samples contributing to aggregate coverage
    #[arg(long, value_enum, default_value_t = CoverageWeighting::default())]
    pub weighting: CoverageWeighting,

    /// Skip samples failing integrity checks instead of aborting
    #[arg(long)]
    pub skip_invalid_samples: bool,

    /// Allow a structure to grow by a label it already contains
    #[arg(long)]
    pub allow_repeated_labels: bool,

    /// Random seed for the permutation test
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Number of permutations for the permutation test
    #[arg(long, default_value_t = DEFAULT_PERMUTATIONS)]
    pub permutations: usize,

    /// Report path (defaults to `<input>_niches.json` next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Default log filter for the chosen verbosity
    pub const fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }

    /// Input field names
    pub fn field_names(&self) -> FieldNames {
        FieldNames {
            row: self.row_field.clone(),
            col: self.col_field.clone(),
            sample: self.sample_field.clone(),
            cluster: self.cluster_field.clone(),
            group: self.group_field.clone(),
            spot: self.spot_field.clone(),
        }
    }

    /// Discovery configuration from the arguments
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an unknown topology or out-of-range
    /// thresholds
    pub fn config(&self) -> Result<DiscoveryConfig> {
        let config = DiscoveryConfig {
            groups: [self.focus.clone(), self.comparison.clone()],
            focus_group: self.focus.clone(),
            enrichment_fold: self.enrichment_fold,
            fc_threshold: self.fc_threshold,
            p_threshold: self.p_threshold,
            coverage_threshold: self.coverage_threshold,
            max_order: self.max_order,
            topology: GridTopology::from_name(&self.topology)?,
            weighting: self.weighting,
            test: self.test,
            fdr: self.fdr,
            integrity: if self.skip_invalid_samples {
                IntegrityPolicy::SkipSample
            } else {
                IntegrityPolicy::Fail
            },
            distinct_labels: !self.allow_repeated_labels,
            seed: self.seed,
            permutations: self.permutations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Where the report is written
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| Self::default_output_path(&self.input))
    }

    fn default_output_path(input_path: &Path) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_default();
        let output_name = format!("{}{}.json", stem.to_string_lossy(), OUTPUT_SUFFIX);

        if let Some(parent) = input_path.parent() {
            parent.join(output_name)
        } else {
            PathBuf::from(output_name)
        }
    }
}

/// Loads the input, runs discovery and writes the report
pub struct DiscoveryRunner {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl DiscoveryRunner {
    /// Create a runner for the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            progress_manager,
        }
    }

    /// Run discovery and write the JSON report
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the input cannot be
    /// read, discovery fails, or the report cannot be written
    pub fn process(&mut self) -> Result<DiscoveryReport> {
        let start_time = Instant::now();
        let config = self.cli.config()?;
        let table = load_table(&self.cli.input, &self.cli.field_names())?;
        info!(
            "Loaded {} spots, {} clusters, {} samples from {}",
            table.spots().len(),
            table.clusters().len(),
            table.samples().len(),
            self.cli.input.display()
        );

        let run = match self.progress_manager.as_mut() {
            Some(pm) => {
                let run = discover_with(&table, &config, pm);
                pm.finish();
                run?
            }
            None => discover_with(&table, &config, &mut ())?,
        };

        let report = DiscoveryReport::from_run(&run, &table, &config);
        let output_path = self.cli.output_path();
        report.write_json(&output_path)?;

        info!(
            "Wrote {} structures up to order {} to {} in {:.2?}",
            run.arena.len(),
            run.highest_order().unwrap_or(0),
            output_path.display(),
            start_time.elapsed()
        );

        Ok(report)
    }
}
