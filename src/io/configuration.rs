//! Discovery constants and runtime configuration defaults

use crate::analysis::statistics::{FdrMethod, TestMethod};
use crate::io::error::{Result, invalid_parameter};
use crate::spatial::grid::GridTopology;
use crate::spatial::sample::{GroupId, SpotTable};

// Default input field names (Visium-style annotated tables)
/// Field holding the grid row
pub const DEFAULT_ROW_FIELD: &str = "array_row";
/// Field holding the grid column
pub const DEFAULT_COL_FIELD: &str = "array_col";
/// Field holding the sample identifier
pub const DEFAULT_SAMPLE_FIELD: &str = "sample_id";
/// Field holding the cluster label
pub const DEFAULT_CLUSTER_FIELD: &str = "cluster";
/// Field holding the group label
pub const DEFAULT_GROUP_FIELD: &str = "class";

// Default thresholds
/// Minimum focus/comparison adjacency fold for significant pairs
pub const DEFAULT_ENRICHMENT_FOLD: f64 = 4.0;
/// Minimum focus/comparison fold for higher-order structures
pub const DEFAULT_FC_THRESHOLD: f64 = 4.0;
/// Maximum raw and adjusted p-value
pub const DEFAULT_P_THRESHOLD: f64 = 0.05;
/// Minimum aggregate coverage ratio
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 0.8;

/// Smallest order the expander can stop at
pub const MIN_STRUCTURE_ORDER: usize = 2;

// Safety limit to prevent excessive memory allocation for the lookup grid
/// Maximum coordinate span per sample along either axis
pub const MAX_GRID_DIMENSION: usize = 10_000;

/// Fixed seed for reproducible permutation tests
pub const DEFAULT_SEED: u64 = 42;
/// Default number of label permutations
pub const DEFAULT_PERMUTATIONS: usize = 1000;

// Output settings
/// Suffix added to the input stem for the JSON report
pub const OUTPUT_SUFFIX: &str = "_niches";

/// What to do when one sample fails integrity checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrityPolicy {
    /// Abort the whole run
    #[default]
    Fail,
    /// Log a warning and continue without the sample
    SkipSample,
}

/// Which samples contribute to aggregate coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CoverageWeighting {
    /// Only samples of the focus group
    #[default]
    #[value(name = "focus")]
    FocusGroup,
    /// Samples of both compared groups
    #[value(name = "all")]
    AllSamples,
}

/// Names of the input fields carrying each spot attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    /// Grid row field
    pub row: String,
    /// Grid column field
    pub col: String,
    /// Sample identifier field
    pub sample: String,
    /// Cluster label field
    pub cluster: String,
    /// Group label field
    pub group: String,
    /// Optional spot identity field; identities are synthesised when absent
    pub spot: Option<String>,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            row: DEFAULT_ROW_FIELD.to_string(),
            col: DEFAULT_COL_FIELD.to_string(),
            sample: DEFAULT_SAMPLE_FIELD.to_string(),
            cluster: DEFAULT_CLUSTER_FIELD.to_string(),
            group: DEFAULT_GROUP_FIELD.to_string(),
            spot: None,
        }
    }
}

/// Parameters of one discovery run
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// The two compared groups
    pub groups: [String; 2],
    /// Group in which enrichment is sought; must be one of `groups`
    pub focus_group: String,
    /// Fold threshold for significant adjacency pairs
    pub enrichment_fold: f64,
    /// Fold threshold for structures of order three and above
    pub fc_threshold: f64,
    /// Raw and adjusted p-value threshold
    pub p_threshold: f64,
    /// Aggregate coverage threshold
    pub coverage_threshold: f64,
    /// Highest order to expand to; `None` expands until nothing survives
    pub max_order: Option<usize>,
    /// Grid adjacency offsets
    pub topology: GridTopology,
    /// Samples contributing to aggregate coverage
    pub weighting: CoverageWeighting,
    /// Two-group significance test
    pub test: TestMethod,
    /// Multiple-testing correction
    pub fdr: FdrMethod,
    /// Handling of per-sample integrity failures
    pub integrity: IntegrityPolicy,
    /// Only extend structures with labels they do not contain yet
    pub distinct_labels: bool,
    /// Seed for the permutation test
    pub seed: u64,
    /// Permutation count for the permutation test
    pub permutations: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            groups: ["disease".to_string(), "healthy".to_string()],
            focus_group: "disease".to_string(),
            enrichment_fold: DEFAULT_ENRICHMENT_FOLD,
            fc_threshold: DEFAULT_FC_THRESHOLD,
            p_threshold: DEFAULT_P_THRESHOLD,
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
            max_order: None,
            topology: GridTopology::default(),
            weighting: CoverageWeighting::default(),
            test: TestMethod::default(),
            fdr: FdrMethod::default(),
            integrity: IntegrityPolicy::default(),
            distinct_labels: true,
            seed: DEFAULT_SEED,
            permutations: DEFAULT_PERMUTATIONS,
        }
    }
}

impl DiscoveryConfig {
    /// Create a configuration comparing `focus` against `comparison`
    pub fn for_groups(focus: &str, comparison: &str) -> Self {
        Self {
            groups: [focus.to_string(), comparison.to_string()],
            focus_group: focus.to_string(),
            ..Self::default()
        }
    }

    /// The group compared against the focus group
    pub fn comparison_group(&self) -> &str {
        self.groups
            .iter()
            .find(|g| **g != self.focus_group)
            .map_or("", String::as_str)
    }

    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for any out-of-range threshold, an invalid
    /// group pair, a max order below two, or an invalid topology
    pub fn validate(&self) -> Result<()> {
        let [first, second] = &self.groups;
        if first == second {
            return Err(invalid_parameter(
                "groups",
                &format!("{first}, {second}"),
                &"the two compared groups must differ",
            ));
        }
        if !self.groups.contains(&self.focus_group) {
            return Err(invalid_parameter(
                "focus_group",
                &self.focus_group,
                &format!("must be one of {first}, {second}"),
            ));
        }

        check_unit_interval("p_threshold", self.p_threshold)?;
        check_unit_interval("coverage_threshold", self.coverage_threshold)?;
        check_fold("enrichment_fold", self.enrichment_fold)?;
        check_fold("fc_threshold", self.fc_threshold)?;

        if let Some(order) = self.max_order {
            if order < MIN_STRUCTURE_ORDER {
                return Err(invalid_parameter(
                    "max_order",
                    &order,
                    &format!("must be at least {MIN_STRUCTURE_ORDER}"),
                ));
            }
        }
        if self.test == TestMethod::Permutation && self.permutations == 0 {
            return Err(invalid_parameter(
                "permutations",
                &self.permutations,
                &"must be at least 1",
            ));
        }

        self.topology.validate()
    }

    /// Check parameters and resolve the groups against the data
    ///
    /// Returns the focus and comparison group ids.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` as in [`Self::validate`], or
    /// `UnknownLabel` when a configured group does not occur in the table
    pub fn validate_against(&self, table: &SpotTable) -> Result<(GroupId, GroupId)> {
        self.validate()?;
        let focus = table.group_id(&self.focus_group)?;
        let comparison = table.group_id(self.comparison_group())?;
        Ok((focus, comparison))
    }
}

fn check_unit_interval(parameter: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid_parameter(parameter, &value, &"must lie in [0, 1]"))
    }
}

fn check_fold(parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid_parameter(
            parameter,
            &value,
            &"must be a finite, non-negative fold",
        ))
    }
}
