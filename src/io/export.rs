//! JSON report of a discovery run
//!
//! Ids are resolved back to label text and spot barcodes so the report can
//! be read without the input table. Infinite folds serialize as `null` and
//! are flagged by `focus_exclusive`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use serde::Serialize;

use crate::algorithm::pipeline::DiscoveryRun;
use crate::algorithm::shape::ShapeCount;
use crate::algorithm::structure::Structure;
use crate::analysis::adjacency::AdjacencyPair;
use crate::io::configuration::DiscoveryConfig;
use crate::io::error::{ErrorContext, Result, WithContext};
use crate::spatial::sample::{ClusterId, SpotTable};

/// Parameters echoed into the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportParameters {
    /// Pair fold threshold
    pub enrichment_fold: f64,
    /// Structure fold threshold
    pub fc_threshold: f64,
    /// p-value threshold
    pub p_threshold: f64,
    /// Coverage threshold
    pub coverage_threshold: f64,
    /// Maximum order, if bounded
    pub max_order: Option<usize>,
    /// Significance test
    pub test: &'static str,
    /// Multiple-testing correction
    pub fdr: &'static str,
    /// Grid neighbor offsets
    pub offsets: Vec<[i32; 2]>,
}

/// One cluster pair of the adjacency table
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    /// First cluster
    pub first: String,
    /// Second cluster
    pub second: String,
    /// Joining edges across focus samples
    pub focus_count: u64,
    /// Joining edges across comparison samples
    pub comparison_count: u64,
    /// Fold, `null` when infinite
    pub fold: f64,
    /// Observed only in the focus group
    pub focus_exclusive: bool,
    /// Raw p-value
    pub p_value: f64,
    /// Adjusted p-value
    pub adjusted_p: f64,
}

/// Adjacency section
#[derive(Debug, Clone, Serialize)]
pub struct AdjacencyReport {
    /// Cluster labels indexing the matrices
    pub clusters: Vec<String>,
    /// Every observed pair
    pub pairs: Vec<PairReport>,
    /// Pairs passing the significance thresholds
    pub significant: Vec<[String; 2]>,
    /// Mean per-spot neighbor counts, focus group
    pub focus_matrix: Vec<Vec<f64>>,
    /// Mean per-spot neighbor counts, comparison group
    pub comparison_matrix: Vec<Vec<f64>>,
    /// Focus minus comparison with a zero diagonal
    pub difference_matrix: Vec<Vec<f64>>,
}

/// Occurrence of a structure in one sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    /// Sample identifier
    pub sample: String,
    /// Group label
    pub group: String,
    /// Realizing spot sets
    pub occurrences: usize,
    /// Opportunities
    pub trials: usize,
    /// Per-sample coverage
    pub coverage: f64,
    /// Barcodes of realizing spots
    pub spots: Vec<String>,
    /// Arrangements of the realizing spot sets, most frequent first
    pub shapes: Vec<ShapeReport>,
}

/// One spot pair of an arrangement
#[derive(Debug, Clone, Serialize)]
pub struct SpacingReport {
    /// Label of one spot
    pub first: String,
    /// Label of the other spot
    pub second: String,
    /// Euclidean distance in spot pitches
    pub distance: f64,
}

/// Realizing spot sets sharing one arrangement
#[derive(Debug, Clone, Serialize)]
pub struct ShapeReport {
    /// Distinct spot sets with this arrangement
    pub instances: usize,
    /// Pairwise spacings, shortest first
    pub spacings: Vec<SpacingReport>,
}

/// One accepted structure
#[derive(Debug, Clone, Serialize)]
pub struct StructureReport {
    /// Structure id
    pub id: u32,
    /// Number of labels
    pub order: usize,
    /// Labels in discovery order
    pub labels: Vec<String>,
    /// Labels sorted
    pub canonical: Vec<String>,
    /// Parent id
    pub parent: Option<u32>,
    /// Ancestor ids, root pair first, ending with this structure
    pub lineage: Vec<u32>,
    /// Fold, `null` when infinite
    pub fold_change: f64,
    /// Observed only in the focus group
    pub focus_exclusive: bool,
    /// Raw p-value
    pub p_value: f64,
    /// Adjusted p-value
    pub adjusted_p: f64,
    /// Aggregate coverage
    pub coverage: f64,
    /// Fraction of focus samples containing the structure
    pub prevalence: f64,
    /// Mean occurrences over the weighted samples
    pub mean_occurrence: f64,
    /// Per-sample detail
    pub samples: Vec<SampleReport>,
}

/// Structures accepted at one order
#[derive(Debug, Clone, Serialize)]
pub struct IterationReport {
    /// Order
    pub order: usize,
    /// Candidates received by the filter
    pub candidates_evaluated: usize,
    /// Accepted structures
    pub structures: Vec<StructureReport>,
}

/// Complete serialisable report
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    /// Focus group label
    pub focus_group: String,
    /// Comparison group label
    pub comparison_group: String,
    /// Run parameters
    pub parameters: ReportParameters,
    /// Samples dropped for integrity failures
    pub skipped_samples: Vec<String>,
    /// Pairwise adjacency
    pub adjacency: AdjacencyReport,
    /// Per-order results
    pub iterations: Vec<IterationReport>,
}

impl DiscoveryReport {
    /// Resolve a run against its input table
    pub fn from_run(run: &DiscoveryRun, table: &SpotTable, config: &DiscoveryConfig) -> Self {
        let names = |labels: &[ClusterId]| -> Vec<String> {
            labels
                .iter()
                .map(|&c| table.cluster_name(c).to_string())
                .collect()
        };

        let adjacency = AdjacencyReport {
            clusters: table.clusters().names().to_vec(),
            pairs: run
                .adjacency
                .pairs()
                .iter()
                .map(|p| pair_report(p, table))
                .collect(),
            significant: run
                .adjacency
                .significant()
                .map(|p| {
                    [
                        table.cluster_name(p.first).to_string(),
                        table.cluster_name(p.second).to_string(),
                    ]
                })
                .collect(),
            focus_matrix: matrix_rows(run.adjacency.focus_matrix()),
            comparison_matrix: matrix_rows(run.adjacency.comparison_matrix()),
            difference_matrix: matrix_rows(&run.adjacency.difference_matrix()),
        };

        let iterations = run
            .iterations
            .iter()
            .map(|iteration| IterationReport {
                order: iteration.order,
                candidates_evaluated: iteration.candidates_evaluated,
                structures: iteration
                    .structures
                    .iter()
                    .filter_map(|&id| run.structure(id))
                    .map(|s| structure_report(s, run, table, &names))
                    .collect(),
            })
            .collect();

        Self {
            focus_group: config.focus_group.clone(),
            comparison_group: config.comparison_group().to_string(),
            parameters: ReportParameters {
                enrichment_fold: config.enrichment_fold,
                fc_threshold: config.fc_threshold,
                p_threshold: config.p_threshold,
                coverage_threshold: config.coverage_threshold,
                max_order: config.max_order,
                test: config.test.build(config.permutations, config.seed).name(),
                fdr: config.fdr.build().name(),
                offsets: config.topology.offsets(),
            },
            skipped_samples: run.skipped_samples.clone(),
            adjacency,
            iterations,
        }
    }

    /// Pretty-printed JSON text
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON
    ///
    /// # Errors
    ///
    /// Returns `FileSystem` when the file cannot be created or written and
    /// `Serialization` if encoding fails
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let context = ErrorContext {
            path: Some(path.to_path_buf()),
            operation: Some("writing report"),
            ..Default::default()
        };
        let file = File::create(path).with_context(context.clone())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).with_context(context.clone())?;
        writer.flush().with_context(context)?;
        Ok(())
    }
}

fn pair_report(pair: &AdjacencyPair, table: &SpotTable) -> PairReport {
    PairReport {
        first: table.cluster_name(pair.first).to_string(),
        second: table.cluster_name(pair.second).to_string(),
        focus_count: pair.focus_count(),
        comparison_count: pair.comparison_count(),
        fold: pair.fold,
        focus_exclusive: pair.is_focus_exclusive(),
        p_value: pair.p_value,
        adjusted_p: pair.adjusted_p,
    }
}

fn structure_report(
    structure: &Structure,
    run: &DiscoveryRun,
    table: &SpotTable,
    names: &dyn Fn(&[ClusterId]) -> Vec<String>,
) -> StructureReport {
    let spots = run.realizing_spots(structure.id);
    let shapes = run.shapes(structure.id, table);
    let samples = structure
        .samples
        .iter()
        .map(|occurrence| SampleReport {
            sample: table.sample_name(occurrence.sample).to_string(),
            group: table.group_name(occurrence.group).to_string(),
            occurrences: occurrence.occurrences,
            trials: occurrence.trials,
            coverage: occurrence.coverage,
            spots: spots
                .iter()
                .find(|(sample, _)| *sample == occurrence.sample)
                .map(|(_, indices)| {
                    indices
                        .iter()
                        .filter_map(|&i| table.spot(i).map(|s| s.barcode.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            shapes: shapes
                .iter()
                .find(|(sample, _)| *sample == occurrence.sample)
                .map(|(_, counts)| {
                    counts
                        .iter()
                        .map(|count| shape_report(count, run, table))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    StructureReport {
        id: structure.id.0,
        order: structure.order(),
        labels: names(&structure.labels),
        canonical: names(&structure.canonical),
        parent: structure.parent.map(|p| p.0),
        lineage: run.lineage(structure.id).iter().map(|s| s.id.0).collect(),
        fold_change: structure.stats.fold_change,
        focus_exclusive: structure.stats.counts.is_focus_exclusive(),
        p_value: structure.stats.p_value,
        adjusted_p: structure.stats.adjusted_p,
        coverage: structure.stats.coverage,
        prevalence: structure.stats.prevalence,
        mean_occurrence: structure.stats.mean_occurrence,
        samples,
    }
}

fn shape_report(count: &ShapeCount, run: &DiscoveryRun, table: &SpotTable) -> ShapeReport {
    let unit = run.topology.unit_squared() as f64;
    ShapeReport {
        instances: count.instances,
        spacings: count
            .signature
            .pairs()
            .iter()
            .map(|pair| SpacingReport {
                first: table.cluster_name(pair.labels.0).to_string(),
                second: table.cluster_name(pair.labels.1).to_string(),
                distance: (pair.squared_distance as f64 / unit).sqrt(),
            })
            .collect(),
    }
}

fn matrix_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}
