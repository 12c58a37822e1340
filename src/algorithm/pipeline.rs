//! End-to-end niche discovery over a spot table

use log::{info, warn};

use crate::algorithm::bitset::SpotSet;
use crate::algorithm::expansion::{ExpansionObserver, IterationResult, IterativeExpander};
use crate::algorithm::extraction::MotifExtractor;
use crate::algorithm::filter::{FilterThresholds, SignificanceFilter};
use crate::algorithm::shape::{ShapeCount, ShapeSignature, tally};
use crate::algorithm::structure::{Structure, StructureArena, StructureId};
use crate::analysis::adjacency::{AdjacencyTable, AdjacencyThresholds, GroupwiseAdjacencyAnalyzer};
use crate::io::configuration::{DiscoveryConfig, IntegrityPolicy};
use crate::io::error::{NicheError, Result};
use crate::spatial::graph::NeighborGraph;
use crate::spatial::grid::{GridTopology, SpatialGraphBuilder};
use crate::spatial::sample::{GroupId, Sample, SampleId, SpotTable};

/// Spots of one sample split by membership in a structure's niche
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicheMembership {
    /// Sample
    pub sample: SampleId,
    /// Table indices of spots realizing the structure
    pub niche: Vec<usize>,
    /// Table indices of every other spot of the sample
    pub background: Vec<usize>,
}

/// Result of a discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryRun {
    /// Focus group
    pub focus: GroupId,
    /// Comparison group
    pub comparison: GroupId,
    /// Pairwise adjacency comparison
    pub adjacency: AdjacencyTable,
    /// Neighbor graphs of the analysed samples, by sample id
    pub graphs: Vec<NeighborGraph>,
    /// Grid layout the graphs were built on
    pub topology: GridTopology,
    /// Accepted structures
    pub arena: StructureArena,
    /// One result per processed order, ascending from 2
    pub iterations: Vec<IterationResult>,
    /// Samples dropped by the integrity policy
    pub skipped_samples: Vec<String>,
}

impl DiscoveryRun {
    /// Accepted structure by id
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.arena.get(id)
    }

    /// Result for one order
    pub fn iteration(&self, order: usize) -> Option<&IterationResult> {
        self.iterations.iter().find(|r| r.order == order)
    }

    /// Structures accepted at one order, in canonical order
    pub fn structures_at(&self, order: usize) -> Vec<&Structure> {
        self.iteration(order)
            .map(|r| r.structures.iter().filter_map(|&id| self.arena.get(id)).collect())
            .unwrap_or_default()
    }

    /// Highest order with at least one accepted structure
    pub fn highest_order(&self) -> Option<usize> {
        self.iterations
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| r.order)
            .max()
    }

    /// Ancestry of a structure, root pair first
    pub fn lineage(&self, id: StructureId) -> Vec<&Structure> {
        self.arena
            .lineage(id)
            .into_iter()
            .filter_map(|ancestor| self.arena.get(ancestor))
            .collect()
    }

    /// Neighbor graph of a sample
    pub fn graph(&self, sample: SampleId) -> Option<&NeighborGraph> {
        self.graphs.iter().find(|g| g.sample() == sample)
    }

    /// Table indices of the spots realizing a structure, per sample
    ///
    /// Samples without an instance are omitted.
    pub fn realizing_spots(&self, id: StructureId) -> Vec<(SampleId, Vec<usize>)> {
        let Some(structure) = self.arena.get(id) else {
            return Vec::new();
        };
        structure
            .instances
            .iter()
            .filter_map(|entry| {
                let graph = self.graph(entry.sample)?;
                let spots = structure
                    .footprint(graph)
                    .to_vec()
                    .into_iter()
                    .filter_map(|node| graph.spot_index(node))
                    .collect();
                Some((entry.sample, spots))
            })
            .collect()
    }

    /// Distinct arrangements of a structure's realizing spot sets, per sample
    ///
    /// Positions and labels are read back from `table`, which must be the
    /// table the run was built from. Samples without an instance are omitted.
    pub fn shapes(&self, id: StructureId, table: &SpotTable) -> Vec<(SampleId, Vec<ShapeCount>)> {
        let Some(structure) = self.arena.get(id) else {
            return Vec::new();
        };
        structure
            .instances
            .iter()
            .filter_map(|entry| {
                let graph = self.graph(entry.sample)?;
                let signatures = entry.spot_sets().into_iter().map(|nodes| {
                    let spots: Vec<_> = nodes
                        .iter()
                        .filter_map(|&node| graph.spot_index(node))
                        .filter_map(|index| table.spot(index))
                        .map(|spot| (spot.cluster, spot.position))
                        .collect();
                    ShapeSignature::new(&spots, &self.topology)
                });
                Some((entry.sample, tally(signatures)))
            })
            .collect()
    }

    /// Niche versus background spots for every sample containing the structure
    pub fn niche_membership(&self, id: StructureId) -> Vec<NicheMembership> {
        let Some(structure) = self.arena.get(id) else {
            return Vec::new();
        };
        self.graphs
            .iter()
            .map(|graph| (graph, structure.footprint(graph)))
            .filter(|(_, niche)| !niche.is_empty())
            .map(|(graph, niche)| {
                let background = SpotSet::all(graph.node_count()).difference(&niche);
                let to_spots = |set: &SpotSet| -> Vec<usize> {
                    set.to_vec()
                        .into_iter()
                        .filter_map(|node| graph.spot_index(node))
                        .collect()
                };
                NicheMembership {
                    sample: graph.sample(),
                    niche: to_spots(&niche),
                    background: to_spots(&background),
                }
            })
            .collect()
    }
}

/// Run discovery without progress reporting
///
/// # Errors
///
/// See [`discover_with`]
pub fn discover(table: &SpotTable, config: &DiscoveryConfig) -> Result<DiscoveryRun> {
    discover_with(table, config, &mut ())
}

/// Run discovery, reporting progress to `observer`
///
/// # Errors
///
/// Returns `InvalidParameter` or `UnknownLabel` for a configuration that
/// does not fit the data, and `DataIntegrity` for a malformed sample unless
/// the integrity policy skips it
pub fn discover_with(
    table: &SpotTable,
    config: &DiscoveryConfig,
    observer: &mut dyn ExpansionObserver,
) -> Result<DiscoveryRun> {
    let (focus, comparison) = config.validate_against(table)?;
    let mut skipped_samples = Vec::new();

    let mut samples: Vec<Sample> = Vec::new();
    for partition in table.partition_samples() {
        match partition {
            Ok(sample) if sample.group == focus || sample.group == comparison => {
                samples.push(sample);
            }
            Ok(_) => {}
            Err(error) => admit(config.integrity, error, &mut skipped_samples)?,
        }
    }

    let builder = SpatialGraphBuilder::new(config.topology.clone());
    let mut graphs = Vec::with_capacity(samples.len());
    for built in builder.build_all(table, &samples) {
        match built {
            Ok(graph) => graphs.push(graph),
            Err(error) => admit(config.integrity, error, &mut skipped_samples)?,
        }
    }
    observer.graphs_built(graphs.len(), skipped_samples.len());
    info!(
        "Built {} neighbor graphs ({} skipped) for '{}' vs '{}'",
        graphs.len(),
        skipped_samples.len(),
        config.focus_group,
        config.comparison_group()
    );

    let test = config.test.build(config.permutations, config.seed);
    let fdr = config.fdr.build();

    let analyzer = GroupwiseAdjacencyAnalyzer::new(
        focus,
        comparison,
        AdjacencyThresholds {
            enrichment_fold: config.enrichment_fold,
            p_threshold: config.p_threshold,
        },
    );
    let adjacency = analyzer.analyze(&graphs, table.clusters().len(), test.as_ref(), fdr.as_ref());

    let extractor = MotifExtractor::new(focus, comparison, config.weighting, config.distinct_labels);
    let pair_filter = SignificanceFilter::new(
        focus,
        comparison,
        FilterThresholds {
            coverage: config.coverage_threshold,
            fold: config.enrichment_fold,
            p_value: config.p_threshold,
        },
    );
    let structure_filter = SignificanceFilter::new(
        focus,
        comparison,
        FilterThresholds {
            coverage: config.coverage_threshold,
            fold: config.fc_threshold,
            p_value: config.p_threshold,
        },
    );
    let expander = IterativeExpander::new(extractor, pair_filter, structure_filter, config.max_order);
    let expansion = expander.expand(&adjacency, &graphs, test.as_ref(), fdr.as_ref(), observer);

    Ok(DiscoveryRun {
        focus,
        comparison,
        adjacency,
        graphs,
        topology: config.topology.clone(),
        arena: expansion.arena,
        iterations: expansion.iterations,
        skipped_samples,
    })
}

/// Apply the integrity policy to one failed sample
fn admit(policy: IntegrityPolicy, error: NicheError, skipped: &mut Vec<String>) -> Result<()> {
    match (policy, error) {
        (IntegrityPolicy::SkipSample, NicheError::DataIntegrity { sample, reason }) => {
            warn!("Skipping sample '{sample}': {reason}");
            skipped.push(sample);
            Ok(())
        }
        (_, error) => Err(error),
    }
}
