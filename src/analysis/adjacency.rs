//! Groupwise comparison of cluster-pair adjacency
//!
//! Counts, for every unordered cluster pair, the neighbor-graph edges joining
//! the two clusters in each sample, then compares the focus group against the
//! comparison group. Alongside the pair table it keeps the per-group mean
//! adjacency matrices that heatmap renderers consume.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;

use crate::analysis::statistics::{FdrCorrection, GroupCounts, SignificanceTest};
use crate::spatial::graph::NeighborGraph;
use crate::spatial::sample::{ClusterId, GroupId};

/// Unordered cluster pair with its groupwise statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyPair {
    /// Lower cluster id of the pair
    pub first: ClusterId,
    /// Higher (or equal) cluster id of the pair
    pub second: ClusterId,
    /// Edge counts and trials per group
    pub counts: GroupCounts,
    /// Focus adjacency rate over comparison adjacency rate
    pub fold: f64,
    /// Raw two-group p-value
    pub p_value: f64,
    /// Multiple-testing adjusted p-value across the whole table
    pub adjusted_p: f64,
}

impl AdjacencyPair {
    /// Edges joining the pair across focus samples
    pub const fn focus_count(&self) -> u64 {
        self.counts.focus_hits
    }

    /// Edges joining the pair across comparison samples
    pub const fn comparison_count(&self) -> u64 {
        self.counts.other_hits
    }

    /// Both ends carry the same cluster
    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }

    /// Observed only in the focus group
    pub const fn is_focus_exclusive(&self) -> bool {
        self.counts.is_focus_exclusive()
    }

    /// The pair as a label tuple
    pub const fn labels(&self) -> [ClusterId; 2] {
        [self.first, self.second]
    }
}

/// Thresholds defining the significant pair subset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyThresholds {
    /// Minimum fold
    pub enrichment_fold: f64,
    /// Maximum raw p-value (waived for focus-exclusive pairs)
    pub p_threshold: f64,
}

/// Full pair table, significant subset and group mean matrices
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyTable {
    pairs: Vec<AdjacencyPair>,
    significant: Vec<usize>,
    focus_matrix: Array2<f64>,
    comparison_matrix: Array2<f64>,
}

impl AdjacencyTable {
    /// Every pair observed in either group, sorted by `(first, second)`
    pub fn pairs(&self) -> &[AdjacencyPair] {
        &self.pairs
    }

    /// Pairs passing the fold and p-value thresholds, excluding self pairs
    pub fn significant(&self) -> impl Iterator<Item = &AdjacencyPair> + '_ {
        self.significant.iter().filter_map(|&i| self.pairs.get(i))
    }

    /// Size of the significant subset
    pub const fn significant_count(&self) -> usize {
        self.significant.len()
    }

    /// Look up a pair regardless of label order
    pub fn pair(&self, a: ClusterId, b: ClusterId) -> Option<&AdjacencyPair> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.pairs
            .binary_search_by(|p| (p.first, p.second).cmp(&key))
            .ok()
            .and_then(|i| self.pairs.get(i))
    }

    /// Mean per-spot neighbor counts (source row, target column) in focus samples
    pub const fn focus_matrix(&self) -> &Array2<f64> {
        &self.focus_matrix
    }

    /// Mean per-spot neighbor counts in comparison samples
    pub const fn comparison_matrix(&self) -> &Array2<f64> {
        &self.comparison_matrix
    }

    /// Focus minus comparison matrix with the diagonal zeroed
    pub fn difference_matrix(&self) -> Array2<f64> {
        let mut diff = &self.focus_matrix - &self.comparison_matrix;
        diff.diag_mut().fill(0.0);
        diff
    }
}

/// Per-sample edge tallies feeding the group comparison
struct SampleAdjacency {
    is_focus: bool,
    edges: u64,
    pair_counts: BTreeMap<(ClusterId, ClusterId), u64>,
    neighbor_rates: Array2<f64>,
}

/// Compares cluster-pair adjacency between a focus and a comparison group
#[derive(Debug, Clone, Copy)]
pub struct GroupwiseAdjacencyAnalyzer {
    focus: GroupId,
    comparison: GroupId,
    thresholds: AdjacencyThresholds,
}

impl GroupwiseAdjacencyAnalyzer {
    /// Create an analyzer for a group pair
    pub const fn new(focus: GroupId, comparison: GroupId, thresholds: AdjacencyThresholds) -> Self {
        Self {
            focus,
            comparison,
            thresholds,
        }
    }

    /// Count, test and correct every observed cluster pair
    ///
    /// Graphs of samples outside the two groups are ignored. Pairs with no
    /// edge in either group never enter the table.
    pub fn analyze(
        &self,
        graphs: &[NeighborGraph],
        cluster_count: usize,
        test: &dyn SignificanceTest,
        fdr: &dyn FdrCorrection,
    ) -> AdjacencyTable {
        let samples: Vec<SampleAdjacency> = graphs
            .par_iter()
            .filter(|g| g.group() == self.focus || g.group() == self.comparison)
            .map(|g| Self::tally(g, g.group() == self.focus, cluster_count))
            .collect();

        let keys: BTreeSet<(ClusterId, ClusterId)> = samples
            .iter()
            .flat_map(|s| s.pair_counts.keys().copied())
            .collect();

        let mut pairs: Vec<AdjacencyPair> = keys
            .into_iter()
            .map(|(first, second)| {
                let mut counts = GroupCounts::default();
                for sample in &samples {
                    let hits = sample
                        .pair_counts
                        .get(&(first, second))
                        .copied()
                        .unwrap_or(0);
                    counts.add_sample(sample.is_focus, hits, sample.edges);
                }
                let fold = counts.fold_change();
                let p_value = test.p_value(&counts).unwrap_or(1.0);
                AdjacencyPair {
                    first,
                    second,
                    counts,
                    fold,
                    p_value,
                    adjusted_p: p_value,
                }
            })
            .collect();

        let raw: Vec<f64> = pairs.iter().map(|p| p.p_value).collect();
        for (pair, adjusted) in pairs.iter_mut().zip(fdr.adjust(&raw)) {
            pair.adjusted_p = adjusted.max(pair.p_value);
        }

        let significant: Vec<usize> = pairs
            .iter()
            .enumerate()
            .filter(|(_, p)| self.is_significant(p))
            .map(|(i, _)| i)
            .collect();

        let focus_matrix = Self::mean_matrix(&samples, true, cluster_count);
        let comparison_matrix = Self::mean_matrix(&samples, false, cluster_count);

        info!(
            "Adjacency: {} pairs observed across {} samples, {} significant ({} / {})",
            pairs.len(),
            samples.len(),
            significant.len(),
            test.name(),
            fdr.name()
        );

        AdjacencyTable {
            pairs,
            significant,
            focus_matrix,
            comparison_matrix,
        }
    }

    fn is_significant(&self, pair: &AdjacencyPair) -> bool {
        if pair.is_self_pair() || pair.fold < self.thresholds.enrichment_fold {
            return false;
        }
        pair.is_focus_exclusive() || pair.p_value <= self.thresholds.p_threshold
    }

    fn tally(graph: &NeighborGraph, is_focus: bool, cluster_count: usize) -> SampleAdjacency {
        let mut pair_counts = BTreeMap::new();
        let mut directed = Array2::<f64>::zeros((cluster_count, cluster_count));
        let mut edges = 0u64;

        for (u, v) in graph.edges() {
            let (Some(a), Some(b)) = (graph.label(u), graph.label(v)) else {
                continue;
            };
            edges += 1;
            let key = if a <= b { (a, b) } else { (b, a) };
            *pair_counts.entry(key).or_insert(0) += 1;

            let (ai, bi) = (a.0 as usize, b.0 as usize);
            if let Some(cell) = directed.get_mut([ai, bi]) {
                *cell += 1.0;
            }
            if let Some(cell) = directed.get_mut([bi, ai]) {
                *cell += 1.0;
            }
        }

        for (cluster, &spots) in graph.label_counts(cluster_count).iter().enumerate() {
            if spots > 0 && cluster < cluster_count {
                let mut row = directed.row_mut(cluster);
                row /= spots as f64;
            }
        }

        debug!(
            "Sample {:?}: {} edges, {} distinct pairs",
            graph.sample(),
            edges,
            pair_counts.len()
        );

        SampleAdjacency {
            is_focus,
            edges,
            pair_counts,
            neighbor_rates: directed,
        }
    }

    fn mean_matrix(samples: &[SampleAdjacency], focus: bool, cluster_count: usize) -> Array2<f64> {
        let mut total = Array2::<f64>::zeros((cluster_count, cluster_count));
        let mut n = 0usize;
        for sample in samples.iter().filter(|s| s.is_focus == focus) {
            total += &sample.neighbor_rates;
            n += 1;
        }
        if n > 0 {
            total /= n as f64;
        }
        total
    }
}
