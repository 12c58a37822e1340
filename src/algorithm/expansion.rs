//! Order-by-order growth of significant structures
//!
//! Accepted pairs seed order 2; each later order extends only the structures
//! accepted at the order before it. Growth stops when an order accepts
//! nothing, or once the configured maximum order has been accepted.

use log::info;

use crate::algorithm::extraction::MotifExtractor;
use crate::algorithm::filter::{FilterOutcome, SignificanceFilter};
use crate::algorithm::structure::{Structure, StructureArena, StructureId};
use crate::analysis::adjacency::AdjacencyTable;
use crate::analysis::statistics::{FdrCorrection, SignificanceTest};
use crate::io::configuration::MIN_STRUCTURE_ORDER;
use crate::spatial::graph::NeighborGraph;

/// Structures accepted at one order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationResult {
    /// Number of labels of every structure in this result
    pub order: usize,
    /// Candidates the filter received
    pub candidates_evaluated: usize,
    /// Accepted structures in canonical order
    pub structures: Vec<StructureId>,
}

impl IterationResult {
    /// Whether nothing was accepted
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Number of accepted structures
    pub fn len(&self) -> usize {
        self.structures.len()
    }
}

/// Receives progress notifications from the expander
pub trait ExpansionObserver {
    /// Sample graphs are ready; `skipped` failed integrity checks
    fn graphs_built(&mut self, _built: usize, _skipped: usize) {}

    /// Extraction for `order` begins from `frontier` parents
    fn order_started(&mut self, _order: usize, _frontier: usize) {}

    /// An order has been filtered
    fn order_finished(&mut self, _result: &IterationResult) {}
}

impl ExpansionObserver for () {}

/// Everything the expander produced
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    /// Accepted structures
    pub arena: StructureArena,
    /// One result per processed order, ascending
    pub iterations: Vec<IterationResult>,
}

/// Drives extraction and filtering until nothing new survives
#[derive(Debug, Clone, Copy)]
pub struct IterativeExpander {
    extractor: MotifExtractor,
    pair_filter: SignificanceFilter,
    structure_filter: SignificanceFilter,
    max_order: Option<usize>,
}

impl IterativeExpander {
    /// Create an expander
    ///
    /// `pair_filter` gates order 2 and `structure_filter` every later order.
    pub const fn new(
        extractor: MotifExtractor,
        pair_filter: SignificanceFilter,
        structure_filter: SignificanceFilter,
        max_order: Option<usize>,
    ) -> Self {
        Self {
            extractor,
            pair_filter,
            structure_filter,
            max_order,
        }
    }

    /// Expand from the significant pairs of `adjacency`
    pub fn expand(
        &self,
        adjacency: &AdjacencyTable,
        graphs: &[NeighborGraph],
        test: &dyn SignificanceTest,
        fdr: &dyn FdrCorrection,
        observer: &mut dyn ExpansionObserver,
    ) -> Expansion {
        let mut expansion = Expansion::default();

        let mut order = MIN_STRUCTURE_ORDER;
        observer.order_started(order, adjacency.significant_count());
        let seeds = self.extractor.seed_pairs(graphs, adjacency.significant());
        let outcome = self
            .pair_filter
            .apply(seeds, test, fdr, &mut expansion.arena);
        let mut frontier = Self::record(&mut expansion, order, outcome, observer);

        while !frontier.is_empty() {
            if self.max_order.is_some_and(|max| order >= max) {
                info!("Reached maximum order {order}");
                break;
            }
            order += 1;
            observer.order_started(order, frontier.len());

            let candidates = {
                let parents: Vec<&Structure> = frontier
                    .iter()
                    .filter_map(|&id| expansion.arena.get(id))
                    .collect();
                self.extractor.extend_all(&parents, graphs)
            };
            let outcome = self
                .structure_filter
                .apply(candidates, test, fdr, &mut expansion.arena);
            frontier = Self::record(&mut expansion, order, outcome, observer);
        }

        expansion
    }

    fn record(
        expansion: &mut Expansion,
        order: usize,
        outcome: FilterOutcome,
        observer: &mut dyn ExpansionObserver,
    ) -> Vec<StructureId> {
        let structures: Vec<StructureId> = outcome
            .accepted
            .into_iter()
            .map(|evaluated| expansion.arena.accept(evaluated.candidate, evaluated.stats))
            .collect();

        info!(
            "Order {order}: {} of {} candidates accepted",
            structures.len(),
            outcome.evaluated
        );

        let result = IterationResult {
            order,
            candidates_evaluated: outcome.evaluated,
            structures: structures.clone(),
        };
        observer.order_finished(&result);
        expansion.iterations.push(result);
        structures
    }
}
