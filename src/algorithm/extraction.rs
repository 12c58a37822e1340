//! Enumeration of candidate structures over the neighbor graphs
//!
//! Order-2 candidates are the significant cluster pairs, realized by the
//! edges joining them; each edge seeds one occurrence. A structure of order k
//! grows into order k + 1 by attaching one more adjacent spot to each of its
//! realizations. Every neighbor carrying the new label yields a child spot
//! set, and all of them are kept under the seed of the realization they
//! extend. A child occurs once per seed that extends at all, so coverage
//! stays a ratio and the realizing spots do not depend on node numbering.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rayon::prelude::*;

use crate::algorithm::structure::{
    Candidate, Realization, SampleInstances, SampleOccurrence, Structure, StructureId,
};
use crate::analysis::adjacency::AdjacencyPair;
use crate::io::configuration::CoverageWeighting;
use crate::math::probability::mean;
use crate::spatial::graph::NeighborGraph;
use crate::spatial::sample::{ClusterId, GroupId};

/// Child realizations of one sample, keyed by the label that extended them
type SampleExtensions = BTreeMap<ClusterId, BTreeSet<Realization>>;

/// Enumerates pattern candidates and their per-sample occurrences
#[derive(Debug, Clone, Copy)]
pub struct MotifExtractor {
    focus: GroupId,
    comparison: GroupId,
    weighting: CoverageWeighting,
    distinct_labels: bool,
}

impl MotifExtractor {
    /// Create an extractor for a focus/comparison group pair
    pub const fn new(
        focus: GroupId,
        comparison: GroupId,
        weighting: CoverageWeighting,
        distinct_labels: bool,
    ) -> Self {
        Self {
            focus,
            comparison,
            weighting,
            distinct_labels,
        }
    }

    /// Order-2 candidates, one per pair, realized by joining edges
    ///
    /// A sample's trials are all of its edges; its coverage is 1 when the
    /// pair occurs there and 0 otherwise.
    pub fn seed_pairs<'p>(
        &self,
        graphs: &[NeighborGraph],
        pairs: impl IntoIterator<Item = &'p AdjacencyPair>,
    ) -> Vec<Candidate> {
        let scoped: Vec<&NeighborGraph> = self.scoped(graphs).collect();

        let mut candidates: Vec<Candidate> = pairs
            .into_iter()
            .filter(|pair| !(self.distinct_labels && pair.is_self_pair()))
            .map(|pair| {
                let per_sample: Vec<(SampleOccurrence, Vec<Realization>)> = scoped
                    .par_iter()
                    .map(|graph| {
                        let instances = pair_instances(graph, pair.first, pair.second);
                        let occurrences = instances.len();
                        let occurrence = SampleOccurrence {
                            sample: graph.sample(),
                            group: graph.group(),
                            occurrences,
                            trials: graph.edge_count(),
                            coverage: if occurrences > 0 { 1.0 } else { 0.0 },
                        };
                        (occurrence, instances)
                    })
                    .collect();
                self.assemble(pair.labels().to_vec(), None, per_sample)
            })
            .collect();

        candidates.sort_by(Candidate::canonical_cmp);
        candidates
    }

    /// Order-(k+1) candidates grown from one structure
    pub fn extend(&self, structure: &Structure, graphs: &[NeighborGraph]) -> Vec<Candidate> {
        let scoped: Vec<&NeighborGraph> = self.scoped(graphs).collect();

        let per_sample: Vec<SampleExtensions> = scoped
            .par_iter()
            .map(|graph| self.extend_in(structure, graph))
            .collect();

        let new_labels: BTreeSet<ClusterId> = per_sample
            .iter()
            .flat_map(|extensions| extensions.keys().copied())
            .collect();

        let candidates: Vec<Candidate> = new_labels
            .into_iter()
            .map(|label| {
                let rows = scoped
                    .iter()
                    .zip(&per_sample)
                    .map(|(graph, extensions)| {
                        let instances: Vec<Realization> = extensions
                            .get(&label)
                            .map(|set| set.iter().cloned().collect())
                            .unwrap_or_default();
                        let trials = structure
                            .occurrence(graph.sample())
                            .map_or(0, |o| o.occurrences);
                        let mut seeds: Vec<u32> = instances.iter().map(|r| r.seed).collect();
                        seeds.dedup();
                        let occurrences = seeds.len();
                        let occurrence = SampleOccurrence {
                            sample: graph.sample(),
                            group: graph.group(),
                            occurrences,
                            trials,
                            coverage: if trials > 0 {
                                occurrences as f64 / trials as f64
                            } else {
                                0.0
                            },
                        };
                        (occurrence, instances)
                    })
                    .collect();

                let mut labels = structure.labels.clone();
                labels.push(label);
                self.assemble(labels, Some(structure.id), rows)
            })
            .collect();

        debug!(
            "Structure {:?} {:?}: {} extension candidates",
            structure.id,
            structure.labels,
            candidates.len()
        );
        candidates
    }

    /// Candidates grown from every structure of a frontier, in canonical order
    pub fn extend_all(&self, frontier: &[&Structure], graphs: &[NeighborGraph]) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = frontier
            .par_iter()
            .map(|structure| self.extend(structure, graphs))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        candidates.sort_by(Candidate::canonical_cmp);
        candidates
    }

    fn scoped<'g>(&self, graphs: &'g [NeighborGraph]) -> impl Iterator<Item = &'g NeighborGraph> {
        let (focus, comparison) = (self.focus, self.comparison);
        graphs
            .iter()
            .filter(move |g| g.group() == focus || g.group() == comparison)
    }

    /// Extend every realization of `structure` in one graph
    fn extend_in(&self, structure: &Structure, graph: &NeighborGraph) -> SampleExtensions {
        let mut extensions = SampleExtensions::new();

        for realization in structure.instances_in(graph.sample()) {
            let spots: &[u32] = &realization.spots;
            for &node in spots {
                for &neighbor in graph.neighbors(node) {
                    if spots.binary_search(&neighbor).is_ok() {
                        continue;
                    }
                    let Some(label) = graph.label(neighbor) else {
                        continue;
                    };
                    if self.distinct_labels && structure.labels.contains(&label) {
                        continue;
                    }
                    let mut child: Vec<u32> = spots.to_vec();
                    if let Err(position) = child.binary_search(&neighbor) {
                        child.insert(position, neighbor);
                    }
                    extensions.entry(label).or_default().insert(Realization {
                        seed: realization.seed,
                        spots: child.into_boxed_slice(),
                    });
                }
            }
        }

        extensions
    }

    /// Build a candidate from per-sample rows, aggregating coverage
    fn assemble(
        &self,
        labels: Vec<ClusterId>,
        parent: Option<StructureId>,
        rows: Vec<(SampleOccurrence, Vec<Realization>)>,
    ) -> Candidate {
        let mut canonical = labels.clone();
        canonical.sort_unstable();

        let weighted: Vec<&SampleOccurrence> = rows
            .iter()
            .map(|(occurrence, _)| occurrence)
            .filter(|o| self.is_weighted(o.group))
            .collect();

        let coverages: Vec<f64> = weighted
            .iter()
            .filter(|o| o.trials > 0)
            .map(|o| o.coverage)
            .collect();
        let counts: Vec<usize> = weighted.iter().map(|o| o.occurrences).collect();
        let coverage = mean(&coverages).unwrap_or(0.0);
        let mean_occurrence = mean(&counts).unwrap_or(0.0);

        let mut samples = Vec::with_capacity(rows.len());
        let mut instances = Vec::new();
        for (occurrence, sample_instances) in rows {
            if !sample_instances.is_empty() {
                instances.push(SampleInstances {
                    sample: occurrence.sample,
                    instances: sample_instances,
                });
            }
            samples.push(occurrence);
        }

        Candidate {
            labels,
            canonical,
            parent,
            samples,
            instances,
            coverage,
            mean_occurrence,
        }
    }

    fn is_weighted(&self, group: GroupId) -> bool {
        match self.weighting {
            CoverageWeighting::FocusGroup => group == self.focus,
            CoverageWeighting::AllSamples => group == self.focus || group == self.comparison,
        }
    }
}

/// Edges joining clusters `a` and `b`, each seeding its own realization
fn pair_instances(graph: &NeighborGraph, a: ClusterId, b: ClusterId) -> Vec<Realization> {
    graph
        .edges()
        .filter(|&(u, v)| match (graph.label(u), graph.label(v)) {
            (Some(lu), Some(lv)) => (lu == a && lv == b) || (lu == b && lv == a),
            _ => false,
        })
        .enumerate()
        .map(|(seed, (u, v))| Realization {
            seed: seed as u32,
            spots: vec![u, v].into_boxed_slice(),
        })
        .collect()
}
