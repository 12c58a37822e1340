//! Structures, their per-sample realizations, and the interning arena
//!
//! A structure is a label tuple realized by connected spot sets. The tuple is
//! kept twice: in discovery order (parent labels first, then the label that
//! extended it) and in canonical sorted form, which identifies the structure
//! for deduplication.
//!
//! Every realization remembers the joining edge it was grown from. An
//! occurrence is one such seed edge that still extends into the full pattern,
//! so occurrence counts never exceed the parent's while every spot set that
//! realizes the pattern is kept.

use std::collections::HashMap;

use crate::algorithm::bitset::SpotSet;
use crate::analysis::statistics::GroupCounts;
use crate::spatial::graph::NeighborGraph;
use crate::spatial::sample::{ClusterId, GroupId, SampleId};

/// One connected spot set realizing a structure, as sorted graph node ids
pub type Instance = Box<[u32]>;

/// A realizing spot set tagged with the seed edge it grew from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Realization {
    /// Index of the seed edge among the pair's joining edges in the sample
    pub seed: u32,
    /// Realizing spots
    pub spots: Instance,
}

/// Identifier of an accepted structure, assigned in acceptance order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructureId(pub u32);

/// Identifier of an interned canonical label tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleId(pub u32);

/// Occurrence summary of a pattern in one sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOccurrence {
    /// Sample
    pub sample: SampleId,
    /// Group of the sample
    pub group: GroupId,
    /// Seed edges extending into the pattern
    pub occurrences: usize,
    /// Opportunities: parent occurrences, or graph edges for pairs
    pub trials: usize,
    /// Fraction of parent occurrences extending into the pattern
    pub coverage: f64,
}

/// Realizing instances of a pattern in one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInstances {
    /// Sample
    pub sample: SampleId,
    /// Sorted, distinct realizations
    pub instances: Vec<Realization>,
}

impl SampleInstances {
    /// Number of distinct seeds, which is the occurrence count
    pub fn seed_count(&self) -> usize {
        let mut seeds: Vec<u32> = self.instances.iter().map(|r| r.seed).collect();
        seeds.dedup();
        seeds.len()
    }

    /// Distinct realizing spot sets, ignoring seeds
    pub fn spot_sets(&self) -> Vec<&[u32]> {
        let mut sets: Vec<&[u32]> = self.instances.iter().map(|r| &*r.spots).collect();
        sets.sort_unstable();
        sets.dedup();
        sets
    }
}

/// A proposed structure awaiting significance filtering
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Labels in discovery order
    pub labels: Vec<ClusterId>,
    /// Labels sorted ascending
    pub canonical: Vec<ClusterId>,
    /// Structure this candidate extends; `None` for cluster pairs
    pub parent: Option<StructureId>,
    /// Per-sample occurrence for every sample of the compared groups
    pub samples: Vec<SampleOccurrence>,
    /// Realizing instances for samples where the pattern occurs
    pub instances: Vec<SampleInstances>,
    /// Aggregate coverage over the weighted samples
    pub coverage: f64,
    /// Mean occurrence count over the weighted samples
    pub mean_occurrence: f64,
}

impl Candidate {
    /// Number of labels
    pub fn order(&self) -> usize {
        self.labels.len()
    }

    /// Canonical enumeration order: labels, then lineage, then discovery order
    pub fn canonical_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical
            .cmp(&other.canonical)
            .then(self.parent.cmp(&other.parent))
            .then_with(|| self.labels.cmp(&other.labels))
    }
}

/// Statistics under which a structure was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct StructureStats {
    /// Hits and trials per group
    pub counts: GroupCounts,
    /// Focus rate over comparison rate
    pub fold_change: f64,
    /// Raw two-group p-value
    pub p_value: f64,
    /// Adjusted p-value within the structure's order
    pub adjusted_p: f64,
    /// Aggregate coverage
    pub coverage: f64,
    /// Fraction of focus samples in which the structure occurs
    pub prevalence: f64,
    /// Mean occurrence count over the weighted samples
    pub mean_occurrence: f64,
}

/// An accepted structure
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    /// Identifier
    pub id: StructureId,
    /// Interned canonical tuple
    pub tuple: TupleId,
    /// Labels in discovery order
    pub labels: Vec<ClusterId>,
    /// Labels sorted ascending
    pub canonical: Vec<ClusterId>,
    /// Parent structure, `None` for pairs
    pub parent: Option<StructureId>,
    /// Per-sample occurrence summary
    pub samples: Vec<SampleOccurrence>,
    /// Realizing instances per sample
    pub instances: Vec<SampleInstances>,
    /// Acceptance statistics
    pub stats: StructureStats,
}

impl Structure {
    /// Number of labels
    pub fn order(&self) -> usize {
        self.labels.len()
    }

    /// Realizations of the structure in one sample
    pub fn instances_in(&self, sample: SampleId) -> &[Realization] {
        self.instances
            .iter()
            .find(|s| s.sample == sample)
            .map_or(&[], |s| s.instances.as_slice())
    }

    /// Occurrence summary for one sample
    pub fn occurrence(&self, sample: SampleId) -> Option<&SampleOccurrence> {
        self.samples.iter().find(|s| s.sample == sample)
    }

    /// Union of all realizing spots in a sample's graph
    pub fn footprint(&self, graph: &NeighborGraph) -> SpotSet {
        let mut set = SpotSet::new(graph.node_count());
        for realization in self.instances_in(graph.sample()) {
            set.extend(&realization.spots);
        }
        set
    }
}

/// Interning statistics
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternStats {
    /// Lookups that found an existing tuple
    pub hits: usize,
    /// Lookups that allocated a new tuple
    pub misses: usize,
}

/// Arena owning every accepted structure and every interned label tuple
#[derive(Default, Debug, Clone)]
pub struct StructureArena {
    tuples: Vec<Box<[ClusterId]>>,
    lookup: HashMap<Box<[ClusterId]>, TupleId>,
    structures: Vec<Structure>,
    by_tuple: HashMap<TupleId, StructureId>,

    /// Interning performance counters
    pub stats: InternStats,
}

impl StructureArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a canonical tuple, returning its stable id
    pub fn intern(&mut self, canonical: &[ClusterId]) -> TupleId {
        if let Some(&id) = self.lookup.get(canonical) {
            self.stats.hits += 1;
            return id;
        }
        self.stats.misses += 1;
        let id = TupleId(self.tuples.len() as u32);
        let boxed: Box<[ClusterId]> = canonical.into();
        self.tuples.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    /// Resolve an interned tuple
    pub fn tuple(&self, id: TupleId) -> Option<&[ClusterId]> {
        self.tuples.get(id.0 as usize).map(AsRef::as_ref)
    }

    /// Store an accepted candidate and return its id
    pub fn accept(&mut self, candidate: Candidate, stats: StructureStats) -> StructureId {
        let tuple = self.intern(&candidate.canonical);
        let id = StructureId(self.structures.len() as u32);
        self.structures.push(Structure {
            id,
            tuple,
            labels: candidate.labels,
            canonical: candidate.canonical,
            parent: candidate.parent,
            samples: candidate.samples,
            instances: candidate.instances,
            stats,
        });
        self.by_tuple.entry(tuple).or_insert(id);
        id
    }

    /// Accepted structure by id
    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id.0 as usize)
    }

    /// Accepted structure with the given canonical labels
    pub fn find(&self, canonical: &[ClusterId]) -> Option<&Structure> {
        let tuple = self.lookup.get(canonical)?;
        let id = self.by_tuple.get(tuple)?;
        self.get(*id)
    }

    /// Ancestry of a structure, root pair first
    pub fn lineage(&self, id: StructureId) -> Vec<StructureId> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id);
        while let Some(structure) = cursor {
            chain.push(structure.id);
            cursor = structure.parent.and_then(|p| self.get(p));
        }
        chain.reverse();
        chain
    }

    /// Every accepted structure in acceptance order
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Number of accepted structures
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// Whether nothing has been accepted
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}
