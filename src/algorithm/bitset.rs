use bitvec::prelude::*;
use std::fmt;

/// Fixed-size bitset over the nodes of one sample's neighbor graph
///
/// Used for niche footprints: the union of every spot realizing a structure
/// in a sample. Indices are 0-based graph node ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpotSet {
    bits: BitVec,
}

impl SpotSet {
    /// Create a set with no spots present
    pub fn new(node_count: usize) -> Self {
        Self {
            bits: bitvec![0; node_count],
        }
    }

    /// Create a set containing every spot
    pub fn all(node_count: usize) -> Self {
        Self {
            bits: bitvec![1; node_count],
        }
    }

    /// Insert a node; out-of-range nodes are ignored
    pub fn insert(&mut self, node: u32) {
        let index = node as usize;
        if index < self.bits.len() {
            self.bits.set(index, true);
        }
    }

    /// Insert every node of an instance
    pub fn extend(&mut self, nodes: &[u32]) {
        for &node in nodes {
            self.insert(node);
        }
    }

    /// Test node membership
    pub fn contains(&self, node: u32) -> bool {
        self.bits.get(node as usize).as_deref() == Some(&true)
    }

    /// Union this set with another in-place
    pub fn union_with(&mut self, other: &Self) {
        self.bits |= &other.bits;
    }

    /// Nodes of `self` not in `other`
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for index in other.bits.iter_ones() {
            if index < result.bits.len() {
                result.bits.set(index, false);
            }
        }
        result
    }

    /// Test if no spots are present
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Count spots in the set
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Extract all node ids in ascending order
    pub fn to_vec(&self) -> Vec<u32> {
        self.bits.iter_ones().map(|index| index as u32).collect()
    }
}

impl fmt::Display for SpotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpotSet({} spots: {:?})", self.count(), self.to_vec())
    }
}
