//! Geometric signatures of realizing spot sets
//!
//! Instances sharing a label set can sit in different arrangements, such as
//! a closed triangle of spots or a bent run. A signature lists every spot
//! pair as its label pair and squared distance, sorted by distance and then
//! labels. It is unchanged by translation, rotation and reflection of the
//! instance and by the order its spots are listed in.

use std::collections::BTreeMap;

use crate::spatial::grid::GridTopology;
use crate::spatial::sample::ClusterId;

/// Spacing between two spots of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairSpacing {
    /// Squared distance in the topology's metric units
    pub squared_distance: u64,
    /// Labels of the two spots, smaller first
    pub labels: (ClusterId, ClusterId),
}

/// Sorted pairwise spacings of one instance
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeSignature(Vec<PairSpacing>);

impl ShapeSignature {
    /// Signature of labelled grid positions
    pub fn new(spots: &[(ClusterId, [i32; 2])], topology: &GridTopology) -> Self {
        let mut pairs = Vec::with_capacity(spots.len() * spots.len().saturating_sub(1) / 2);
        for (index, &(a, from)) in spots.iter().enumerate() {
            for &(b, to) in spots.iter().skip(index + 1) {
                pairs.push(PairSpacing {
                    squared_distance: topology.squared_distance(from, to),
                    labels: if a <= b { (a, b) } else { (b, a) },
                });
            }
        }
        pairs.sort_unstable();
        Self(pairs)
    }

    /// Spacings, shortest first
    pub const fn pairs(&self) -> &[PairSpacing] {
        self.0.as_slice()
    }
}

/// Realizing spot sets sharing one signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCount {
    /// Arrangement
    pub signature: ShapeSignature,
    /// Distinct spot sets with this arrangement
    pub instances: usize,
}

/// Count signatures, most frequent first, ties in signature order
pub fn tally<I>(signatures: I) -> Vec<ShapeCount>
where
    I: IntoIterator<Item = ShapeSignature>,
{
    let mut counts: BTreeMap<ShapeSignature, usize> = BTreeMap::new();
    for signature in signatures {
        *counts.entry(signature).or_insert(0) += 1;
    }

    let mut shapes: Vec<ShapeCount> = counts
        .into_iter()
        .map(|(signature, instances)| ShapeCount {
            signature,
            instances,
        })
        .collect();
    // Stable sort keeps the map's signature order among ties
    shapes.sort_by(|a, b| b.instances.cmp(&a.instances));
    shapes
}
