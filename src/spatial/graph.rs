//! Immutable per-sample neighbor graph in compressed adjacency form

use crate::spatial::sample::{ClusterId, GroupId, SampleId};

/// Undirected graph over the spots of one sample
///
/// Nodes are numbered `0..node_count()` in the sample's input order. Each
/// node keeps its table index and cluster label so motif counting never has
/// to go back to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborGraph {
    sample: SampleId,
    group: GroupId,
    spots: Vec<usize>,
    labels: Vec<ClusterId>,
    offsets: Vec<usize>,
    targets: Vec<u32>,
}

impl NeighborGraph {
    /// Assemble a graph from per-node neighbor lists
    ///
    /// Neighbor lists are sorted and deduplicated; self loops are dropped.
    pub fn from_adjacency(
        sample: SampleId,
        group: GroupId,
        spots: Vec<usize>,
        labels: Vec<ClusterId>,
        adjacency: Vec<Vec<u32>>,
    ) -> Self {
        let mut offsets = Vec::with_capacity(adjacency.len() + 1);
        let mut targets = Vec::new();
        offsets.push(0);

        for (node, mut list) in adjacency.into_iter().enumerate() {
            list.sort_unstable();
            list.dedup();
            targets.extend(list.into_iter().filter(|&n| n as usize != node));
            offsets.push(targets.len());
        }

        Self {
            sample,
            group,
            spots,
            labels,
            offsets,
            targets,
        }
    }

    /// Sample this graph was built for
    pub const fn sample(&self) -> SampleId {
        self.sample
    }

    /// Group of the sample
    pub const fn group(&self) -> GroupId {
        self.group
    }

    /// Number of spots
    pub const fn node_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of undirected edges
    pub const fn edge_count(&self) -> usize {
        self.targets.len() / 2
    }

    /// Sorted neighbors of a node
    pub fn neighbors(&self, node: u32) -> &[u32] {
        let node = node as usize;
        match (self.offsets.get(node), self.offsets.get(node + 1)) {
            (Some(&start), Some(&end)) => self.targets.get(start..end).unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Cluster label of a node
    pub fn label(&self, node: u32) -> Option<ClusterId> {
        self.labels.get(node as usize).copied()
    }

    /// Cluster labels of all nodes
    pub fn labels(&self) -> &[ClusterId] {
        &self.labels
    }

    /// Table index of a node
    pub fn spot_index(&self, node: u32) -> Option<usize> {
        self.spots.get(node as usize).copied()
    }

    /// Every undirected edge once, as `(u, v)` with `u < v`
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.node_count() as u32).flat_map(move |u| {
            self.neighbors(u)
                .iter()
                .copied()
                .filter(move |&v| u < v)
                .map(move |v| (u, v))
        })
    }

    /// Number of spots per cluster id
    pub fn label_counts(&self, cluster_count: usize) -> Vec<usize> {
        let mut counts = vec![0; cluster_count];
        for label in &self.labels {
            if let Some(count) = counts.get_mut(label.0 as usize) {
                *count += 1;
            }
        }
        counts
    }
}
