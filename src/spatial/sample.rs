//! Spot records, interned labels and per-sample grouping
//!
//! Labels are interned into dense ids assigned in lexicographic order, so
//! sorting by id is the same as sorting by label text. This keeps every
//! downstream enumeration reproducible.

use std::collections::BTreeMap;

use crate::io::error::{NicheError, Result, integrity_error};

/// Interned cluster label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(pub u32);

/// Interned group label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u32);

/// Interned sample identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleId(pub u32);

/// Sorted, deduplicated label vocabulary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    names: Vec<String>,
    index: BTreeMap<String, u32>,
}

impl Labels {
    /// Build a vocabulary from arbitrary label text
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<String> = names.into_iter().map(str::to_string).collect();
        sorted.sort();
        sorted.dedup();

        let index = sorted
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as u32))
            .collect();

        Self {
            names: sorted,
            index,
        }
    }

    /// Look up the dense id of a label
    pub fn id(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    /// Resolve a dense id back to its label
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of distinct labels
    pub const fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the vocabulary is empty
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All labels in id order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Raw per-spot record before interning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotRecord {
    /// Spot identity (barcode)
    pub barcode: String,
    /// Grid row
    pub row: i32,
    /// Grid column
    pub col: i32,
    /// Sample identifier
    pub sample: String,
    /// Cluster label
    pub cluster: String,
    /// Group label
    pub group: String,
}

/// One spatial measurement location with interned labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spot {
    /// Spot identity
    pub barcode: String,
    /// Grid coordinate (row, col)
    pub position: [i32; 2],
    /// Owning sample
    pub sample: SampleId,
    /// Cluster label
    pub cluster: ClusterId,
    /// Group label
    pub group: GroupId,
}

/// Spots sharing a sample identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Sample id
    pub id: SampleId,
    /// Group every spot of this sample belongs to
    pub group: GroupId,
    /// Indices into the owning table's spot list, in input order
    pub spots: Vec<usize>,
}

/// Immutable collection of all spots with their label vocabularies
#[derive(Debug, Clone, Default)]
pub struct SpotTable {
    spots: Vec<Spot>,
    clusters: Labels,
    groups: Labels,
    samples: Labels,
}

impl SpotTable {
    /// Intern raw records into a table
    pub fn from_records(records: &[SpotRecord]) -> Self {
        let clusters = Labels::from_names(records.iter().map(|r| r.cluster.as_str()));
        let groups = Labels::from_names(records.iter().map(|r| r.group.as_str()));
        let samples = Labels::from_names(records.iter().map(|r| r.sample.as_str()));

        let spots = records
            .iter()
            .map(|r| Spot {
                barcode: r.barcode.clone(),
                position: [r.row, r.col],
                sample: SampleId(samples.id(&r.sample).unwrap_or_default()),
                cluster: ClusterId(clusters.id(&r.cluster).unwrap_or_default()),
                group: GroupId(groups.id(&r.group).unwrap_or_default()),
            })
            .collect();

        Self {
            spots,
            clusters,
            groups,
            samples,
        }
    }

    /// All spots in input order
    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    /// Spot at a table index
    pub fn spot(&self, index: usize) -> Option<&Spot> {
        self.spots.get(index)
    }

    /// Cluster vocabulary
    pub const fn clusters(&self) -> &Labels {
        &self.clusters
    }

    /// Group vocabulary
    pub const fn groups(&self) -> &Labels {
        &self.groups
    }

    /// Sample vocabulary
    pub const fn samples(&self) -> &Labels {
        &self.samples
    }

    /// Label text for a cluster id
    pub fn cluster_name(&self, id: ClusterId) -> &str {
        self.clusters.name(id.0).unwrap_or("?")
    }

    /// Label text for a group id
    pub fn group_name(&self, id: GroupId) -> &str {
        self.groups.name(id.0).unwrap_or("?")
    }

    /// Label text for a sample id
    pub fn sample_name(&self, id: SampleId) -> &str {
        self.samples.name(id.0).unwrap_or("?")
    }

    /// Resolve a group label
    ///
    /// # Errors
    ///
    /// Returns `UnknownLabel` if no spot carries the group label
    pub fn group_id(&self, name: &str) -> Result<GroupId> {
        self.groups
            .id(name)
            .map(GroupId)
            .ok_or_else(|| NicheError::UnknownLabel {
                kind: "group",
                label: name.to_string(),
            })
    }

    /// Resolve a cluster label
    ///
    /// # Errors
    ///
    /// Returns `UnknownLabel` if no spot carries the cluster label
    pub fn cluster_id(&self, name: &str) -> Result<ClusterId> {
        self.clusters
            .id(name)
            .map(ClusterId)
            .ok_or_else(|| NicheError::UnknownLabel {
                kind: "cluster",
                label: name.to_string(),
            })
    }

    /// Partition spots into samples, ordered by sample id
    ///
    /// Each entry is either a valid sample or the integrity error for that
    /// sample, so callers can decide whether to skip or abort.
    pub fn partition_samples(&self) -> Vec<std::result::Result<Sample, NicheError>> {
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); self.samples.len()];
        for (index, spot) in self.spots.iter().enumerate() {
            if let Some(list) = members.get_mut(spot.sample.0 as usize) {
                list.push(index);
            }
        }

        members
            .into_iter()
            .enumerate()
            .map(|(sample_index, spots)| {
                let id = SampleId(sample_index as u32);
                let mut groups: Vec<GroupId> = spots
                    .iter()
                    .filter_map(|&i| self.spots.get(i).map(|s| s.group))
                    .collect();
                groups.sort_unstable();
                groups.dedup();

                match groups.as_slice() {
                    [group] => Ok(Sample {
                        id,
                        group: *group,
                        spots,
                    }),
                    [] => Err(integrity_error(self.sample_name(id), &"sample has no spots")),
                    _ => {
                        let names: Vec<&str> =
                            groups.iter().map(|&g| self.group_name(g)).collect();
                        Err(integrity_error(
                            self.sample_name(id),
                            &format!("spots carry several group labels: {}", names.join(", ")),
                        ))
                    }
                }
            })
            .collect()
    }
}
