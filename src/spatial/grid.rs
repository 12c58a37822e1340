//! Grid topology and per-sample neighbor graph construction
//!
//! Spots are placed on a dense lookup grid spanning the sample's bounding
//! box, then each spot probes the topology's fixed offsets. Offsets that land
//! outside the box or on an empty cell simply produce no edge.

use ndarray::Array2;
use rayon::prelude::*;

use crate::io::configuration::MAX_GRID_DIMENSION;
use crate::io::error::{NicheError, Result, integrity_error, invalid_parameter};
use crate::spatial::graph::NeighborGraph;
use crate::spatial::sample::{Sample, SpotTable};

/// Neighbor offsets defining grid adjacency
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GridTopology {
    /// Visium doubled-column hexagonal array: (0,±2), (±1,±1)
    #[default]
    Hexagonal,
    /// Hexagonal offsets plus vertical (±1,0), as used by older pipelines
    VisiumLegacy,
    /// Von Neumann neighborhood on a square grid
    Square4,
    /// Moore neighborhood on a square grid
    Square8,
    /// Caller-supplied symmetric offsets as `[d_row, d_col]`
    Custom(Vec<[i32; 2]>),
}

impl GridTopology {
    /// Offsets probed from every spot
    pub fn offsets(&self) -> Vec<[i32; 2]> {
        match self {
            Self::Hexagonal => vec![[0, -2], [0, 2], [-1, -1], [-1, 1], [1, -1], [1, 1]],
            Self::VisiumLegacy => vec![
                [-1, 0],
                [1, 0],
                [0, -2],
                [0, 2],
                [-1, -1],
                [1, -1],
                [-1, 1],
                [1, 1],
            ],
            Self::Square4 => vec![[-1, 0], [1, 0], [0, -1], [0, 1]],
            Self::Square8 => vec![
                [-1, -1],
                [-1, 0],
                [-1, 1],
                [0, -1],
                [0, 1],
                [1, -1],
                [1, 0],
                [1, 1],
            ],
            Self::Custom(offsets) => offsets.clone(),
        }
    }

    /// Squared Euclidean distance between two grid positions
    ///
    /// Hexagonal layouts address spots by doubled columns, so a column step
    /// is half a spot pitch and a row step √3/2 of one. Their distances are
    /// scaled by 4 to stay integral, which puts direct neighbors at 4. Square
    /// and custom layouts use plain grid units.
    pub fn squared_distance(&self, a: [i32; 2], b: [i32; 2]) -> u64 {
        let rows = (i64::from(a[0]) - i64::from(b[0])).unsigned_abs();
        let cols = (i64::from(a[1]) - i64::from(b[1])).unsigned_abs();
        match self {
            Self::Hexagonal | Self::VisiumLegacy => cols * cols + 3 * rows * rows,
            Self::Square4 | Self::Square8 | Self::Custom(_) => rows * rows + cols * cols,
        }
    }

    /// Squared spot pitch in the units of [`Self::squared_distance`]
    pub const fn unit_squared(&self) -> u64 {
        match self {
            Self::Hexagonal | Self::VisiumLegacy => 4,
            Self::Square4 | Self::Square8 | Self::Custom(_) => 1,
        }
    }

    /// Check that the offsets describe an undirected neighborhood
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an empty offset set, a zero offset, or
    /// an offset whose mirror image is missing
    pub fn validate(&self) -> Result<()> {
        let offsets = self.offsets();
        if offsets.is_empty() {
            return Err(invalid_parameter(
                "topology",
                &"[]",
                &"at least one neighbor offset is required",
            ));
        }
        for offset in &offsets {
            if *offset == [0, 0] {
                return Err(invalid_parameter(
                    "topology",
                    &format!("{offset:?}"),
                    &"a spot cannot neighbor itself",
                ));
            }
            if !offsets.contains(&[-offset[0], -offset[1]]) {
                return Err(invalid_parameter(
                    "topology",
                    &format!("{offset:?}"),
                    &"offsets must be symmetric",
                ));
            }
        }
        Ok(())
    }

    /// Parse a topology name
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an unrecognised name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hexagonal" | "hex" => Ok(Self::Hexagonal),
            "visium-legacy" | "legacy" => Ok(Self::VisiumLegacy),
            "square4" => Ok(Self::Square4),
            "square8" => Ok(Self::Square8),
            other => Err(invalid_parameter(
                "topology",
                &other,
                &"expected hexagonal, visium-legacy, square4 or square8",
            )),
        }
    }
}

/// Axis-aligned bounding box over grid coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    /// Minimum coordinates (inclusive)
    pub min: [i32; 2],
    /// Maximum coordinates (inclusive)
    pub max: [i32; 2],
}

impl BoundingBox {
    /// Smallest box containing every position, or `None` when empty
    pub fn enclosing<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = [i32; 2]>,
    {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self { min: p, max: p },
                Some(b) => Self {
                    min: [b.min[0].min(p[0]), b.min[1].min(p[1])],
                    max: [b.max[0].max(p[0]), b.max[1].max(p[1])],
                },
            })
        })
    }

    /// Check if a position is within the bounds
    pub const fn contains(&self, pos: [i32; 2]) -> bool {
        pos[0] >= self.min[0]
            && pos[0] <= self.max[0]
            && pos[1] >= self.min[1]
            && pos[1] <= self.max[1]
    }

    /// Extent as (rows, cols)
    pub fn extent(&self) -> (usize, usize) {
        let rows = i64::from(self.max[0]) - i64::from(self.min[0]) + 1;
        let cols = i64::from(self.max[1]) - i64::from(self.min[1]) + 1;
        (
            usize::try_from(rows).unwrap_or(usize::MAX),
            usize::try_from(cols).unwrap_or(usize::MAX),
        )
    }

    /// Lookup-grid index of a contained position
    fn index(&self, pos: [i32; 2]) -> Option<[usize; 2]> {
        if !self.contains(pos) {
            return None;
        }
        let row = usize::try_from(i64::from(pos[0]) - i64::from(self.min[0])).ok()?;
        let col = usize::try_from(i64::from(pos[1]) - i64::from(self.min[1])).ok()?;
        Some([row, col])
    }
}

/// Builds neighbor graphs from spot grid coordinates
#[derive(Debug, Clone, Default)]
pub struct SpatialGraphBuilder {
    topology: GridTopology,
}

impl SpatialGraphBuilder {
    /// Create a builder for the given topology
    pub const fn new(topology: GridTopology) -> Self {
        Self { topology }
    }

    /// Topology used by this builder
    pub const fn topology(&self) -> &GridTopology {
        &self.topology
    }

    /// Build the neighbor graph of one sample
    ///
    /// # Errors
    ///
    /// Returns `DataIntegrity` when two spots share a coordinate or the
    /// sample's coordinate span exceeds `MAX_GRID_DIMENSION`
    pub fn build(&self, table: &SpotTable, sample: &Sample) -> Result<NeighborGraph> {
        let sample_name = table.sample_name(sample.id);
        let spots: Vec<_> = sample
            .spots
            .iter()
            .filter_map(|&i| table.spot(i))
            .collect();

        let labels = spots.iter().map(|s| s.cluster).collect();
        let Some(bounds) = BoundingBox::enclosing(spots.iter().map(|s| s.position)) else {
            return Ok(NeighborGraph::from_adjacency(
                sample.id,
                sample.group,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ));
        };

        let (rows, cols) = bounds.extent();
        if rows > MAX_GRID_DIMENSION || cols > MAX_GRID_DIMENSION {
            return Err(integrity_error(
                sample_name,
                &format!(
                    "malformed grid: coordinate span {rows}x{cols} exceeds {MAX_GRID_DIMENSION}"
                ),
            ));
        }

        // 0 = empty cell, n = node n - 1
        let mut lookup = Array2::<u32>::zeros((rows, cols));
        for (node, spot) in spots.iter().enumerate() {
            let cell = bounds
                .index(spot.position)
                .and_then(|index| lookup.get_mut(index))
                .ok_or_else(|| {
                    integrity_error(sample_name, &"coordinate outside its own bounding box")
                })?;
            if *cell != 0 {
                let other = spots
                    .get(*cell as usize - 1)
                    .map_or("?", |s| s.barcode.as_str());
                return Err(NicheError::DataIntegrity {
                    sample: sample_name.to_string(),
                    reason: format!(
                        "duplicate coordinate ({}, {}) for spots '{other}' and '{}'",
                        spot.position[0], spot.position[1], spot.barcode
                    ),
                });
            }
            *cell = node as u32 + 1;
        }

        let offsets = self.topology.offsets();
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::with_capacity(offsets.len()); spots.len()];
        for (node, spot) in spots.iter().enumerate() {
            for offset in &offsets {
                let probe = [
                    spot.position[0].saturating_add(offset[0]),
                    spot.position[1].saturating_add(offset[1]),
                ];
                let Some(&slot) = bounds.index(probe).and_then(|index| lookup.get(index)) else {
                    continue;
                };
                if slot == 0 {
                    continue;
                }
                let neighbor = slot - 1;
                if let Some(list) = adjacency.get_mut(node) {
                    list.push(neighbor);
                }
                if let Some(list) = adjacency.get_mut(neighbor as usize) {
                    list.push(node as u32);
                }
            }
        }

        Ok(NeighborGraph::from_adjacency(
            sample.id,
            sample.group,
            sample.spots.clone(),
            labels,
            adjacency,
        ))
    }

    /// Build graphs for many samples in parallel
    ///
    /// Results keep the order of `samples`.
    pub fn build_all(&self, table: &SpotTable, samples: &[Sample]) -> Vec<Result<NeighborGraph>> {
        samples
            .par_iter()
            .map(|sample| self.build(table, sample))
            .collect()
    }
}
