//! Spatial data structures and neighbor graph construction
//!
//! This module contains:
//! - Spot tables with interned labels and sample partitioning
//! - Grid topologies and the per-sample graph builder
//! - Compressed neighbor graphs

/// Compressed per-sample neighbor graph
pub mod graph;
/// Grid topologies and graph construction
pub mod grid;
/// Spot records, labels and samples
pub mod sample;

pub use graph::NeighborGraph;
pub use sample::SpotTable;
