//! Discovery of multicellular spatial niches enriched in one group of samples
//!
//! Spots from spatial transcriptomics slides are connected into per-sample
//! neighbor graphs. Cluster pairs whose adjacency is enriched in a focus group
//! seed an order-by-order search for larger connected structures, each kept
//! only while it stays covered, enriched and statistically significant.

#![forbid(unsafe_code)]

/// Structure extraction, filtering, iterative expansion and the pipeline driver
pub mod algorithm;
/// Groupwise adjacency comparison and pluggable statistical tests
pub mod analysis;
/// Configuration, errors, input tables, reports, CLI and progress
pub mod io;
/// Probability and special functions
pub mod math;
/// Spot tables, grid topologies and neighbor graphs
pub mod spatial;

pub use algorithm::pipeline::{DiscoveryRun, discover, discover_with};
pub use io::configuration::DiscoveryConfig;
pub use io::error::{NicheError, Result};
