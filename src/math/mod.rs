//! Mathematical utilities for the discovery engine

/// Special functions, distributions and summary statistics
pub mod probability;
