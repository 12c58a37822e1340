//! Groupwise statistics over neighbor graphs

/// Cluster-pair adjacency compared between two groups
pub mod adjacency;
/// Two-group significance tests and multiple-testing corrections
pub mod statistics;
