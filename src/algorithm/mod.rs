/// Bitset over the spots of one neighbor graph
pub mod bitset;
/// Order-by-order growth of accepted structures
pub mod expansion;
/// Candidate enumeration over neighbor graphs
pub mod extraction;
/// Coverage, enrichment and significance gates
pub mod filter;
/// End-to-end discovery driver and run results
pub mod pipeline;
/// Geometric signatures of realizing spot sets
pub mod shape;
/// Structures, instances and the interning arena
pub mod structure;
