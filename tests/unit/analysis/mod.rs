mod adjacency;
mod statistics;
