//! Input/output, configuration and error handling

/// Command-line interface and discovery runner
pub mod cli;
/// Defaults, constants and run configuration
pub mod configuration;
/// Error types and context propagation
pub mod error;
/// JSON discovery reports
pub mod export;
/// Terminal progress reporting
pub mod progress;
/// JSON spot table loading
pub mod table;
