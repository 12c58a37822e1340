//! Error types and context management for niche discovery operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all discovery operations
#[derive(Debug)]
pub enum NicheError {
    /// Input records do not match the expected schema
    ///
    /// Raised before any graph construction:
    /// - A required field is missing from a record
    /// - A coordinate cannot be read as an integer
    Schema {
        /// Zero-based index of the offending record
        record: usize,
        /// Field name involved
        field: String,
        /// Description of what is wrong
        reason: String,
    },

    /// A configured label does not occur anywhere in the data
    UnknownLabel {
        /// Kind of label (`"group"` or `"cluster"`)
        kind: &'static str,
        /// The missing label
        label: String,
    },

    /// Per-sample data cannot form a valid grid
    DataIntegrity {
        /// Sample identifier
        sample: String,
        /// Description of the integrity failure
        reason: String,
    },

    /// Configuration validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Numerical computation produced an invalid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// JSON encoding or decoding failure
    Serialization {
        /// Path of the document being read or written
        path: PathBuf,
        /// Underlying serde error
        source: serde_json::Error,
    },
}

impl fmt::Display for NicheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema {
                record,
                field,
                reason,
            } => {
                write!(f, "Schema error in record {record}, field '{field}': {reason}")
            }
            Self::UnknownLabel { kind, label } => {
                write!(f, "Unknown {kind} label '{label}': not present in the data")
            }
            Self::DataIntegrity { sample, reason } => {
                write!(f, "Data integrity error in sample '{sample}': {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Serialization { path, source } => {
                write!(f, "JSON error for '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for NicheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileSystem { source, .. } => Some(source),
            Self::Serialization { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for discovery results
pub type Result<T> = std::result::Result<T, NicheError>;

/// Additional context to enrich error messages
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Sample being processed
    pub sample: Option<String>,
    /// File being read or written
    pub path: Option<PathBuf>,
    /// Operation being performed
    pub operation: Option<&'static str>,
}

/// Enriches error messages with pipeline state information
pub trait WithContext<T> {
    /// Add error context to a Result
    ///
    /// # Errors
    ///
    /// Propagates the original error with additional context applied
    fn with_context(self, context: ErrorContext) -> Result<T>;

    /// Add just the sample context
    ///
    /// # Errors
    ///
    /// Propagates the original error with the sample name applied
    fn with_sample(self, sample: &str) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<NicheError>,
{
    fn with_context(self, context: ErrorContext) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            match &mut error {
                NicheError::DataIntegrity { sample, .. } if sample.is_empty() => {
                    if let Some(name) = &context.sample {
                        sample.clone_from(name);
                    }
                }
                NicheError::FileSystem {
                    path, operation, ..
                } => {
                    if let Some(p) = &context.path {
                        path.clone_from(p);
                    }
                    if let Some(op) = context.operation {
                        *operation = op;
                    }
                }
                NicheError::Serialization { path, .. } => {
                    if let Some(p) = &context.path {
                        path.clone_from(p);
                    }
                }
                _ => {}
            }
            error
        })
    }

    fn with_sample(self, sample: &str) -> Result<T> {
        self.with_context(ErrorContext {
            sample: Some(sample.to_string()),
            ..Default::default()
        })
    }
}

impl From<std::io::Error> for NicheError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<serde_json::Error> for NicheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> NicheError {
    NicheError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a data integrity error for a sample
pub fn integrity_error(sample: &str, reason: &impl ToString) -> NicheError {
    NicheError::DataIntegrity {
        sample: sample.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> NicheError {
    NicheError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
