//! Error types for the dataset model
//!
//! Covers:
//! - Schema violations (unknown dimensions, shape mismatches)
//! - Out-of-range slicing
//! - Storage failures from concrete backends

use crate::array::DType;
use std::path::PathBuf;

/// Errors raised by the dataset model, sources, and sinks
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// A required dimension is absent
    #[error("missing dimension: {0}")]
    MissingDimension(String),

    /// Variable lookup failed
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Variable references a dimension the dataset does not define
    #[error("variable '{variable}' references unknown dimension '{dimension}'")]
    UnknownDimension { variable: String, dimension: String },

    /// Element count does not match the product of the dimension sizes
    #[error("variable '{variable}': expected {expected} elements, found {actual}")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    /// Element types differ where they must match
    #[error("dtype mismatch: expected {expected}, found {actual}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// Dimension redefined with a different size
    #[error("dimension '{name}' already has size {existing}, cannot redefine as {requested}")]
    DimensionConflict {
        name: String,
        existing: usize,
        requested: usize,
    },

    /// Trajectory range outside the dataset
    #[error("trajectory range {start}..{end} exceeds {len} trajectories")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// Data type or layout not supported by this backend
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Filesystem error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Storage backend error (open, decode, encode)
    #[error("store error at {path}: {message}")]
    Store { path: PathBuf, message: String },
}

impl DatasetError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create store error for path
    pub fn store(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Store {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error originates from the storage layer rather than the schema
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Store { .. })
    }
}
