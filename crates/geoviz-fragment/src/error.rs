//! Error types for fragmentation
//!
//! Covers:
//! - Invalid run parameters (rejected before any I/O)
//! - Source and sink failures from the dataset layer
//! - Per-fragment failures, carrying what already reached disk
//! - Configuration loading

use geoviz_dataset::DatasetError;
use std::path::PathBuf;

/// Main fragmentation error type
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    /// Percentage or particle property outside its domain
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dataset read, write, or schema failure
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Filesystem error outside the dataset layer
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fragment could not be produced; the run stopped there
    #[error(
        "fragment {index} of {total} failed with {} fragment(s) left on disk: {source}",
        .written.len()
    )]
    FragmentFailed {
        /// 1-based index of the failing fragment
        index: usize,
        /// Planned fragment count
        total: usize,
        /// Outputs that remain on disk
        written: Vec<PathBuf>,
        /// What went wrong
        #[source]
        source: Box<FragmentError>,
    },

    /// Configuration file could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl FragmentError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid parameter error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Check if the error was raised before any I/O
    #[inline]
    #[must_use]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }

    /// Outputs left on disk by a failed run
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        match self {
            Self::FragmentFailed { written, .. } => written,
            _ => &[],
        }
    }
}

/// Result alias for fragmentation
pub type Result<T> = std::result::Result<T, FragmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_failed_reports_written_count() {
        let err = FragmentError::FragmentFailed {
            index: 3,
            total: 3,
            written: vec![PathBuf::from("a"), PathBuf::from("b")],
            source: Box::new(FragmentError::invalid("boom")),
        };
        let text = err.to_string();
        assert!(text.contains("fragment 3 of 3"));
        assert!(text.contains("2 fragment(s)"));
        assert_eq!(err.written().len(), 2);
        assert!(!err.is_invalid_parameter());
    }

    #[test]
    fn dataset_errors_convert() {
        let err: FragmentError = DatasetError::UnknownVariable("lon".into()).into();
        assert!(matches!(err, FragmentError::Dataset(_)));
        assert!(err.written().is_empty());
    }
}
