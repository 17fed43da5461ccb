//! Error types for validation checks

use geoviz_dataset::DatasetError;

/// Failure inside one check
///
/// Never fatal to a validation run: the runner records it as an error
/// scoped to the failing check and continues.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Source could not be read
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Sample could not be drawn or interpreted
    #[error("sampling failed: {0}")]
    Sampling(String),
}
