//! Provenance annotation and persistence of fragments

use crate::error::{FragmentError, Result};
use crate::plan::fragment_file_name;
use geoviz_dataset::{Dataset, DatasetSink};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provenance attribute names
pub mod attrs {
    pub const FRAGMENT_NUMBER: &str = "fragment_number";
    pub const TOTAL_FRAGMENTS: &str = "total_fragments";
    pub const TRAJECTORY_START: &str = "fragment_trajectory_start";
    /// Exclusive
    pub const TRAJECTORY_END: &str = "fragment_trajectory_end";
    pub const ORIGINAL_FILE: &str = "original_file";
    pub const MODIFIED_BY: &str = "modified_by";
}

/// Tag identifying this tool in `modified_by`
#[must_use]
pub fn tool_tag() -> String {
    format!("geoviz-fragment/{}", crate::VERSION)
}

/// Where a fragment sits in its run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// 1-based
    pub index: usize,
    pub total: usize,
    pub trajectories: Range<usize>,
    /// Base name of the source
    pub original_file: String,
}

/// Set the provenance attributes, replacing stale values copied from the source
pub fn annotate(fragment: &mut Dataset, provenance: &Provenance) {
    fragment.set_attr(attrs::FRAGMENT_NUMBER, provenance.index);
    fragment.set_attr(attrs::TOTAL_FRAGMENTS, provenance.total);
    fragment.set_attr(attrs::TRAJECTORY_START, provenance.trajectories.start);
    fragment.set_attr(attrs::TRAJECTORY_END, provenance.trajectories.end);
    fragment.set_attr(attrs::ORIGINAL_FILE, provenance.original_file.clone());
    fragment.set_attr(attrs::MODIFIED_BY, tool_tag());
}

/// Annotates fragments and hands them to a sink under the run's naming scheme
pub struct FragmentWriter<'a> {
    sink: &'a dyn DatasetSink,
    prefix: String,
}

impl<'a> FragmentWriter<'a> {
    pub fn new(sink: &'a dyn DatasetSink, prefix: impl Into<String>) -> Self {
        Self {
            sink,
            prefix: prefix.into(),
        }
    }

    /// Output location of fragment `index` of `total`
    #[must_use]
    pub fn output_path(&self, index: usize, total: usize) -> PathBuf {
        PathBuf::from(fragment_file_name(&self.prefix, index, total, self.sink.extension()))
    }

    /// Create the directory the prefix points into
    ///
    /// # Errors
    /// Returns [`FragmentError::Io`] when the directory cannot be created.
    pub fn prepare(&self) -> Result<()> {
        let first = self.output_path(1, 1);
        if let Some(parent) = first.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FragmentError::io(parent, e))?;
        }
        Ok(())
    }

    /// Annotate and persist one fragment, returning its path and size on disk
    ///
    /// # Errors
    /// Returns [`FragmentError::Dataset`] when the sink fails.
    pub fn write(&self, fragment: &mut Dataset, provenance: &Provenance) -> Result<(PathBuf, u64)> {
        annotate(fragment, provenance);
        let path = self.output_path(provenance.index, provenance.total);
        let bytes = self.sink.write(fragment, &path)?;
        debug!(path = %path.display(), bytes, "fragment persisted");
        Ok((path, bytes))
    }

    /// Remove an output written earlier in the run
    ///
    /// # Errors
    /// Returns [`FragmentError::Dataset`] when removal fails.
    pub fn discard(&self, path: &Path) -> Result<()> {
        self.sink.discard(path)?;
        Ok(())
    }
}
