//! Read-only dataset handles and persistence sinks
//!
//! [`DatasetSource`] is the handle a run opens once and reads many times;
//! [`DatasetSink`] persists a [`Dataset`] to a path. Both are implemented by
//! storage backends; [`Dataset`] itself is an in-memory source.

use crate::array::DType;
use crate::dataset::{Attributes, Dataset, Variable, TIME, TRAJECTORY};
use crate::error::DatasetError;
use indexmap::IndexMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Schema-level description of one variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    /// Variable name
    pub name: String,
    /// Dimension names in axis order
    pub dims: Vec<String>,
    /// Element type
    pub dtype: DType,
    /// Variable attributes
    pub attrs: Attributes,
}

impl VariableInfo {
    /// String-valued attribute, if present
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Everything known about a source without reading array data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    /// Location the source was opened from, if on disk
    pub path: Option<PathBuf>,
    /// Dimension sizes
    pub dims: IndexMap<String, usize>,
    /// Variables in source order
    pub variables: Vec<VariableInfo>,
    /// Global attributes
    pub attrs: Attributes,
    /// Size on disk in bytes, if known
    pub size_bytes: Option<u64>,
}

impl DatasetSummary {
    /// Size of a dimension
    #[inline]
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dims.get(name).copied()
    }

    /// Number of trajectories
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingDimension`] when absent.
    pub fn trajectory_count(&self) -> Result<usize, DatasetError> {
        self.dimension(TRAJECTORY)
            .ok_or_else(|| DatasetError::MissingDimension(TRAJECTORY.to_string()))
    }

    /// Number of time samples
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingDimension`] when absent.
    pub fn time_count(&self) -> Result<usize, DatasetError> {
        self.dimension(TIME)
            .ok_or_else(|| DatasetError::MissingDimension(TIME.to_string()))
    }

    /// Whether a variable exists
    #[must_use]
    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Look up a variable description
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Number of data variables (variables that are not dimension coordinates)
    #[must_use]
    pub fn data_variable_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| !(v.dims.len() == 1 && v.dims[0] == v.name))
            .count()
    }

    /// Base name of the source path, if any
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Read-only handle over a labeled dataset
///
/// Opened once per run and read once per fragment; never mutated. Dropping
/// the handle closes it.
pub trait DatasetSource: Send + Sync {
    /// Dimensions, variables, and attributes without array data
    fn describe(&self) -> DatasetSummary;

    /// Every variable restricted to a half-open trajectory range
    ///
    /// # Errors
    /// Returns an error when the range is out of bounds or the read fails.
    fn read_slice(&self, trajectories: Range<usize>) -> Result<Dataset, DatasetError>;

    /// One variable restricted to selected trajectories (in the given order)
    ///
    /// Variables without a trajectory axis are returned whole.
    ///
    /// # Errors
    /// Returns an error for unknown variables, bad indices, or failed reads.
    fn read_variable_rows(&self, name: &str, rows: &[usize]) -> Result<Variable, DatasetError>;
}

/// Persists datasets to paths
pub trait DatasetSink: Send + Sync {
    /// File extension appended to output stems, including the dot
    fn extension(&self) -> &str;

    /// Write `dataset` at `path`, returning the bytes on disk
    ///
    /// # Errors
    /// Returns an error when the destination is unwritable or encoding fails.
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<u64, DatasetError>;

    /// Remove a previously written output
    ///
    /// # Errors
    /// Returns [`DatasetError::Io`] when removal fails.
    fn discard(&self, path: &Path) -> Result<(), DatasetError> {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DatasetError::io(path, e)),
        }
    }
}

impl DatasetSource for Dataset {
    fn describe(&self) -> DatasetSummary {
        DatasetSummary {
            path: None,
            dims: self.dims().clone(),
            variables: self
                .variables()
                .map(|(name, var)| VariableInfo {
                    name: name.to_string(),
                    dims: var.dims().to_vec(),
                    dtype: var.dtype(),
                    attrs: var.attrs().clone(),
                })
                .collect(),
            attrs: self.attrs().clone(),
            size_bytes: None,
        }
    }

    fn read_slice(&self, trajectories: Range<usize>) -> Result<Dataset, DatasetError> {
        self.slice_trajectory(trajectories)
    }

    fn read_variable_rows(&self, name: &str, rows: &[usize]) -> Result<Variable, DatasetError> {
        self.take_variable_rows(name, rows)
    }
}

/// Total size in bytes of a file or directory tree
///
/// # Errors
/// Returns [`DatasetError::Io`] when any entry cannot be inspected.
pub fn disk_usage(path: &Path) -> Result<u64, DatasetError> {
    let meta = std::fs::metadata(path).map_err(|e| DatasetError::io(path, e))?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }
    let mut total = 0;
    for entry in std::fs::read_dir(path).map_err(|e| DatasetError::io(path, e))? {
        let entry = entry.map_err(|e| DatasetError::io(path, e))?;
        total += disk_usage(&entry.path())?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayData;

    fn dataset() -> Dataset {
        let mut ds = Dataset::with_trajectory_time(3, 2);
        ds.insert_variable(
            "lat",
            Variable::new([TRAJECTORY, TIME], ArrayData::Float32(vec![1.0; 6]))
                .with_attr("units", "degrees_north"),
        )
        .unwrap();
        ds.insert_variable("time", Variable::new([TIME], ArrayData::Float64(vec![0.0, 1.0])))
            .unwrap();
        ds
    }

    #[test]
    fn describe_lists_variables_and_dims() {
        let summary = dataset().describe();
        assert_eq!(summary.trajectory_count().unwrap(), 3);
        assert_eq!(summary.time_count().unwrap(), 2);
        assert!(summary.contains_variable("lat"));
        assert_eq!(summary.variable("lat").unwrap().attr_str("units"), Some("degrees_north"));
        // `time(time)` is a coordinate, not a data variable
        assert_eq!(summary.data_variable_count(), 1);
    }

    #[test]
    fn in_memory_source_slices() {
        let ds = dataset();
        let frag = ds.read_slice(2..3).unwrap();
        assert_eq!(frag.trajectory_count().unwrap(), 1);
    }

    #[test]
    fn summary_missing_dimension() {
        let summary = DatasetSummary::default();
        assert!(matches!(
            summary.trajectory_count(),
            Err(DatasetError::MissingDimension(_))
        ));
    }
}
