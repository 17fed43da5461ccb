//! Zarr directory-store writer

use crate::codec::{store_all, zarr_type_for};
use crate::ARRAY_DIMENSIONS;
use geoviz_dataset::{disk_usage, Dataset, DatasetError, DatasetSink, Variable, TRAJECTORY};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use zarrs::array::ArrayBuilder;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;

/// Default number of trajectories per chunk
pub const DEFAULT_CHUNK_TRAJECTORIES: usize = 1000;

/// Writes each dataset as a fresh zarr directory store
#[derive(Debug, Clone)]
pub struct ZarrSink {
    overwrite: bool,
    chunk_trajectories: usize,
}

impl Default for ZarrSink {
    fn default() -> Self {
        Self {
            overwrite: false,
            chunk_trajectories: DEFAULT_CHUNK_TRAJECTORIES,
        }
    }
}

impl ZarrSink {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace existing outputs instead of refusing them
    #[inline]
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Trajectories per chunk along the leading axis (minimum 1)
    #[inline]
    #[must_use]
    pub fn with_chunk_trajectories(mut self, chunk_trajectories: usize) -> Self {
        self.chunk_trajectories = chunk_trajectories.max(1);
        self
    }

    fn prepare_destination(&self, path: &Path) -> Result<(), DatasetError> {
        if path.exists() {
            if !self.overwrite {
                return Err(DatasetError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::AlreadyExists, "output already exists"),
                ));
            }
            self.discard(path)?;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }
        Ok(())
    }

    fn chunk_shape(&self, dataset: &Dataset, variable: &Variable) -> Vec<u64> {
        variable
            .dims()
            .iter()
            .enumerate()
            .map(|(axis, dim)| {
                let size = dataset.dimension(dim).unwrap_or(0);
                let chunk = if axis == 0 && dim == TRAJECTORY {
                    size.min(self.chunk_trajectories)
                } else {
                    size
                };
                chunk.max(1) as u64
            })
            .collect()
    }
}

impl DatasetSink for ZarrSink {
    fn extension(&self) -> &str {
        ".zarr"
    }

    fn write(&self, dataset: &Dataset, path: &Path) -> Result<u64, DatasetError> {
        self.prepare_destination(path)?;
        let store = Arc::new(FilesystemStore::new(path).map_err(|e| DatasetError::store(path, e))?);

        GroupBuilder::new()
            .attributes(dataset.attrs().clone())
            .build(store.clone(), "/")
            .map_err(|e| DatasetError::store(path, e))?
            .store_metadata()
            .map_err(|e| DatasetError::store(path, e))?;

        for (name, variable) in dataset.variables() {
            let shape = variable
                .dims()
                .iter()
                .map(|d| dataset.require_dimension(d).map(|n| n as u64))
                .collect::<Result<Vec<_>, _>>()?;
            let (data_type, fill_value) = zarr_type_for(variable.dtype());

            let mut attrs = variable.attrs().clone();
            attrs.insert(
                ARRAY_DIMENSIONS.to_string(),
                Value::from(variable.dims().to_vec()),
            );

            let array = ArrayBuilder::new(
                shape,
                data_type,
                self.chunk_shape(dataset, variable)
                    .try_into()
                    .map_err(|_| DatasetError::store(path, format!("{name}: invalid chunk shape")))?,
                fill_value,
            )
            .dimension_names(Some(variable.dims().iter().map(String::as_str)))
            .attributes(attrs)
            .build(store.clone(), &format!("/{name}"))
            .map_err(|e| DatasetError::store(path, format!("{name}: {e}")))?;

            array
                .store_metadata()
                .map_err(|e| DatasetError::store(path, format!("{name}: {e}")))?;
            if !variable.data().is_empty() {
                store_all(&array, variable.data())
                    .map_err(|e| DatasetError::store(path, format!("{name}: {e}")))?;
            }
        }

        let bytes = disk_usage(path)?;
        debug!(path = %path.display(), bytes, variables = dataset.variable_count(), "wrote zarr store");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoviz_dataset::{ArrayData, TIME};

    #[test]
    fn chunks_follow_trajectory_axis() {
        let mut ds = Dataset::with_trajectory_time(2500, 4);
        ds.insert_variable(
            "lon",
            Variable::new([TRAJECTORY, TIME], ArrayData::Float32(vec![0.0; 10_000])),
        )
        .unwrap();
        let sink = ZarrSink::new();
        let lon = ds.variable("lon").unwrap();
        assert_eq!(sink.chunk_shape(&ds, lon), vec![1000, 4]);

        let sink = sink.with_chunk_trajectories(0);
        assert_eq!(sink.chunk_shape(&ds, lon), vec![1, 4]);
    }

    #[test]
    fn refuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("taken.zarr");
        std::fs::create_dir(&target).unwrap();

        let err = ZarrSink::new().write(&Dataset::with_trajectory_time(1, 1), &target).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
