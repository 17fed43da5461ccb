//! Read-only zarr directory stores

use crate::codec::{dtype_from_zarr, retrieve};
use crate::ARRAY_DIMENSIONS;
use geoviz_dataset::{
    disk_usage, Attributes, Dataset, DatasetError, DatasetSource, DatasetSummary, Variable,
    VariableInfo, TRAJECTORY,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::Group;

/// One opened array with its resolved schema
struct ZarrVariable {
    info: VariableInfo,
    shape: Vec<u64>,
    array: Array<FilesystemStore>,
}

/// A zarr store opened once and read per fragment
pub struct ZarrSource {
    path: PathBuf,
    summary: DatasetSummary,
    variables: IndexMap<String, ZarrVariable>,
}

impl std::fmt::Debug for ZarrSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrSource")
            .field("path", &self.path)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ZarrSource {
    /// Open an existing store read-only
    ///
    /// # Errors
    /// Returns [`DatasetError::Io`] when the path is not a readable directory,
    /// [`DatasetError::Store`] for malformed metadata or inconsistent
    /// dimension sizes, and [`DatasetError::Unsupported`] for element types
    /// outside the dataset model.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(DatasetError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a zarr directory store"),
            ));
        }
        let store = Arc::new(FilesystemStore::new(&path).map_err(|e| DatasetError::store(&path, e))?);

        let attrs = match Group::open(store.clone(), "/") {
            Ok(group) => group.attributes().clone(),
            Err(e) => return Err(DatasetError::store(&path, e)),
        };

        let mut dims: IndexMap<String, usize> = IndexMap::new();
        let mut variables = IndexMap::new();

        for (name, declared_dims) in list_arrays(&path)? {
            let array = Array::open(store.clone(), &format!("/{name}"))
                .map_err(|e| DatasetError::store(&path, format!("{name}: {e}")))?;
            let dtype = dtype_from_zarr(array.data_type()).ok_or_else(|| {
                DatasetError::Unsupported(format!("variable '{name}' has data type {:?}", array.data_type()))
            })?;
            let shape = array.shape().to_vec();

            let var_dims = declared_dims
                .or_else(|| dims_from_attribute(array.attributes()))
                .ok_or_else(|| DatasetError::store(&path, format!("{name}: no dimension names")))?;
            if var_dims.len() != shape.len() {
                return Err(DatasetError::store(
                    &path,
                    format!("{name}: {} dimension names for rank {}", var_dims.len(), shape.len()),
                ));
            }

            for (dim, &size) in var_dims.iter().zip(&shape) {
                let size = usize::try_from(size).map_err(|e| DatasetError::store(&path, e))?;
                match dims.get(dim) {
                    Some(&existing) if existing != size => {
                        return Err(DatasetError::store(
                            &path,
                            format!("dimension '{dim}' is {existing} elsewhere but {size} in '{name}'"),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        dims.insert(dim.clone(), size);
                    }
                }
            }

            let mut var_attrs = array.attributes().clone();
            var_attrs.remove(ARRAY_DIMENSIONS);
            let info = VariableInfo {
                name: name.clone(),
                dims: var_dims,
                dtype,
                attrs: var_attrs,
            };
            variables.insert(name, ZarrVariable { info, shape, array });
        }

        let size_bytes = disk_usage(&path).ok();
        debug!(
            path = %path.display(),
            variables = variables.len(),
            dimensions = dims.len(),
            "opened zarr store"
        );

        let summary = DatasetSummary {
            path: Some(path.clone()),
            dims,
            variables: variables.values().map(|v| v.info.clone()).collect(),
            attrs,
            size_bytes,
        };

        Ok(Self {
            path,
            summary,
            variables,
        })
    }

    /// Location the store was opened from
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the store handle
    pub fn close(self) {
        debug!(path = %self.path.display(), "closed zarr store");
    }

    fn variable(&self, name: &str) -> Result<&ZarrVariable, DatasetError> {
        self.variables
            .get(name)
            .ok_or_else(|| DatasetError::UnknownVariable(name.to_string()))
    }

    fn read(&self, var: &ZarrVariable, subset: &ArraySubset) -> Result<Variable, DatasetError> {
        let data = retrieve(&var.array, var.info.dtype, subset)
            .map_err(|e| DatasetError::store(&self.path, format!("{}: {e}", var.info.name)))?;
        Ok(Variable::new(var.info.dims.iter().cloned(), data).with_attrs(var.info.attrs.clone()))
    }

    fn trajectory_count(&self) -> Result<usize, DatasetError> {
        self.summary.trajectory_count()
    }
}

impl DatasetSource for ZarrSource {
    fn describe(&self) -> DatasetSummary {
        self.summary.clone()
    }

    fn read_slice(&self, trajectories: Range<usize>) -> Result<Dataset, DatasetError> {
        let len = self.trajectory_count()?;
        if trajectories.start > trajectories.end || trajectories.end > len {
            return Err(DatasetError::RangeOutOfBounds {
                start: trajectories.start,
                end: trajectories.end,
                len,
            });
        }

        let mut out = Dataset::new();
        for (name, &size) in &self.summary.dims {
            let size = if name == TRAJECTORY { trajectories.len() } else { size };
            out.add_dimension(name.clone(), size)?;
        }

        for (name, var) in &self.variables {
            let subset = match var.info.dims.iter().position(|d| d == TRAJECTORY) {
                Some(0) => leading_rows(&var.shape, to_u64(trajectories.start)..to_u64(trajectories.end)),
                Some(_) => {
                    return Err(DatasetError::Unsupported(format!(
                        "variable '{name}' has a non-leading trajectory dimension"
                    )))
                }
                None => ArraySubset::new_with_shape(var.shape.clone()),
            };
            let variable = self.read(var, &subset)?;
            out.insert_variable(name.clone(), variable)?;
        }

        out.set_attrs(self.summary.attrs.clone());
        Ok(out)
    }

    fn read_variable_rows(&self, name: &str, rows: &[usize]) -> Result<Variable, DatasetError> {
        let var = self.variable(name)?;
        if var.info.dims.first().map(String::as_str) != Some(TRAJECTORY) {
            return self.read(var, &ArraySubset::new_with_shape(var.shape.clone()));
        }

        let len = self.trajectory_count()?;
        let mut data = geoviz_dataset::ArrayData::empty(var.info.dtype);
        for &row in rows {
            if row >= len {
                return Err(DatasetError::RangeOutOfBounds {
                    start: row,
                    end: row + 1,
                    len,
                });
            }
            let subset = leading_rows(&var.shape, to_u64(row)..to_u64(row + 1));
            let chunk = retrieve(&var.array, var.info.dtype, &subset)
                .map_err(|e| DatasetError::store(&self.path, format!("{name}: {e}")))?;
            data.append(chunk)?;
        }

        Ok(Variable::new(var.info.dims.iter().cloned(), data).with_attrs(var.info.attrs.clone()))
    }
}

#[inline]
fn to_u64(value: usize) -> u64 {
    value as u64
}

/// Subset selecting `rows` along the leading axis and everything else whole
fn leading_rows(shape: &[u64], rows: Range<u64>) -> ArraySubset {
    let mut ranges = Vec::with_capacity(shape.len());
    ranges.push(rows);
    ranges.extend(shape.iter().skip(1).map(|&n| 0..n));
    ArraySubset::new_with_ranges(&ranges)
}

fn dims_from_attribute(attrs: &Attributes) -> Option<Vec<String>> {
    let list = attrs.get(ARRAY_DIMENSIONS)?.as_array()?;
    list.iter().map(|v| v.as_str().map(str::to_string)).collect()
}

/// Array children of the store root, sorted by name, with any dimension
/// names declared in v3 metadata
fn list_arrays(root: &Path) -> Result<Vec<(String, Option<Vec<String>>)>, DatasetError> {
    let entries = std::fs::read_dir(root).map_err(|e| DatasetError::io(root, e))?;
    let mut arrays = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| DatasetError::io(root, e))?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        let v3 = dir.join("zarr.json");
        if v3.is_file() {
            let text = std::fs::read_to_string(&v3).map_err(|e| DatasetError::io(&v3, e))?;
            let meta: Value = serde_json::from_str(&text).map_err(|e| DatasetError::store(&v3, e))?;
            if meta.get("node_type").and_then(Value::as_str) == Some("array") {
                let declared = meta
                    .get("dimension_names")
                    .and_then(Value::as_array)
                    .and_then(|names| {
                        names
                            .iter()
                            .map(|v| v.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()
                    });
                arrays.push((name, declared));
            }
        } else if dir.join(".zarray").is_file() {
            arrays.push((name, None));
        }
    }

    arrays.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(arrays)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_rows_spans_trailing_axes() {
        let subset = leading_rows(&[10, 4], 2..5);
        assert_eq!(subset.start(), &[2, 0]);
        assert_eq!(subset.shape(), &[3, 4]);
    }

    #[test]
    fn attribute_dimension_fallback() {
        let mut attrs = Attributes::new();
        attrs.insert(ARRAY_DIMENSIONS.to_string(), serde_json::json!(["trajectory", "time"]));
        assert_eq!(
            dims_from_attribute(&attrs),
            Some(vec!["trajectory".to_string(), "time".to_string()])
        );
    }

    #[test]
    fn open_missing_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ZarrSource::open(dir.path().join("absent.zarr")).unwrap_err();
        assert!(err.is_storage());
    }
}
