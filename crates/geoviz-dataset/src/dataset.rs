//! Labeled dataset and variables
//!
//! A [`Dataset`] is a set of named dimensions, named [`Variable`]s indexed by
//! some of those dimensions, and global attributes. Particle-tracking data is
//! governed by two dimensions, [`TRAJECTORY`] and [`TIME`].

use crate::array::{ArrayData, DType};
use crate::error::DatasetError;
use indexmap::IndexMap;
use serde_json::Value;
use std::ops::Range;

/// Particle dimension; the partitioning axis
pub const TRAJECTORY: &str = "trajectory";

/// Sample dimension
pub const TIME: &str = "time";

/// Attribute map shared by variables and datasets
pub type Attributes = serde_json::Map<String, Value>;

/// A named array over some subset of the dataset dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    data: ArrayData,
    attrs: Attributes,
}

impl Variable {
    /// Create variable over `dims` holding `data` in row-major order
    #[must_use]
    pub fn new<I, S>(dims: I, data: ArrayData) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dims: dims.into_iter().map(Into::into).collect(),
            data,
            attrs: Attributes::new(),
        }
    }

    /// With a single attribute
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// With a full attribute map
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// Dimension names in axis order
    #[inline]
    #[must_use]
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// Element buffer
    #[inline]
    #[must_use]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Element type
    #[inline]
    #[must_use]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Variable attributes
    #[inline]
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// String-valued attribute, if present
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Whether the leading axis is the trajectory dimension
    #[inline]
    #[must_use]
    pub fn is_per_trajectory(&self) -> bool {
        self.dims.first().is_some_and(|d| d == TRAJECTORY)
    }

    /// Consume into the element buffer
    #[must_use]
    pub fn into_data(self) -> ArrayData {
        self.data
    }
}

/// In-memory labeled dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    dims: IndexMap<String, usize>,
    variables: IndexMap<String, Variable>,
    attrs: Attributes,
}

impl Dataset {
    /// Create empty dataset
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create dataset with the trajectory and time dimensions defined
    #[must_use]
    pub fn with_trajectory_time(trajectories: usize, times: usize) -> Self {
        let mut ds = Self::new();
        ds.dims.insert(TRAJECTORY.to_string(), trajectories);
        ds.dims.insert(TIME.to_string(), times);
        ds
    }

    /// Define a dimension
    ///
    /// Redefining with the same size is a no-op.
    ///
    /// # Errors
    /// Returns [`DatasetError::DimensionConflict`] when the size differs.
    pub fn add_dimension(&mut self, name: impl Into<String>, size: usize) -> Result<(), DatasetError> {
        let name = name.into();
        match self.dims.get(&name) {
            Some(&existing) if existing != size => Err(DatasetError::DimensionConflict {
                name,
                existing,
                requested: size,
            }),
            Some(_) => Ok(()),
            None => {
                self.dims.insert(name, size);
                Ok(())
            }
        }
    }

    /// All dimensions in definition order
    #[inline]
    #[must_use]
    pub fn dims(&self) -> &IndexMap<String, usize> {
        &self.dims
    }

    /// Size of a dimension
    #[inline]
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dims.get(name).copied()
    }

    /// Size of a dimension that must exist
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingDimension`] when absent.
    pub fn require_dimension(&self, name: &str) -> Result<usize, DatasetError> {
        self.dimension(name)
            .ok_or_else(|| DatasetError::MissingDimension(name.to_string()))
    }

    /// Number of trajectories
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingDimension`] when the dataset has no trajectory axis.
    pub fn trajectory_count(&self) -> Result<usize, DatasetError> {
        self.require_dimension(TRAJECTORY)
    }

    /// Number of time samples
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingDimension`] when the dataset has no time axis.
    pub fn time_count(&self) -> Result<usize, DatasetError> {
        self.require_dimension(TIME)
    }

    /// Whether a variable with this name exists
    #[inline]
    #[must_use]
    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Look up a variable
    #[inline]
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Variables in insertion order
    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Variable names in insertion order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Number of variables
    #[inline]
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Element count implied by a list of dimensions
    ///
    /// # Errors
    /// Returns [`DatasetError::UnknownDimension`] when a name is undefined.
    pub fn element_count(&self, variable: &str, dims: &[String]) -> Result<usize, DatasetError> {
        dims.iter().try_fold(1usize, |acc, dim| {
            self.dimension(dim)
                .map(|size| acc * size)
                .ok_or_else(|| DatasetError::UnknownDimension {
                    variable: variable.to_string(),
                    dimension: dim.clone(),
                })
        })
    }

    /// Insert or replace a variable after checking its shape
    ///
    /// Returns the previous variable under this name, if any.
    ///
    /// # Errors
    /// - [`DatasetError::UnknownDimension`] for undefined dimensions
    /// - [`DatasetError::ShapeMismatch`] when the element count differs from the dimension product
    pub fn insert_variable(
        &mut self,
        name: impl Into<String>,
        variable: Variable,
    ) -> Result<Option<Variable>, DatasetError> {
        let name = name.into();
        let expected = self.element_count(&name, variable.dims())?;
        let actual = variable.data().len();
        if expected != actual {
            return Err(DatasetError::ShapeMismatch {
                variable: name,
                expected,
                actual,
            });
        }
        Ok(self.variables.insert(name, variable))
    }

    /// Remove a variable, keeping the order of the rest
    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.variables.shift_remove(name)
    }

    /// Global attributes
    #[inline]
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Mutable global attributes
    #[inline]
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// Set a global attribute, replacing any previous value
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Set a global attribute only when absent; returns whether it was set
    pub fn set_attr_if_absent(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if self.attrs.contains_key(&key) {
            return false;
        }
        self.attrs.insert(key, value.into());
        true
    }

    /// Replace all global attributes
    pub fn set_attrs(&mut self, attrs: Attributes) {
        self.attrs = attrs;
    }

    /// Restrict the dataset to a half-open trajectory range
    ///
    /// Variables whose leading axis is `trajectory` are sliced; all other
    /// variables and the global attributes are copied unchanged.
    ///
    /// # Errors
    /// - [`DatasetError::MissingDimension`] without a trajectory axis
    /// - [`DatasetError::RangeOutOfBounds`] when the range exceeds the axis
    /// - [`DatasetError::Unsupported`] when `trajectory` is not a variable's leading axis
    pub fn slice_trajectory(&self, range: Range<usize>) -> Result<Self, DatasetError> {
        let len = self.trajectory_count()?;
        if range.start > range.end || range.end > len {
            return Err(DatasetError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }

        let mut out = Self {
            dims: self.dims.clone(),
            variables: IndexMap::with_capacity(self.variables.len()),
            attrs: self.attrs.clone(),
        };
        out.dims.insert(TRAJECTORY.to_string(), range.len());

        for (name, var) in &self.variables {
            let sliced = if var.is_per_trajectory() {
                let row_len = self.element_count(name, &var.dims[1..])?;
                Variable {
                    dims: var.dims.clone(),
                    data: var.data.slice_rows(row_len, range.clone())?,
                    attrs: var.attrs.clone(),
                }
            } else if var.dims.iter().any(|d| d == TRAJECTORY) {
                return Err(DatasetError::Unsupported(format!(
                    "variable '{name}' has trajectory as a non-leading axis"
                )));
            } else {
                var.clone()
            };
            out.variables.insert(name.clone(), sliced);
        }

        Ok(out)
    }

    /// Gather selected trajectories of one variable
    ///
    /// # Errors
    /// - [`DatasetError::UnknownVariable`] for an unknown name
    /// - [`DatasetError::RangeOutOfBounds`] for indices past the trajectory axis
    pub fn take_variable_rows(&self, name: &str, rows: &[usize]) -> Result<Variable, DatasetError> {
        let var = self
            .variable(name)
            .ok_or_else(|| DatasetError::UnknownVariable(name.to_string()))?;
        if !var.is_per_trajectory() {
            return Ok(var.clone());
        }
        let len = self.trajectory_count()?;
        if let Some(&bad) = rows.iter().find(|&&r| r >= len) {
            return Err(DatasetError::RangeOutOfBounds {
                start: bad,
                end: bad + 1,
                len,
            });
        }
        let row_len = self.element_count(name, &var.dims[1..])?;
        Ok(Variable {
            dims: var.dims.clone(),
            data: var.data.take_rows(row_len, rows)?,
            attrs: var.attrs.clone(),
        })
    }
}
