//! GeoViz Dataset Model
//!
//! In-memory labeled multidimensional datasets for particle-tracking output.
//!
//! # Core Concepts
//!
//! - [`Dataset`]: named dimensions, named [`Variable`]s, global attributes
//! - [`ArrayData`]: typed row-major element buffer of one variable
//! - [`DatasetSource`]: read-only handle, opened once and sliced per fragment
//! - [`DatasetSink`]: persistence of a dataset to a path
//!
//! # Example
//!
//! ```rust
//! use geoviz_dataset::{ArrayData, Dataset, Variable, TIME, TRAJECTORY};
//!
//! let mut ds = Dataset::with_trajectory_time(2, 3);
//! ds.insert_variable(
//!     "lon",
//!     Variable::new([TRAJECTORY, TIME], ArrayData::Float32(vec![0.0; 6])),
//! )
//! .unwrap();
//!
//! let fragment = ds.slice_trajectory(1..2).unwrap();
//! assert_eq!(fragment.trajectory_count().unwrap(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod array;
mod dataset;
mod error;
mod source;

pub use array::{ArrayData, DType, Scalar};
pub use dataset::{Attributes, Dataset, Variable, TIME, TRAJECTORY};
pub use error::DatasetError;
pub use source::{disk_usage, DatasetSink, DatasetSource, DatasetSummary, VariableInfo};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
