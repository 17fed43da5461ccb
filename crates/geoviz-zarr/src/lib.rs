//! GeoViz Zarr Backend
//!
//! On-disk persistence for [`geoviz_dataset`] via zarr directory stores:
//! - [`ZarrSource`]: opens a store read-only and reads trajectory slices
//!   through array subsets
//! - [`ZarrSink`]: writes each dataset as a new store, chunked along trajectory
//!
//! Dimension names are written to array metadata and mirrored into the
//! `_ARRAY_DIMENSIONS` attribute so xarray can read the output.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod codec;
mod sink;
mod source;

pub use sink::{ZarrSink, DEFAULT_CHUNK_TRAJECTORIES};
pub use source::ZarrSource;

/// Attribute xarray uses to carry dimension names
pub const ARRAY_DIMENSIONS: &str = "_ARRAY_DIMENSIONS";

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
