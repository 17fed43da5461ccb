//! GeoViz Validator
//!
//! Read-only checklist that tells whether a particle-tracking dataset can be
//! loaded by the SedimentDrift visualization consumer.
//!
//! # Checks
//!
//! - file access and store size
//! - trajectory and time dimensions
//! - the seven derived variables (absence is "missing", not an error)
//! - common trajectory variables lon/lat/z/status
//! - consumer class and recommended global attributes
//! - coordinate ranges over a bounded random sample
//!
//! A run always completes: a failing check is recorded as an error scoped to
//! that check. The process should exit successfully only when
//! [`ValidationReport::exit_success`] holds.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod checks;
pub mod config;
pub mod error;
pub mod overview;
pub mod report;
pub mod validator;

pub use checks::{
    check_file_access, default_checks, CheckContext, CheckRegistry, ValidationCheck, RECOMMENDED_ATTRIBUTES,
    TRAJECTORY_VARIABLES,
};
pub use config::{ValidatorConfig, DEFAULT_SAMPLE_LIMIT};
pub use error::ValidationError;
pub use overview::DatasetOverview;
pub use report::{Category, ValidationReport};
pub use validator::{CheckOutcome, Validation, Validator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
