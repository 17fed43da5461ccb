//! GeoViz Fragmenter
//!
//! Splits particle-tracking datasets into independently loadable fragments
//! along the trajectory dimension and adds the SedimentDrift variables a
//! visualization consumer expects.
//!
//! # Pipeline
//!
//! - [`MemoryEstimator`]: predicts one fragment's peak memory before any work
//! - [`ConfirmPolicy`]: decides whether an unsafe plan may continue
//! - [`PartitionPlan`]: disjoint trajectory ranges covering the source
//! - [`synthesize`]: fills absent derived variables from [`DERIVED_VARIABLES`]
//! - [`FragmentWriter`]: provenance attributes and persistence
//! - [`Fragmenter`]: runs the whole sequence
//!
//! # Example
//!
//! ```rust
//! use geoviz_dataset::{ArrayData, Dataset, Variable, TIME, TRAJECTORY};
//! use geoviz_fragment::{synthesize, ParticleProperties};
//!
//! let mut fragment = Dataset::with_trajectory_time(2, 3);
//! fragment
//!     .insert_variable("lon", Variable::new([TRAJECTORY, TIME], ArrayData::Float32(vec![0.0; 6])))
//!     .unwrap();
//!
//! let added = synthesize(&mut fragment, &ParticleProperties::default()).unwrap();
//! assert_eq!(added.len(), 7);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod budget;
pub mod config;
pub mod decision;
pub mod error;
pub mod orchestrator;
pub mod params;
pub mod plan;
pub mod schema;
pub mod synthesize;
pub mod writer;

pub use budget::{estimate, DatasetShape, MemoryEstimate, MemoryEstimator};
pub use config::{default_prefix, FailurePolicy, FragmentConfig, ParticleConfig, EXAMPLE_CONFIG};
pub use decision::{AutoAccept, AutoReject, ConfirmPolicy, Decision, MemoryRiskPolicy, PromptPolicy};
pub use error::{FragmentError, Result};
pub use orchestrator::{Fragmenter, RunOutcome, RunReport, WrittenFragment};
pub use params::{FragmentPercentage, ParticleClass, ParticleProperties, SizeClass};
pub use plan::{fragment_file_name, PartitionPlan};
pub use schema::{
    derived_variable, derived_variable_names, missing_derived_variables, DerivedValue, DerivedVariableSpec,
    CONSUMER_CLASS, CONSUMER_CLASS_ATTR, DERIVED_VARIABLES,
};
pub use synthesize::{synthesize, AddedVariable};
pub use writer::{annotate, tool_tag, FragmentWriter, Provenance};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
