//! Derived variables the SedimentDrift consumer expects
//!
//! The table is immutable and shared; runs pass their own
//! [`ParticleProperties`] alongside it.

use crate::params::ParticleProperties;
use geoviz_dataset::{DType, DatasetSummary, Scalar};

/// Global attribute naming the consumer class
pub const CONSUMER_CLASS_ATTR: &str = "opendrift_class";

/// Consumer class written to synthesized fragments
pub const CONSUMER_CLASS: &str = "SedimentDrift";

/// Where a derived variable's fill value comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedValue {
    /// Particle diameter in meters
    Diameter,
    /// Particle density in kg/m³
    Density,
    Class,
    SizeClass,
    ConstU8(u8),
    ConstF32(f32),
}

impl DerivedValue {
    /// Fill value under `params`
    #[must_use]
    pub fn resolve(&self, params: &ParticleProperties) -> Scalar {
        match *self {
            Self::Diameter => Scalar::Float32(params.diameter_m() as f32),
            Self::Density => Scalar::Float32(params.density() as f32),
            Self::Class => Scalar::String(params.class().to_string()),
            Self::SizeClass => Scalar::String(params.size_class().to_string()),
            Self::ConstU8(v) => Scalar::UInt8(v),
            Self::ConstF32(v) => Scalar::Float32(v),
        }
    }
}

/// One per-particle-per-time variable of the consumer schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedVariableSpec {
    pub name: &'static str,
    pub dtype: DType,
    pub value: DerivedValue,
    pub units: &'static str,
    pub long_name: &'static str,
    /// Comma-separated enumeration for categorical variables
    pub classes: Option<&'static str>,
}

const PARTICLE_CLASSES: &str = "oil,other,bubble,faecal_pellets,copepod,diatom_chain,oily_gas";
const SIZE_CLASSES: &str = "small,medium,large";

/// The seven derived variables, in synthesis order
pub static DERIVED_VARIABLES: [DerivedVariableSpec; 7] = [
    DerivedVariableSpec {
        name: "particulate_diameter",
        dtype: DType::Float32,
        value: DerivedValue::Diameter,
        units: "m",
        long_name: "Particle diameter",
        classes: None,
    },
    DerivedVariableSpec {
        name: "particulate_density",
        dtype: DType::Float32,
        value: DerivedValue::Density,
        units: "kg m-3",
        long_name: "Particle density",
        classes: None,
    },
    DerivedVariableSpec {
        name: "particulate_class",
        dtype: DType::String,
        value: DerivedValue::Class,
        units: "",
        long_name: "Particle classification",
        classes: Some(PARTICLE_CLASSES),
    },
    DerivedVariableSpec {
        name: "particulate_size_class",
        dtype: DType::String,
        value: DerivedValue::SizeClass,
        units: "",
        long_name: "Particle size classification",
        classes: Some(SIZE_CLASSES),
    },
    DerivedVariableSpec {
        name: "settled",
        dtype: DType::UInt8,
        value: DerivedValue::ConstU8(0),
        units: "1",
        long_name: "Particle settled on seafloor",
        classes: None,
    },
    DerivedVariableSpec {
        name: "ocean_vertical_diffusivity",
        dtype: DType::Float32,
        value: DerivedValue::ConstF32(0.02),
        units: "m²/s",
        long_name: "Ocean vertical diffusivity",
        classes: None,
    },
    DerivedVariableSpec {
        name: "ocean_mixed_layer_thickness",
        dtype: DType::Float32,
        value: DerivedValue::ConstF32(50.0),
        units: "m",
        long_name: "Ocean mixed layer thickness",
        classes: None,
    },
];

/// Names of the derived variables
pub fn derived_variable_names() -> impl Iterator<Item = &'static str> {
    DERIVED_VARIABLES.iter().map(|spec| spec.name)
}

/// Look up a derived variable by name
#[must_use]
pub fn derived_variable(name: &str) -> Option<&'static DerivedVariableSpec> {
    DERIVED_VARIABLES.iter().find(|spec| spec.name == name)
}

/// Derived variables a source lacks
#[must_use]
pub fn missing_derived_variables(summary: &DatasetSummary) -> Vec<&'static str> {
    derived_variable_names()
        .filter(|name| !summary.contains_variable(name))
        .collect()
}
