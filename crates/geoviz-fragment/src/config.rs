//! Run configuration
//!
//! Loadable from TOML; every field has a default so partial files work.

use crate::decision::MemoryRiskPolicy;
use crate::error::{FragmentError, Result};
use crate::params::{
    FragmentPercentage, ParticleClass, ParticleProperties, SizeClass, DEFAULT_DENSITY, DEFAULT_DIAMETER_MM,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default share of trajectories per fragment
pub const DEFAULT_PERCENTAGE: f64 = 10.0;

/// What happens to written fragments when a later one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave them on disk
    #[default]
    Keep,
    /// Delete them before reporting the failure
    Remove,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Self::Keep),
            "remove" => Ok(Self::Remove),
            other => Err(format!("unknown failure policy '{other}' (keep, remove)")),
        }
    }
}

/// Particle properties as configured (diameter in millimeters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticleConfig {
    pub class: ParticleClass,
    pub size_class: SizeClass,
    pub diameter_mm: f64,
    /// kg/m³
    pub density: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            class: ParticleClass::default(),
            size_class: SizeClass::default(),
            diameter_mm: DEFAULT_DIAMETER_MM,
            density: DEFAULT_DENSITY,
        }
    }
}

/// Fragmentation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FragmentConfig {
    /// Share of trajectories per fragment, in (0, 100]
    pub percentage: f64,
    /// Output prefix; defaults to the input path without extension
    pub prefix: Option<String>,
    /// Synthesize missing derived variables
    pub add_sediment_vars: bool,
    pub particle: ParticleConfig,
    pub on_memory_risk: MemoryRiskPolicy,
    pub on_failure: FailurePolicy,
    /// Fragments produced at once
    pub concurrency: usize,
    /// Fixed available memory in bytes instead of probing the host
    pub available_memory_bytes: Option<u64>,
    /// Replace outputs that already exist
    pub overwrite: bool,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            percentage: DEFAULT_PERCENTAGE,
            prefix: None,
            add_sediment_vars: true,
            particle: ParticleConfig::default(),
            on_memory_risk: MemoryRiskPolicy::default(),
            on_failure: FailurePolicy::default(),
            concurrency: 1,
            available_memory_bytes: None,
            overwrite: false,
        }
    }
}

impl FragmentConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`FragmentError::Config`] on syntax errors or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FragmentError::Config(e.to_string()))
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// Returns [`FragmentError::Io`] when unreadable, [`FragmentError::Config`]
    /// when malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FragmentError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns [`FragmentError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FragmentError::Config(e.to_string()))
    }

    #[inline]
    #[must_use]
    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage = percentage;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_sediment_vars(mut self, enabled: bool) -> Self {
        self.add_sediment_vars = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_particle_class(mut self, class: ParticleClass) -> Self {
        self.particle.class = class;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_size_class(mut self, size_class: SizeClass) -> Self {
        self.particle.size_class = size_class;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_diameter_mm(mut self, diameter_mm: f64) -> Self {
        self.particle.diameter_mm = diameter_mm;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.particle.density = density;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_memory_risk(mut self, policy: MemoryRiskPolicy) -> Self {
        self.on_memory_risk = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_available_memory(mut self, bytes: u64) -> Self {
        self.available_memory_bytes = Some(bytes);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Validated percentage
    ///
    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] outside (0, 100].
    pub fn fragment_percentage(&self) -> Result<FragmentPercentage> {
        FragmentPercentage::new(self.percentage)
    }

    /// Validated particle properties
    ///
    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] for non-positive values.
    pub fn particle_properties(&self) -> Result<ParticleProperties> {
        ParticleProperties::from_millimeters(
            self.particle.class,
            self.particle.size_class,
            self.particle.diameter_mm,
            self.particle.density,
        )
    }

    /// Validate everything that can be checked without touching the source
    ///
    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] for the first bad value.
    pub fn validate(&self) -> Result<(FragmentPercentage, ParticleProperties)> {
        let percentage = self.fragment_percentage()?;
        let particle = self.particle_properties()?;
        if self.concurrency == 0 {
            return Err(FragmentError::invalid("concurrency must be at least 1"));
        }
        Ok((percentage, particle))
    }

    /// Configured prefix, or `input` with its extension stripped
    #[must_use]
    pub fn prefix_for(&self, input: &Path) -> String {
        match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => default_prefix(input),
        }
    }
}

/// `input` with its extension stripped
#[must_use]
pub fn default_prefix(input: &Path) -> String {
    input.with_extension("").to_string_lossy().into_owned()
}

/// Commented example configuration
pub const EXAMPLE_CONFIG: &str = r#"# GeoViz fragmenter configuration

# Share of trajectories per fragment, in (0, 100].
# 100 = one file, 10 = ten files, 1 = one hundred files.
percentage = 10.0

# Output prefix. Defaults to the input path without its extension.
# prefix = "output/fragments"

# Add missing SedimentDrift variables to every fragment.
add_sediment_vars = true

# What to do when the memory estimate is unsafe: prompt, accept, abort.
on_memory_risk = "abort"

# What to do with written fragments when a later one fails: keep, remove.
on_failure = "keep"

# Fragments produced at once. The memory estimate is multiplied by this.
concurrency = 1

# Available memory in bytes; probed from the host when unset.
# available_memory_bytes = 8589934592

# Replace fragment outputs that already exist.
overwrite = false

[particle]
# oil, other, bubble, faecal_pellets, copepod, diatom_chain, oily_gas
class = "other"
# small, medium, large
size_class = "medium"
diameter_mm = 0.1
# kg/m3
density = 1027.0
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn example_config_parses_to_defaults() {
        let config = FragmentConfig::from_toml_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, FragmentConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = FragmentConfig::from_toml_str(
            "percentage = 25.0\n[particle]\nclass = \"diatom_chain\"\ndiameter_mm = 5.0\n",
        )
        .unwrap();
        assert_eq!(config.percentage, 25.0);
        assert_eq!(config.particle.class, ParticleClass::DiatomChain);
        assert_eq!(config.particle.size_class, SizeClass::Medium);
        assert!((config.particle_properties().unwrap().diameter_m() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = FragmentConfig::from_toml_str("percent = 5").unwrap_err();
        assert!(matches!(err, FragmentError::Config(_)));
    }

    #[test]
    fn round_trip_through_toml() {
        let config = FragmentConfig::new()
            .with_percentage(40.0)
            .with_prefix("out/run")
            .with_failure_policy(FailurePolicy::Remove)
            .with_available_memory(1 << 30);
        let text = config.to_toml_string().unwrap();
        assert_eq!(FragmentConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn validation() {
        assert!(FragmentConfig::new().validate().is_ok());
        assert!(FragmentConfig::new().with_percentage(0.0).validate().unwrap_err().is_invalid_parameter());
        assert!(FragmentConfig::new().with_density(-1.0).validate().is_err());
        assert!(FragmentConfig::new().with_concurrency(0).validate().is_err());
    }

    #[test]
    fn prefix_defaults_to_input_stem() {
        let config = FragmentConfig::new();
        assert_eq!(config.prefix_for(Path::new("data/run.zarr")), "data/run");
        assert_eq!(config.with_prefix("x").prefix_for(Path::new("data/run.zarr")), "x");
    }
}
