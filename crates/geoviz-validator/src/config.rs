//! Validator configuration

use serde::{Deserialize, Serialize};

/// Default bound on sampled trajectories and time steps
pub const DEFAULT_SAMPLE_LIMIT: usize = 100;

/// Options for one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Render per-variable types and every attribute in the overview
    pub verbose: bool,
    /// Skip the sampled data-integrity check
    pub quick: bool,
    /// Maximum trajectories and maximum time steps in the sample
    pub sample_limit: usize,
    /// Fixed sampling seed; random when unset
    pub seed: Option<u64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            quick: false,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            seed: None,
        }
    }
}

impl ValidatorConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Set the sample bound (at least 1)
    #[inline]
    #[must_use]
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit.max(1);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ValidatorConfig::default();
        assert!(!config.quick);
        assert_eq!(config.sample_limit, 100);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn sample_limit_never_zero() {
        assert_eq!(ValidatorConfig::new().with_sample_limit(0).sample_limit, 1);
    }
}
