//! Pre-flight memory budget estimation
//!
//! The estimate is linear in the fragment percentage: a fragment holds
//! `ceil(trajectories * pct / 100)` rows of every data variable, each value
//! counted as 4 bytes and tripled for the in-memory copy plus encoding.
//! Because of that linearity, scaling the percentage by
//! `target / estimate` lands the estimate on the target.

use crate::params::FragmentPercentage;
use geoviz_dataset::{DatasetError, DatasetSummary};
use tracing::warn;

/// Bytes assumed per stored value
pub const BYTES_PER_VALUE: u64 = 4;

/// Multiplier covering the in-memory copy and encoding overhead
pub const SAFETY_MULTIPLIER: u64 = 3;

/// A plan is safe while its estimate stays below this share of available memory
pub const SAFE_FRACTION: f64 = 0.5;

/// Share of available memory a recommended percentage aims for
pub const TARGET_FRACTION: f64 = 0.3;

/// Lower bound of a recommended percentage
pub const MIN_RECOMMENDED_PERCENTAGE: f64 = 1.0;

/// Sizes the estimate depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetShape {
    pub trajectories: usize,
    pub times: usize,
    /// Data variables only; dimension coordinates are not counted
    pub variables: usize,
}

impl DatasetShape {
    /// Shape of a described source
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingDimension`] without trajectory or time.
    pub fn of(summary: &DatasetSummary) -> Result<Self, DatasetError> {
        Ok(Self {
            trajectories: summary.trajectory_count()?,
            times: summary.time_count()?,
            variables: summary.data_variable_count(),
        })
    }
}

/// Outcome of the pre-flight check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryEstimate {
    /// Requested percentage
    pub percentage: f64,
    /// Predicted peak bytes (all concurrent fragments)
    pub estimated_bytes: u64,
    /// Available memory, when known
    pub available_bytes: Option<u64>,
    /// Concurrent fragments the estimate covers
    pub concurrency: usize,
    pub safe: bool,
    /// Percentage predicted to fit; equals `percentage` when safe
    pub recommended_percentage: f64,
}

impl MemoryEstimate {
    /// Estimate as a fraction of available memory
    #[must_use]
    pub fn usage_ratio(&self) -> Option<f64> {
        self.available_bytes
            .filter(|&a| a > 0)
            .map(|a| self.estimated_bytes as f64 / a as f64)
    }

    /// Approximate fragment count at the recommended percentage
    ///
    /// `None` when no positive percentage can be recommended, as with no
    /// available memory at all.
    #[must_use]
    pub fn fragments_at_recommended(&self) -> Option<usize> {
        let pct = self.recommended_percentage;
        (pct.is_finite() && pct > 0.0).then(|| (100.0 / pct).floor() as usize)
    }

    /// `Recommended percentage: P% (~N fragments)`, without the count when there is none
    #[must_use]
    pub fn recommendation(&self) -> String {
        match self.fragments_at_recommended() {
            Some(n) => format!("Recommended percentage: {:.1}% (~{n} fragments)", self.recommended_percentage),
            None => format!("Recommended percentage: {:.1}%", self.recommended_percentage),
        }
    }
}

/// Bytes one fragment is predicted to need
#[must_use]
pub fn fragment_bytes(shape: DatasetShape, percentage: FragmentPercentage) -> u64 {
    let fragment_traj = (shape.trajectories as f64 * percentage.get() / 100.0).ceil() as u64;
    fragment_traj * shape.times as u64 * BYTES_PER_VALUE * shape.variables as u64 * SAFETY_MULTIPLIER
}

/// Classify a plan against available memory
///
/// Pure: the caller supplies available memory. `None` means it could not be
/// determined, in which case the plan is reported as safe.
#[must_use]
pub fn estimate(
    shape: DatasetShape,
    percentage: FragmentPercentage,
    concurrency: usize,
    available_bytes: Option<u64>,
) -> MemoryEstimate {
    let concurrency = concurrency.max(1);
    let estimated_bytes = fragment_bytes(shape, percentage).saturating_mul(concurrency as u64);
    let pct = percentage.get();

    let safe = match available_bytes {
        None => true,
        Some(_) if estimated_bytes == 0 => true,
        Some(available) => (estimated_bytes as f64) < SAFE_FRACTION * available as f64,
    };

    let recommended_percentage = match available_bytes {
        Some(available) if !safe => {
            let raw = pct * (TARGET_FRACTION * available as f64) / estimated_bytes as f64;
            let clamped = raw.clamp(MIN_RECOMMENDED_PERCENTAGE, 100.0);
            // the floor never recommends more than was asked for
            if clamped < pct {
                clamped
            } else {
                raw
            }
        }
        _ => pct,
    };

    MemoryEstimate {
        percentage: pct,
        estimated_bytes,
        available_bytes,
        concurrency,
        safe,
        recommended_percentage,
    }
}

/// Memory estimator bound to the host
#[derive(Debug, Clone)]
pub struct MemoryEstimator {
    concurrency: usize,
    available_override: Option<u64>,
}

impl Default for MemoryEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEstimator {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            concurrency: 1,
            available_override: None,
        }
    }

    /// Fragments held in memory at once
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Use a fixed amount of available memory instead of probing the host
    #[inline]
    #[must_use]
    pub fn with_available_memory(mut self, bytes: Option<u64>) -> Self {
        self.available_override = bytes;
        self
    }

    /// Available memory: the override, else the host's reading
    #[must_use]
    pub fn available_memory_bytes(&self) -> Option<u64> {
        self.available_override.or_else(system_available_memory)
    }

    /// Estimate a plan for `shape`
    #[must_use]
    pub fn estimate(&self, shape: DatasetShape, percentage: FragmentPercentage) -> MemoryEstimate {
        let available = self.available_memory_bytes();
        if available.is_none() {
            warn!("available memory unknown; memory safety check skipped");
        }
        estimate(shape, percentage, self.concurrency, available)
    }
}

/// `MemAvailable` from `/proc/meminfo`, in bytes
#[must_use]
pub fn system_available_memory() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_meminfo(&meminfo)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Parse the `MemAvailable:   12345678 kB` line
fn parse_meminfo(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn pct(v: f64) -> FragmentPercentage {
        FragmentPercentage::new(v).unwrap()
    }

    fn shape(trajectories: usize, times: usize, variables: usize) -> DatasetShape {
        DatasetShape {
            trajectories,
            times,
            variables,
        }
    }

    #[test]
    fn estimate_formula() {
        // ceil(1000 * 0.1) = 100 rows, 100 * 50 * 4 * 6 * 3
        let est = estimate(shape(1000, 50, 6), pct(10.0), 1, Some(GIB));
        assert_eq!(est.estimated_bytes, 360_000);
        assert!(est.safe);
        assert_eq!(est.recommended_percentage, 10.0);
    }

    #[test]
    fn unsafe_plan_recommends_smaller_share() {
        // 100 * 1000 * 4 * 10 * 3 = 12_000_000 bytes against 10 MB available
        let est = estimate(shape(100, 1000, 10), pct(100.0), 1, Some(10_000_000));
        assert!(!est.safe);
        assert!((est.recommended_percentage - 25.0).abs() < 1e-9);
        assert_eq!(est.fragments_at_recommended(), Some(4));
        assert!((est.usage_ratio().unwrap() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn no_available_memory_has_no_fragment_count() {
        let est = estimate(shape(100, 10, 4), pct(0.5), 1, Some(0));
        assert!(!est.safe);
        assert_eq!(est.recommended_percentage, 0.0);
        assert_eq!(est.fragments_at_recommended(), None);
        assert_eq!(est.recommendation(), "Recommended percentage: 0.0%");
    }

    #[test]
    fn concurrency_multiplies_estimate() {
        let one = estimate(shape(1000, 100, 4), pct(10.0), 1, None);
        let four = estimate(shape(1000, 100, 4), pct(10.0), 4, None);
        assert_eq!(four.estimated_bytes, one.estimated_bytes * 4);
        assert_eq!(four.concurrency, 4);
    }

    #[test]
    fn unknown_memory_is_safe() {
        let est = estimate(shape(1_000_000, 10_000, 50), pct(100.0), 1, None);
        assert!(est.safe);
        assert_eq!(est.usage_ratio(), None);
    }

    #[test]
    fn override_wins_over_host() {
        let estimator = MemoryEstimator::new().with_available_memory(Some(42));
        assert_eq!(estimator.available_memory_bytes(), Some(42));
    }

    #[test]
    fn meminfo_parsing() {
        let text = "MemTotal:       16318412 kB\nMemFree:  1 kB\nMemAvailable:    8000000 kB\n";
        assert_eq!(parse_meminfo(text), Some(8_000_000 * 1024));
        assert_eq!(parse_meminfo("MemTotal: 1 kB\n"), None);
    }

    proptest! {
        #[test]
        fn estimate_is_monotone_in_percentage(
            trajectories in 1usize..100_000,
            times in 1usize..1000,
            variables in 0usize..40,
            a in 0.01f64..=100.0,
            b in 0.01f64..=100.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let s = shape(trajectories, times, variables);
            prop_assert!(fragment_bytes(s, pct(lo)) <= fragment_bytes(s, pct(hi)));
        }

        #[test]
        fn unsafe_implies_smaller_recommendation(
            trajectories in 1usize..100_000,
            times in 1usize..1000,
            variables in 1usize..40,
            p in 0.01f64..=100.0,
            available in 1u64..(8 * GIB),
        ) {
            let est = estimate(shape(trajectories, times, variables), pct(p), 1, Some(available));
            if !est.safe {
                prop_assert!(est.recommended_percentage < p);
                prop_assert!(est.recommended_percentage <= 100.0);
            } else {
                prop_assert_eq!(est.recommended_percentage, p);
            }
        }
    }
}
