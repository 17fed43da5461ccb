//! Partitioning of the trajectory dimension

use crate::error::{FragmentError, Result};
use crate::params::FragmentPercentage;
use std::ops::Range;

/// Disjoint, contiguous trajectory ranges covering `[0, trajectories)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    trajectories: usize,
    per_fragment: usize,
    ranges: Vec<Range<usize>>,
}

impl PartitionPlan {
    /// Split `trajectories` rows into fragments of `ceil(trajectories * pct / 100)`
    ///
    /// The last range holds the remainder and may be shorter.
    ///
    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] when there are no
    /// trajectories to split.
    pub fn new(trajectories: usize, percentage: FragmentPercentage) -> Result<Self> {
        if trajectories == 0 {
            return Err(FragmentError::invalid("dataset has no trajectories to fragment"));
        }
        let per_fragment = (trajectories as f64 * percentage.get() / 100.0).ceil() as usize;
        if per_fragment == 0 {
            return Err(FragmentError::invalid(format!(
                "{percentage} of {trajectories} trajectories rounds to an empty fragment"
            )));
        }
        let per_fragment = per_fragment.min(trajectories);
        let count = trajectories.div_ceil(per_fragment);

        let ranges = (0..count)
            .map(|k| k * per_fragment..((k + 1) * per_fragment).min(trajectories))
            .collect();

        Ok(Self {
            trajectories,
            per_fragment,
            ranges,
        })
    }

    /// Trajectories in every fragment but possibly the last
    #[inline]
    #[must_use]
    pub fn per_fragment(&self) -> usize {
        self.per_fragment
    }

    #[inline]
    #[must_use]
    pub fn trajectories(&self) -> usize {
        self.trajectories
    }

    /// Number of fragments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// `(1-based index, range)` pairs in order
    pub fn fragments(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        self.ranges.iter().cloned().enumerate().map(|(i, r)| (i + 1, r))
    }

    /// Share of the source one full fragment actually holds
    #[must_use]
    pub fn actual_percentage(&self) -> f64 {
        self.per_fragment as f64 / self.trajectories as f64 * 100.0
    }
}

/// `{prefix}_fragment_{index:03}_of_{total:03}{extension}`
///
/// Counts of 1000 or more widen past three digits and no longer sort
/// lexically.
#[must_use]
pub fn fragment_file_name(prefix: &str, index: usize, total: usize, extension: &str) -> String {
    format!("{prefix}_fragment_{index:03}_of_{total:03}{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn pct(v: f64) -> FragmentPercentage {
        FragmentPercentage::new(v).unwrap()
    }

    #[test]
    fn forty_percent_of_250() {
        let plan = PartitionPlan::new(250, pct(40.0)).unwrap();
        assert_eq!(plan.per_fragment(), 100);
        assert_eq!(plan.ranges(), &[0..100, 100..200, 200..250]);
        assert!((plan.actual_percentage() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn full_percentage_is_one_fragment() {
        let plan = PartitionPlan::new(17, FragmentPercentage::FULL).unwrap();
        assert_eq!(plan.ranges(), &[0..17]);
    }

    #[test]
    fn tiny_percentage_still_takes_one_trajectory() {
        let plan = PartitionPlan::new(3, pct(0.001)).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.fragments().last(), Some((3, 2..3)));
    }

    #[test]
    fn empty_source_rejected() {
        assert!(PartitionPlan::new(0, pct(10.0)).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(fragment_file_name("out/run", 2, 12, ".zarr"), "out/run_fragment_002_of_012.zarr");
        assert_eq!(fragment_file_name("x", 1000, 1000, ""), "x_fragment_1000_of_1000");
    }

    proptest! {
        #[test]
        fn ranges_cover_exactly(trajectories in 1usize..50_000, p in 0.001f64..=100.0) {
            let plan = PartitionPlan::new(trajectories, pct(p)).unwrap();
            let per = (trajectories as f64 * p / 100.0).ceil() as usize;
            prop_assert_eq!(plan.per_fragment(), per);
            prop_assert_eq!(plan.len(), trajectories.div_ceil(per));

            let mut next = 0;
            for range in plan.ranges() {
                prop_assert_eq!(range.start, next);
                prop_assert!(range.end > range.start);
                prop_assert!(range.len() <= per);
                next = range.end;
            }
            prop_assert_eq!(next, trajectories);
            prop_assert_eq!(plan.ranges().iter().map(|r| r.len()).sum::<usize>(), trajectories);
        }
    }
}
