//! Fragmentation run: estimate, confirm, plan, then slice/synthesize/write per fragment

use crate::budget::{DatasetShape, MemoryEstimate, MemoryEstimator};
use crate::config::{FailurePolicy, FragmentConfig};
use crate::decision::{ConfirmPolicy, Decision};
use crate::error::{FragmentError, Result};
use crate::params::{FragmentPercentage, ParticleProperties};
use crate::plan::PartitionPlan;
use crate::schema::missing_derived_variables;
use crate::synthesize::{synthesize, AddedVariable};
use crate::writer::{FragmentWriter, Provenance};
use geoviz_dataset::{DatasetSink, DatasetSource, DatasetSummary};
use rayon::prelude::*;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every planned fragment was written
    Completed,
    /// The memory gate declined; nothing was written
    Aborted,
}

/// One fragment on disk
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFragment {
    /// 1-based
    pub index: usize,
    pub total: usize,
    pub range: Range<usize>,
    pub path: PathBuf,
    pub bytes: u64,
    /// Derived variables synthesized into this fragment
    pub added: Vec<AddedVariable>,
}

/// End-of-run report
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub source: DatasetSummary,
    pub estimate: MemoryEstimate,
    /// Absent when the run aborted before planning
    pub plan: Option<PartitionPlan>,
    /// Derived variables the source lacked
    pub missing_variables: Vec<&'static str>,
    pub fragments: Vec<WrittenFragment>,
    /// Size of the source on disk, when known
    pub source_bytes: Option<u64>,
}

impl RunReport {
    #[inline]
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Combined size of all fragments
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.fragments.iter().map(|f| f.bytes).sum()
    }

    /// Growth of the fragments over the source, in percent
    #[must_use]
    pub fn size_overhead_percent(&self) -> Option<f64> {
        self.source_bytes
            .filter(|&b| b > 0)
            .map(|b| (self.total_bytes() as f64 / b as f64 - 1.0) * 100.0)
    }

    pub fn output_paths(&self) -> impl Iterator<Item = &Path> {
        self.fragments.iter().map(|f| f.path.as_path())
    }
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outcome == RunOutcome::Aborted {
            writeln!(f, "Fragmentation cancelled due to memory concerns.")?;
            return writeln!(f, "{}", self.estimate.recommendation());
        }

        writeln!(f, "FRAGMENTATION COMPLETE")?;
        if let Some(source) = self.source_bytes {
            writeln!(f, "Original size: {:.2} MB", mb(source))?;
        }
        writeln!(f, "Total fragments size: {:.2} MB", mb(self.total_bytes()))?;
        if let Some(overhead) = self.size_overhead_percent() {
            writeln!(f, "Size overhead: {overhead:.1}%")?;
        }
        writeln!(f, "Created {} fragment(s):", self.fragment_count())?;
        for fragment in &self.fragments {
            writeln!(f, "  - {} ({:.2} MB)", fragment.path.display(), mb(fragment.bytes))?;
        }
        Ok(())
    }
}

/// Runs fragmentation against a sink
pub struct Fragmenter<'a> {
    config: FragmentConfig,
    percentage: FragmentPercentage,
    particle: ParticleProperties,
    sink: &'a dyn DatasetSink,
}

impl<'a> Fragmenter<'a> {
    /// Validate parameters; nothing is read or written yet
    ///
    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] for a bad percentage,
    /// particle property, or concurrency.
    pub fn new(config: FragmentConfig, sink: &'a dyn DatasetSink) -> Result<Self> {
        let (percentage, particle) = config.validate()?;
        Ok(Self {
            config,
            percentage,
            particle,
            sink,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &FragmentConfig {
        &self.config
    }

    /// Fragment `source`, consulting `policy` when the memory estimate is unsafe
    ///
    /// # Errors
    /// - [`FragmentError::Dataset`] when the source lacks trajectory/time
    /// - [`FragmentError::InvalidParameter`] when there is nothing to split or no prefix
    /// - [`FragmentError::FragmentFailed`] when a fragment cannot be produced
    pub fn run(&self, source: &dyn DatasetSource, policy: &dyn ConfirmPolicy) -> Result<RunReport> {
        let summary = source.describe();
        let shape = DatasetShape::of(&summary)?;
        info!(
            trajectories = shape.trajectories,
            times = shape.times,
            variables = shape.variables,
            percentage = self.percentage.get(),
            "fragmenting dataset"
        );

        let estimate = MemoryEstimator::new()
            .with_concurrency(self.config.concurrency)
            .with_available_memory(self.config.available_memory_bytes)
            .estimate(shape, self.percentage);
        info!(
            estimated_bytes = estimate.estimated_bytes,
            available_bytes = ?estimate.available_bytes,
            safe = estimate.safe,
            "memory check"
        );

        let mut report = RunReport {
            outcome: RunOutcome::Aborted,
            source_bytes: summary.size_bytes,
            missing_variables: missing_derived_variables(&summary),
            source: summary,
            estimate,
            plan: None,
            fragments: Vec::new(),
        };

        if !estimate.safe {
            warn!(
                recommended_percentage = estimate.recommended_percentage,
                "high memory usage predicted"
            );
            if policy.confirm(&estimate) == Decision::Abort {
                info!("fragmentation cancelled due to memory concerns");
                return Ok(report);
            }
        }

        let plan = PartitionPlan::new(shape.trajectories, self.percentage)?;
        info!(
            per_fragment = plan.per_fragment(),
            fragments = plan.len(),
            actual_percentage = plan.actual_percentage(),
            "fragmentation plan"
        );
        self.log_missing(&report.missing_variables);

        let prefix = match (&self.config.prefix, &report.source.path) {
            (Some(prefix), _) => prefix.clone(),
            (None, Some(path)) => self.config.prefix_for(path),
            (None, None) => return Err(FragmentError::invalid("no output prefix for an in-memory source")),
        };
        let writer = FragmentWriter::new(self.sink, prefix);
        writer.prepare()?;

        let original_file = report.source.file_name().unwrap_or_default();
        let produce = |index: usize, range: Range<usize>| -> Result<WrittenFragment> {
            self.produce(source, &writer, &original_file, index, plan.len(), range)
        };

        let results: Vec<(usize, Result<WrittenFragment>)> = if self.config.concurrency > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.concurrency)
                .build()
                .map_err(|e| FragmentError::Config(e.to_string()))?;
            let jobs: Vec<_> = plan.fragments().collect();
            pool.install(|| {
                jobs.into_par_iter()
                    .map(|(index, range)| (index, produce(index, range)))
                    .collect()
            })
        } else {
            let mut results = Vec::with_capacity(plan.len());
            for (index, range) in plan.fragments() {
                let result = produce(index, range);
                let failed = result.is_err();
                results.push((index, result));
                if failed {
                    break;
                }
            }
            results
        };

        let mut written = Vec::with_capacity(results.len());
        let mut failure = None;
        for (index, result) in results {
            match result {
                Ok(fragment) => written.push(fragment),
                Err(e) if failure.is_none() => failure = Some((index, e)),
                Err(e) => warn!(fragment = index, error = %e, "additional fragment failure"),
            }
        }
        if let Some((index, e)) = failure {
            return Err(self.fail(&writer, index, plan.len(), written, e));
        }

        report.outcome = RunOutcome::Completed;
        report.plan = Some(plan);
        report.fragments = written;
        info!(
            fragments = report.fragment_count(),
            total_bytes = report.total_bytes(),
            "fragmentation complete"
        );
        Ok(report)
    }

    fn produce(
        &self,
        source: &dyn DatasetSource,
        writer: &FragmentWriter<'_>,
        original_file: &str,
        index: usize,
        total: usize,
        range: Range<usize>,
    ) -> Result<WrittenFragment> {
        info!(fragment = index, total, start = range.start, end = range.end, "creating fragment");
        let mut fragment = source.read_slice(range.clone())?;

        let added = if self.config.add_sediment_vars {
            synthesize(&mut fragment, &self.particle)?
        } else {
            Vec::new()
        };
        for var in &added {
            info!(fragment = index, variable = var.name, value = %var.description, "added variable");
        }

        let provenance = Provenance {
            index,
            total,
            trajectories: range.clone(),
            original_file: original_file.to_string(),
        };
        let (path, bytes) = writer.write(&mut fragment, &provenance)?;
        info!(fragment = index, path = %path.display(), bytes, "fragment written");

        Ok(WrittenFragment {
            index,
            total,
            range,
            path,
            bytes,
            added,
        })
    }

    /// Apply the failure policy and build the run error
    fn fail(
        &self,
        writer: &FragmentWriter<'_>,
        index: usize,
        total: usize,
        written: Vec<WrittenFragment>,
        source: FragmentError,
    ) -> FragmentError {
        let mut remaining: Vec<PathBuf> = written.into_iter().map(|f| f.path).collect();
        error!(fragment = index, total, error = %source, "fragment failed");

        if self.config.on_failure == FailurePolicy::Remove {
            remaining.retain(|path| match writer.discard(path) {
                Ok(()) => {
                    info!(path = %path.display(), "removed fragment from failed run");
                    false
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not remove fragment");
                    true
                }
            });
        }

        FragmentError::FragmentFailed {
            index,
            total,
            written: remaining,
            source: Box::new(source),
        }
    }

    fn log_missing(&self, missing: &[&'static str]) {
        if missing.is_empty() {
            info!("all derived variables present in source");
        } else if self.config.add_sediment_vars {
            info!(missing = ?missing, "derived variables will be added to each fragment");
        } else {
            warn!(missing = ?missing, "derived variables missing and synthesis disabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{AutoAccept, AutoReject};
    use geoviz_test_utils::{particle_dataset, RecordingSink};

    fn config() -> FragmentConfig {
        FragmentConfig::new()
            .with_prefix("mem/run")
            .with_available_memory(1 << 40)
    }

    #[test]
    fn invalid_percentage_rejected_before_io() {
        let sink = RecordingSink::new();
        let err = Fragmenter::new(config().with_percentage(150.0), &sink).err().unwrap();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn in_memory_source_needs_prefix() {
        let sink = RecordingSink::new();
        let config = FragmentConfig::new().with_available_memory(1 << 40);
        let err = Fragmenter::new(config, &sink)
            .unwrap()
            .run(&particle_dataset(2, 2), &AutoReject)
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn report_overhead() {
        let sink = RecordingSink::new();
        let mut report = Fragmenter::new(config().with_percentage(50.0), &sink)
            .unwrap()
            .run(&particle_dataset(4, 2), &AutoAccept)
            .unwrap();
        assert_eq!(report.fragment_count(), 2);
        assert_eq!(report.size_overhead_percent(), None);

        report.source_bytes = Some(report.total_bytes() / 2);
        assert!((report.size_overhead_percent().unwrap() - 100.0).abs() < 1.0);
        assert!(report.to_string().contains("Created 2 fragment(s)"));
    }
}
