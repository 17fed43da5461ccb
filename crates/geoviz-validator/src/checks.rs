//! Validation checks and their registry
//!
//! Each check inspects one aspect of a source and returns a partial
//! [`ValidationReport`]. Checks are independent; the [`Validator`](crate::Validator)
//! runs them in registry order and merges their findings.

use crate::config::ValidatorConfig;
use crate::error::ValidationError;
use crate::overview::{display_value, thousands};
use crate::report::ValidationReport;
use geoviz_dataset::{disk_usage, DatasetSource, DatasetSummary, TIME, TRAJECTORY};
use geoviz_fragment::{CONSUMER_CLASS, CONSUMER_CLASS_ATTR, DERIVED_VARIABLES};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

/// Per-particle variables most particle-model outputs carry
pub const TRAJECTORY_VARIABLES: [(&str, &str); 4] = [
    ("lon", "Longitude"),
    ("lat", "Latitude"),
    ("z", "Depth"),
    ("status", "Particle status"),
];

/// Global attributes whose absence is reported as info
pub const RECOMMENDED_ATTRIBUTES: [&str; 5] = ["title", "institution", "source", "history", "Conventions"];

/// Dimensions below this size draw a warning
pub const FEW_ELEMENTS: usize = 10;

/// Everything a check may inspect
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub source: &'a dyn DatasetSource,
    pub summary: &'a DatasetSummary,
    pub config: &'a ValidatorConfig,
}

/// One item of the validation checklist
pub trait ValidationCheck: Send + Sync {
    /// Section title shown in reports
    fn name(&self) -> &'static str;

    /// Inspect the source
    ///
    /// # Errors
    /// An error is recorded against this check only; later checks still run.
    fn run(&self, ctx: &CheckContext<'_>) -> Result<ValidationReport, ValidationError>;
}

/// Ordered set of checks
pub struct CheckRegistry {
    checks: Vec<Box<dyn ValidationCheck>>,
}

impl Default for CheckRegistry {
    fn default() -> Self {
        default_checks()
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRegistry").field("checks", &self.names()).finish()
    }
}

impl CheckRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Append a check; checks run in registration order
    pub fn register<C: ValidationCheck + 'static>(&mut self, check: C) {
        self.checks.push(Box::new(check));
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ValidationCheck> {
        self.checks.iter().map(|c| &**c)
    }
}

/// Registry with the built-in checklist
#[must_use]
pub fn default_checks() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    registry.register(DimensionsCheck);
    registry.register(DerivedVariablesCheck);
    registry.register(TrajectoryVariablesCheck);
    registry.register(AttributesCheck);
    registry.register(DataIntegrityCheck);
    registry
}

/// Pre-open inspection of a store path
///
/// An error here means the store should not be opened.
#[must_use]
pub fn check_file_access(path: &Path) -> ValidationReport {
    let mut report = ValidationReport::new();
    if !path.exists() {
        report.add_error(format!("Store not found: {}", path.display()));
        return report;
    }
    if !path.is_dir() {
        report.add_error(format!("Path is not a directory store: {}", path.display()));
        return report;
    }
    if path.extension().and_then(|e| e.to_str()) != Some("zarr") {
        report.add_warning("Store does not have .zarr extension");
    }
    match disk_usage(path) {
        #[allow(clippy::cast_precision_loss)]
        Ok(bytes) => report.add_info(format!("Store size: {:.2} MB", bytes as f64 / (1024.0 * 1024.0))),
        Err(e) => report.add_warning(format!("Could not determine store size: {e}")),
    }
    report.add_pass("Store exists and is accessible");
    report
}

/// Trajectory and time dimensions exist and are non-trivial
#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionsCheck;

impl ValidationCheck for DimensionsCheck {
    fn name(&self) -> &'static str {
        "Dimensions"
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::new();
        for dim in [TRAJECTORY, TIME] {
            match ctx.summary.dimension(dim) {
                Some(size) => {
                    report.add_pass(format!("Required dimension '{dim}' present ({} elements)", thousands(size)));
                }
                None => report.add_error(format!("Missing required dimension: {dim}")),
            }
        }

        let (Some(trajectories), Some(times)) = (ctx.summary.dimension(TRAJECTORY), ctx.summary.dimension(TIME))
        else {
            return Ok(report);
        };
        report.add_info(format!("Total data points: {}", thousands(trajectories * times)));

        if trajectories < 1 {
            report.add_error("No trajectories in dataset");
        } else if trajectories < FEW_ELEMENTS {
            report.add_warning(format!("Very few trajectories ({trajectories})"));
        }
        if times < 1 {
            report.add_error("No time steps in dataset");
        } else if times < FEW_ELEMENTS {
            report.add_warning(format!("Very few time steps ({times})"));
        }
        Ok(report)
    }
}

/// All seven consumer variables are present
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedVariablesCheck;

impl ValidationCheck for DerivedVariablesCheck {
    fn name(&self) -> &'static str {
        "SedimentDrift Variables"
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::new();
        for spec in &DERIVED_VARIABLES {
            if ctx.summary.contains_variable(spec.name) {
                report.add_pass(format!("Required variable '{}' present", spec.name));
            } else {
                report.add_missing(format!("{} ({})", spec.name, spec.long_name));
            }
        }
        Ok(report)
    }
}

/// Common particle variables; absence only warns
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryVariablesCheck;

impl ValidationCheck for TrajectoryVariablesCheck {
    fn name(&self) -> &'static str {
        "Trajectory Variables"
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::new();
        for (name, description) in TRAJECTORY_VARIABLES {
            if ctx.summary.contains_variable(name) {
                report.add_pass(format!("Trajectory variable '{name}' present ({description})"));
            } else {
                report.add_warning(format!("Common variable '{name}' not found ({description})"));
            }
        }
        Ok(report)
    }
}

/// Consumer class and recommended metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributesCheck;

impl ValidationCheck for AttributesCheck {
    fn name(&self) -> &'static str {
        "Attributes"
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::new();
        let attrs = &ctx.summary.attrs;

        match attrs.get(CONSUMER_CLASS_ATTR).map(display_value) {
            Some(class) => {
                report.add_pass(format!("OpenDrift class: {class}"));
                if class != CONSUMER_CLASS {
                    report.add_info(format!("OpenDrift class is '{class}' (expected '{CONSUMER_CLASS}')"));
                }
            }
            None => report.add_warning(format!("Missing '{CONSUMER_CLASS_ATTR}' attribute")),
        }

        for attr in RECOMMENDED_ATTRIBUTES {
            if attrs.contains_key(attr) {
                report.add_pass(format!("Metadata attribute '{attr}' present"));
            } else {
                report.add_info(format!("Optional metadata '{attr}' not present"));
            }
        }
        Ok(report)
    }
}

/// Coordinate ranges over a bounded random sample
#[derive(Debug, Clone, Copy, Default)]
pub struct DataIntegrityCheck;

/// Coordinate variable with its valid closed range
struct CoordinateBounds {
    variable: &'static str,
    label: &'static str,
    min: f64,
    max: f64,
}

const COORDINATE_BOUNDS: [CoordinateBounds; 2] = [
    CoordinateBounds {
        variable: "lon",
        label: "Longitude",
        min: -180.0,
        max: 180.0,
    },
    CoordinateBounds {
        variable: "lat",
        label: "Latitude",
        min: -90.0,
        max: 90.0,
    },
];

impl ValidationCheck for DataIntegrityCheck {
    fn name(&self) -> &'static str {
        "Data Integrity"
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::new();
        if ctx.config.quick {
            report.add_info("Skipping data sampling (quick mode)");
            return Ok(report);
        }
        report.add_info("Sampling data for integrity checks...");

        let mut rng = match ctx.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let limit = ctx.config.sample_limit;
        let trajectories = sample_indices(&mut rng, ctx.summary.dimension(TRAJECTORY).unwrap_or(0), limit);
        let times = sample_indices(&mut rng, ctx.summary.dimension(TIME).unwrap_or(0), limit);
        tracing::debug!(trajectories = trajectories.len(), times = times.len(), "sampling coordinates");

        for bounds in &COORDINATE_BOUNDS {
            if !ctx.summary.contains_variable(bounds.variable) || trajectories.is_empty() {
                continue;
            }
            match sampled_values(ctx, bounds.variable, &trajectories, &times) {
                Ok(values) => check_range(&mut report, bounds, &values),
                Err(e) => report.add_warning(format!(
                    "Could not validate {}: {e}",
                    bounds.label.to_lowercase()
                )),
            }
        }

        report.add_info(format!(
            "Data integrity checked using {}×{} sample",
            trajectories.len(),
            times.len()
        ));
        Ok(report)
    }
}

/// Up to `limit` distinct indices below `len`, ascending; all of them when `len <= limit`
pub fn sample_indices(rng: &mut StdRng, len: usize, limit: usize) -> Vec<usize> {
    if len <= limit {
        return (0..len).collect();
    }
    let mut indices = rand::seq::index::sample(rng, len, limit).into_vec();
    indices.sort_unstable();
    indices
}

/// Values of `name` at the sampled (trajectory, time) pairs, NaN removed
///
/// Variables not laid out as `(trajectory, time)` contribute every value of
/// the sampled trajectories.
fn sampled_values(
    ctx: &CheckContext<'_>,
    name: &str,
    trajectories: &[usize],
    times: &[usize],
) -> Result<Vec<f64>, ValidationError> {
    let var = ctx.source.read_variable_rows(name, trajectories)?;
    let values = var
        .data()
        .to_f64()
        .ok_or_else(|| ValidationError::Sampling(format!("variable '{name}' is not numeric")))?;

    let is_trajectory_time = var.dims().len() == 2 && var.dims()[0] == TRAJECTORY && var.dims()[1] == TIME;
    let picked = if is_trajectory_time {
        let row_len = ctx.summary.dimension(TIME).unwrap_or(0);
        let mut picked = Vec::with_capacity(trajectories.len() * times.len());
        for row in 0..trajectories.len() {
            for &t in times {
                let value = values.get(row * row_len + t).ok_or_else(|| {
                    ValidationError::Sampling(format!("variable '{name}' is shorter than its dimensions"))
                })?;
                picked.push(*value);
            }
        }
        picked
    } else {
        values
    };
    Ok(picked.into_iter().filter(|v| !v.is_nan()).collect())
}

fn check_range(report: &mut ValidationReport, bounds: &CoordinateBounds, values: &[f64]) {
    let Some((min, max)) = values
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    else {
        return;
    };
    if min < bounds.min || max > bounds.max {
        report.add_warning(format!(
            "{} sample values outside valid range [{}, {}]: [{min:.2}, {max:.2}]",
            bounds.label, bounds.min, bounds.max
        ));
    } else {
        report.add_pass(format!("{} sample range valid: [{min:.2}, {max:.2}]", bounds.label));
    }
}
