//! Runs the checklist against a store or an open source

use crate::checks::{check_file_access, default_checks, CheckContext, CheckRegistry};
use crate::config::ValidatorConfig;
use crate::overview::DatasetOverview;
use crate::report::ValidationReport;
use geoviz_dataset::DatasetSource;
use geoviz_zarr::ZarrSource;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Section name of the pre-open path inspection
pub const FILE_ACCESS: &str = "File Access";

/// Findings of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub report: ValidationReport,
}

/// Result of a validation run
///
/// `report` merges every section; it is complete even when individual
/// checks failed.
#[derive(Debug, Clone)]
pub struct Validation {
    /// Present once the source was opened
    pub overview: Option<DatasetOverview>,
    pub sections: Vec<CheckOutcome>,
    pub report: ValidationReport,
}

impl Validation {
    fn from_sections(overview: Option<DatasetOverview>, sections: Vec<CheckOutcome>) -> Self {
        let mut report = ValidationReport::new();
        for section in &sections {
            report.merge(section.report.clone());
        }
        Self {
            overview,
            sections,
            report,
        }
    }

    /// Whether the process should exit with status 0
    #[must_use]
    pub fn exit_success(&self) -> bool {
        self.report.exit_success()
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(overview) = &self.overview {
            writeln!(f, "{overview}")?;
        }
        writeln!(f, "VALIDATION CHECKS")?;
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}:", section.name)?;
            for (category, message) in section.report.entries() {
                writeln!(f, "  {}: {message}", category.label())?;
            }
        }
        writeln!(f)?;
        write!(f, "{}", self.report)
    }
}

/// Schema checklist over particle-tracking datasets
#[derive(Debug, Default)]
pub struct Validator {
    config: ValidatorConfig,
    checks: CheckRegistry,
}

impl Validator {
    /// Validator with the built-in checklist
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            checks: default_checks(),
        }
    }

    /// Replace the checklist
    #[must_use]
    pub fn with_checks(mut self, checks: CheckRegistry) -> Self {
        self.checks = checks;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a Zarr store on disk
    ///
    /// Inaccessible paths stop before opening; a store that fails to open
    /// yields a single error. Neither case returns `Err`.
    pub fn validate_path(&self, path: &Path) -> Validation {
        info!(path = %path.display(), "validating store");
        let access = check_file_access(path);
        if !access.is_valid() {
            return Validation::from_sections(None, vec![outcome(FILE_ACCESS, access)]);
        }

        let source = match ZarrSource::open(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "store failed to open");
                let mut report = ValidationReport::new();
                report.add_error(format!("Failed to open store: {e}"));
                let mut access = access;
                access.merge(report);
                return Validation::from_sections(None, vec![outcome(FILE_ACCESS, access)]);
            }
        };

        let mut validation = self.validate_source(&source);
        source.close();
        validation.sections.insert(0, outcome(FILE_ACCESS, access.clone()));
        let mut report = access;
        report.merge(validation.report);
        validation.report = report;
        validation
    }

    /// Run every registered check against an open source
    ///
    /// A failing check contributes one error naming it; the remaining checks
    /// still run.
    pub fn validate_source(&self, source: &dyn DatasetSource) -> Validation {
        let summary = source.describe();
        let ctx = CheckContext {
            source,
            summary: &summary,
            config: &self.config,
        };

        let mut sections = Vec::with_capacity(self.checks.len());
        for check in self.checks.iter() {
            debug!(check = check.name(), "running check");
            let report = match check.run(&ctx) {
                Ok(report) => report,
                Err(e) => {
                    warn!(check = check.name(), error = %e, "check failed");
                    let mut report = ValidationReport::new();
                    report.add_error(format!("Validation check failed: {}: {e}", check.name()));
                    report
                }
            };
            sections.push(outcome(check.name(), report));
        }

        let overview = DatasetOverview::new(summary, self.config.verbose);
        let validation = Validation::from_sections(Some(overview), sections);
        info!(
            passed = validation.report.passed.len(),
            missing = validation.report.missing.len(),
            warnings = validation.report.warnings.len(),
            errors = validation.report.errors.len(),
            "validation finished"
        );
        validation
    }
}

fn outcome(name: &'static str, report: ValidationReport) -> CheckOutcome {
    CheckOutcome { name, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::ValidationCheck;
    use crate::error::ValidationError;
    use geoviz_test_utils::particle_dataset;

    struct Exploding;

    impl ValidationCheck for Exploding {
        fn name(&self) -> &'static str {
            "Exploding"
        }

        fn run(&self, _: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
            Err(ValidationError::Sampling("no data".into()))
        }
    }

    struct Passing;

    impl ValidationCheck for Passing {
        fn name(&self) -> &'static str {
            "Passing"
        }

        fn run(&self, _: &CheckContext<'_>) -> Result<ValidationReport, ValidationError> {
            let mut report = ValidationReport::new();
            report.add_pass("fine");
            Ok(report)
        }
    }

    #[test]
    fn failing_check_does_not_stop_others() {
        let mut checks = CheckRegistry::new();
        checks.register(Exploding);
        checks.register(Passing);
        let validator = Validator::new(ValidatorConfig::default()).with_checks(checks);

        let validation = validator.validate_source(&particle_dataset(3, 3));
        assert_eq!(
            validation.report.errors,
            vec!["Validation check failed: Exploding: sampling failed: no data"]
        );
        assert_eq!(validation.report.passed, vec!["fine"]);
        assert_eq!(validation.sections.len(), 2);
        assert!(!validation.exit_success());
    }

    #[test]
    fn sections_follow_registry() {
        let validation = Validator::new(ValidatorConfig::new().with_quick(true)).validate_source(&particle_dataset(3, 3));
        let names: Vec<&str> = validation.sections.iter().map(|s| s.name).collect();
        assert_eq!(names, default_checks().names());
        assert!(validation.overview.is_some());
    }

    #[test]
    fn missing_path_stops_before_open() {
        let dir = tempfile::tempdir().unwrap();
        let validation = Validator::default().validate_path(&dir.path().join("absent.zarr"));
        assert!(validation.overview.is_none());
        assert_eq!(validation.sections.len(), 1);
        assert!(!validation.report.is_valid());
    }

    #[test]
    fn unopenable_store_is_single_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("broken.zarr");
        std::fs::create_dir(&store).unwrap();
        std::fs::write(store.join("zarr.json"), "{ not json").unwrap();

        let validation = Validator::default().validate_path(&store);
        assert!(validation.overview.is_none());
        assert_eq!(validation.report.errors.len(), 1);
        assert!(validation.report.errors[0].starts_with("Failed to open store: "));
    }
}
