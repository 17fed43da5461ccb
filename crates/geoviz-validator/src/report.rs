//! Categorized validation results

use serde::Serialize;
use std::fmt;

/// Severity of one finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Passed,
    /// A required variable is absent
    Missing,
    Info,
    Warning,
    /// Dataset is unusable
    Error,
}

impl Category {
    /// Prefix used when rendering a message
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Missing => "MISSING",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Findings of one or more checks, grouped by category
///
/// Category order is fixed: passed, missing, info, warnings, errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub passed: Vec<String>,
    pub missing: Vec<String>,
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, message: impl Into<String>) {
        self.passed.push(message.into());
    }

    pub fn add_missing(&mut self, message: impl Into<String>) {
        self.missing.push(message.into());
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.info.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Append every finding of `other`, category by category
    pub fn merge(&mut self, other: Self) {
        self.passed.extend(other.passed);
        self.missing.extend(other.missing);
        self.info.extend(other.info);
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// No critical errors
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// No required variable is missing
    #[inline]
    #[must_use]
    pub fn has_all_required(&self) -> bool {
        self.missing.is_empty()
    }

    /// Whether the process should exit with status 0
    #[inline]
    #[must_use]
    pub fn exit_success(&self) -> bool {
        self.is_valid() && self.has_all_required()
    }

    /// Messages of one category
    #[must_use]
    pub fn messages(&self, category: Category) -> &[String] {
        match category {
            Category::Passed => &self.passed,
            Category::Missing => &self.missing,
            Category::Info => &self.info,
            Category::Warning => &self.warnings,
            Category::Error => &self.errors,
        }
    }

    /// Every finding in category order
    pub fn entries(&self) -> impl Iterator<Item = (Category, &str)> {
        const ORDER: [Category; 5] = [
            Category::Passed,
            Category::Missing,
            Category::Info,
            Category::Warning,
            Category::Error,
        ];
        ORDER
            .into_iter()
            .flat_map(move |c| self.messages(c).iter().map(move |m| (c, m.as_str())))
    }

    /// Total number of findings
    #[must_use]
    pub fn len(&self) -> usize {
        self.passed.len() + self.missing.len() + self.info.len() + self.warnings.len() + self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One-line verdict
    #[must_use]
    pub fn verdict(&self) -> &'static str {
        if !self.is_valid() {
            "Dataset has critical errors that prevent usage"
        } else if !self.has_all_required() {
            "Required variables are missing"
        } else {
            "Dataset passed all checks and contains all required variables"
        }
    }
}

const RULE: &str = "================================================================================";

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "VALIDATION SUMMARY")?;
        writeln!(f, "{RULE}")?;

        let sections = [
            (Category::Passed, "Passed Checks"),
            (Category::Missing, "Missing Variables"),
            (Category::Info, "Information"),
            (Category::Warning, "Warnings"),
            (Category::Error, "Critical Errors"),
        ];
        for (category, title) in sections {
            let messages = self.messages(category);
            if messages.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{title} ({}):", messages.len())?;
            for message in messages {
                writeln!(f, "  {}: {message}", category.label())?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "RESULT: {}", self.verdict())?;
        if self.is_valid() && !self.has_all_required() {
            writeln!(f)?;
            writeln!(f, "Recommendation: run `geoviz fragment` to add the missing variables.")?;
        } else if self.exit_success() {
            writeln!(f)?;
            writeln!(f, "If the dataset is too big to visualize at once, run `geoviz fragment`")?;
            writeln!(f, "to split it into smaller fragments that can be loaded one by one.")?;
        }
        write!(f, "{RULE}")
    }
}
