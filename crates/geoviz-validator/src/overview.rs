//! Human-readable dataset overview

use geoviz_dataset::{DatasetSummary, VariableInfo};
use serde_json::Value;
use std::fmt;

/// Global attributes shown when not verbose
pub const KEY_ATTRIBUTES: [&str; 5] = ["Conventions", "title", "opendrift_class", "history", "source"];

/// Dimensions, data variables, and global attributes of a source
#[derive(Debug, Clone)]
pub struct DatasetOverview {
    summary: DatasetSummary,
    verbose: bool,
}

impl DatasetOverview {
    #[must_use]
    pub fn new(summary: DatasetSummary, verbose: bool) -> Self {
        Self { summary, verbose }
    }

    #[must_use]
    pub fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Variables that are not dimension coordinates, sorted by name
    #[must_use]
    pub fn data_variables(&self) -> Vec<&VariableInfo> {
        let mut vars: Vec<&VariableInfo> = self
            .summary
            .variables
            .iter()
            .filter(|v| !(v.dims.len() == 1 && v.dims[0] == v.name))
            .collect();
        vars.sort_by(|a, b| a.name.cmp(&b.name));
        vars
    }

    fn fmt_variable(&self, f: &mut fmt::Formatter<'_>, var: &VariableInfo) -> fmt::Result {
        let dims = format!("({})", var.dims.join(", "));
        if self.verbose {
            writeln!(f)?;
            writeln!(f, "  {} {dims}", var.name)?;
            writeln!(f, "    Type: {}", var.dtype.name())?;
            if !var.attrs.is_empty() {
                writeln!(f, "    Attributes:")?;
                for (key, value) in &var.attrs {
                    writeln!(f, "      {key}: {}", display_value(value))?;
                }
            }
            return Ok(());
        }
        let units = var.attrs.get("units").map_or_else(|| "no units".to_string(), display_value);
        let long_name = var
            .attrs
            .get("long_name")
            .map_or_else(|| "no description".to_string(), display_value);
        writeln!(f, "  {:30} {dims:20} [{units}] - {long_name}", var.name)
    }
}

impl fmt::Display for DatasetOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DATASET OVERVIEW")?;
        writeln!(f)?;
        writeln!(f, "Dimensions:")?;
        for (name, size) in &self.summary.dims {
            writeln!(f, "  {name}: {}", thousands(*size))?;
        }

        let vars = self.data_variables();
        writeln!(f)?;
        writeln!(f, "Variables ({}):", vars.len())?;
        for var in vars {
            self.fmt_variable(f, var)?;
        }

        let attrs = &self.summary.attrs;
        if attrs.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Global Attributes ({}):", attrs.len())?;
        if self.verbose {
            for (key, value) in attrs {
                writeln!(f, "  {key}: {}", truncate(&display_value(value), 100))?;
            }
            return Ok(());
        }
        for key in KEY_ATTRIBUTES {
            if let Some(value) = attrs.get(key) {
                writeln!(f, "  {key}: {}", truncate(&display_value(value), 80))?;
            }
        }
        let others = attrs.keys().filter(|k| !KEY_ATTRIBUTES.contains(&k.as_str())).count();
        if others > 0 {
            writeln!(f, "  ... and {others} more (use --verbose to see all)")?;
        }
        Ok(())
    }
}

/// Attribute value without JSON quoting for strings
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cut `text` to `max` characters, ending in `...` when shortened
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// `1234567` as `1,234,567`
pub(crate) fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoviz_dataset::DatasetSource;
    use geoviz_test_utils::particle_dataset;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 80), "short");
        let long = "x".repeat(120);
        let cut = truncate(&long, 80);
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn lists_data_variables_sorted() {
        let overview = DatasetOverview::new(particle_dataset(3, 2).describe(), false);
        let names: Vec<&str> = overview.data_variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["lat", "lon", "status", "z"]);

        let text = overview.to_string();
        assert!(text.contains("trajectory: 3"));
        assert!(text.contains("Variables (4):"));
        assert!(text.contains("[degrees_east] - longitude"));
        assert!(text.contains("[no units] - no description"));
        assert!(text.contains("... and 1 more (use --verbose to see all)"));
    }

    #[test]
    fn verbose_shows_types_and_all_attributes() {
        let text = DatasetOverview::new(particle_dataset(3, 2).describe(), true).to_string();
        assert!(text.contains("    Type: float32"));
        assert!(text.contains("      units: degrees_north"));
        assert!(text.contains("  institution: GeoViz test suite"));
        assert!(!text.contains("use --verbose"));
    }
}
