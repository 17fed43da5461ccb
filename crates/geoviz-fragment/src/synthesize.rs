//! Fill a fragment's missing derived variables

use crate::params::ParticleProperties;
use crate::schema::{DerivedVariableSpec, CONSUMER_CLASS, CONSUMER_CLASS_ATTR, DERIVED_VARIABLES};
use geoviz_dataset::{ArrayData, Dataset, DatasetError, Variable, TIME, TRAJECTORY};
use std::fmt;

/// A variable the synthesizer inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedVariable {
    pub name: &'static str,
    /// Fill value with units, e.g. `0.005 m`
    pub description: String,
}

impl fmt::Display for AddedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.description)
    }
}

/// Insert every absent derived variable as a constant `(trajectory, time)` array
///
/// Existing variables are never replaced, so a second call adds nothing.
/// The consumer class attribute is set afterwards when absent.
///
/// # Errors
/// Returns [`DatasetError::MissingDimension`] when the fragment lacks the
/// trajectory or time dimension.
pub fn synthesize(
    fragment: &mut Dataset,
    params: &ParticleProperties,
) -> Result<Vec<AddedVariable>, DatasetError> {
    let len = fragment.trajectory_count()? * fragment.time_count()?;
    let mut added = Vec::new();

    for spec in &DERIVED_VARIABLES {
        if fragment.contains_variable(spec.name) {
            continue;
        }
        let value = spec.value.resolve(params);
        fragment.insert_variable(spec.name, derived_variable(spec, ArrayData::full(&value, len)))?;
        added.push(AddedVariable {
            name: spec.name,
            description: describe(&value, spec.units),
        });
    }

    fragment.set_attr_if_absent(CONSUMER_CLASS_ATTR, CONSUMER_CLASS);
    Ok(added)
}

fn derived_variable(spec: &DerivedVariableSpec, data: ArrayData) -> Variable {
    let mut var = Variable::new([TRAJECTORY, TIME], data).with_attr("units", spec.units);
    if let Some(classes) = spec.classes {
        var = var.with_attr("classes", classes);
    }
    var.with_attr("long_name", spec.long_name)
}

fn describe(value: &impl fmt::Display, units: &str) -> String {
    match units {
        "" | "1" => value.to_string(),
        _ => format!("{value} {units}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParticleClass, SizeClass};
    use crate::schema::derived_variable_names;
    use geoviz_dataset::{DType, Scalar};
    use geoviz_test_utils::particle_dataset;
    use pretty_assertions::assert_eq;

    #[test]
    fn adds_all_seven_with_schema_types() {
        let mut ds = particle_dataset(4, 3);
        let added = synthesize(&mut ds, &ParticleProperties::default()).unwrap();

        assert_eq!(added.len(), 7);
        for spec in &DERIVED_VARIABLES {
            let var = ds.variable(spec.name).unwrap();
            assert_eq!(var.dims(), &[TRAJECTORY.to_string(), TIME.to_string()]);
            assert_eq!(var.dtype(), spec.dtype);
            assert_eq!(var.data().len(), 12);
            assert_eq!(var.attr_str("units"), Some(spec.units));
            assert_eq!(var.attr_str("long_name"), Some(spec.long_name));
            assert_eq!(var.attr_str("classes"), spec.classes);
        }
        assert_eq!(ds.attrs()[CONSUMER_CLASS_ATTR], CONSUMER_CLASS);
    }

    #[test]
    fn diameter_in_meters() {
        let mut ds = particle_dataset(2, 2);
        let params =
            ParticleProperties::from_millimeters(ParticleClass::Other, SizeClass::Medium, 5.0, 1027.0).unwrap();
        let added = synthesize(&mut ds, &params).unwrap();

        let diameter = ds.variable("particulate_diameter").unwrap();
        assert_eq!(diameter.dtype(), DType::Float32);
        assert_eq!(diameter.data().get(3), Some(Scalar::Float32(0.005)));
        assert_eq!(added[0].to_string(), "particulate_diameter (0.005 m)");
    }

    #[test]
    fn second_call_is_a_no_op() {
        let mut ds = particle_dataset(3, 2);
        let params = ParticleProperties::default();
        synthesize(&mut ds, &params).unwrap();
        let once = ds.clone();

        let again = synthesize(&mut ds, &params).unwrap();
        assert!(again.is_empty());
        assert_eq!(ds, once);
    }

    #[test]
    fn existing_variables_and_class_attribute_kept() {
        let mut ds = particle_dataset(2, 2);
        ds.insert_variable(
            "settled",
            Variable::new([TRAJECTORY, TIME], ArrayData::UInt8(vec![1; 4])),
        )
        .unwrap();
        ds.set_attr(CONSUMER_CLASS_ATTR, "OceanDrift");

        let added = synthesize(&mut ds, &ParticleProperties::default()).unwrap();
        assert_eq!(added.len(), 6);
        assert!(added.iter().all(|a| a.name != "settled"));
        assert_eq!(ds.variable("settled").unwrap().data(), &ArrayData::UInt8(vec![1; 4]));
        assert_eq!(ds.attrs()[CONSUMER_CLASS_ATTR], "OceanDrift");
    }

    #[test]
    fn descriptions_follow_units() {
        let mut ds = particle_dataset(1, 1);
        let added = synthesize(&mut ds, &ParticleProperties::default()).unwrap();
        let text: Vec<String> = added.iter().map(ToString::to_string).collect();
        assert_eq!(
            text,
            vec![
                "particulate_diameter (0.0001 m)",
                "particulate_density (1027 kg m-3)",
                "particulate_class (other)",
                "particulate_size_class (medium)",
                "settled (0)",
                "ocean_vertical_diffusivity (0.02 m²/s)",
                "ocean_mixed_layer_thickness (50 m)",
            ]
        );
        assert_eq!(derived_variable_names().count(), added.len());
    }

    #[test]
    fn requires_trajectory_and_time() {
        let mut ds = Dataset::new();
        assert!(matches!(
            synthesize(&mut ds, &ParticleProperties::default()),
            Err(DatasetError::MissingDimension(_))
        ));
    }
}
