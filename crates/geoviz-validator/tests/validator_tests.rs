//! Validation of synthesized, fragmented, and damaged datasets

use geoviz_dataset::{DatasetSink, TRAJECTORY};
use geoviz_fragment::{synthesize, AutoReject, FragmentConfig, Fragmenter, ParticleProperties};
use geoviz_test_utils::{particle_dataset, with_longitudes};
use geoviz_validator::{Validator, ValidatorConfig};
use geoviz_zarr::ZarrSink;
use pretty_assertions::assert_eq;

fn seeded() -> Validator {
    Validator::new(ValidatorConfig::new().with_seed(42))
}

#[test]
fn test_missing_variables_and_bad_longitude() {
    let mut lon = vec![170.0_f32; 20 * 10];
    lon[37] = -200.0;
    let mut ds = with_longitudes(particle_dataset(20, 10), lon);
    synthesize(&mut ds, &ParticleProperties::default()).unwrap();
    ds.remove_variable("particulate_diameter");
    ds.remove_variable("settled");

    let validation = seeded().validate_source(&ds);
    let report = &validation.report;

    assert_eq!(
        report.missing,
        vec![
            "particulate_diameter (Particle diameter)",
            "settled (Particle settled on seafloor)",
        ]
    );
    assert!(report
        .warnings
        .contains(&"Longitude sample values outside valid range [-180, 180]: [-200.00, 170.00]".to_string()));
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.is_valid());
    assert!(!report.has_all_required());
    assert!(!report.exit_success());
}

#[test]
fn test_synthesized_dataset_passes() {
    let mut ds = particle_dataset(12, 10);
    synthesize(&mut ds, &ParticleProperties::default()).unwrap();

    let validation = seeded().validate_source(&ds);
    let report = &validation.report;
    assert!(report.exit_success(), "{report}");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert!(report.passed.contains(&"OpenDrift class: SedimentDrift".to_string()));
    assert!(validation.to_string().contains("RESULT: Dataset passed all checks"));
}

#[test]
fn test_raw_model_output_lacks_required_variables() {
    let validation = seeded().validate_source(&particle_dataset(12, 10));
    assert_eq!(validation.report.missing.len(), 7);
    assert!(validation.report.is_valid());
    assert!(validation.to_string().contains("RESULT: Required variables are missing"));
}

#[test]
fn test_fragments_on_disk_validate() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run.zarr");
    ZarrSink::new().write(&particle_dataset(30, 12), &input).unwrap();

    let config = FragmentConfig::new().with_percentage(50.0).with_available_memory(1 << 40);
    let sink = ZarrSink::new();
    let report = Fragmenter::new(config, &sink)
        .unwrap()
        .run(&geoviz_zarr::ZarrSource::open(&input).unwrap(), &AutoReject)
        .unwrap();
    assert_eq!(report.fragment_count(), 2);

    let validator = seeded();
    let original = validator.validate_path(&input);
    assert!(!original.exit_success());
    assert_eq!(original.sections[0].name, "File Access");

    for fragment in &report.fragments {
        let validation = validator.validate_path(&fragment.path);
        assert!(validation.exit_success(), "{validation}");
        let overview = validation.overview.as_ref().unwrap();
        assert_eq!(overview.summary().dimension(TRAJECTORY), Some(15));
    }
}

#[test]
fn test_quick_mode_reports_no_sample() {
    let validation = Validator::new(ValidatorConfig::new().with_quick(true)).validate_source(&particle_dataset(12, 10));
    assert!(validation
        .report
        .info
        .contains(&"Skipping data sampling (quick mode)".to_string()));
    assert!(!validation.report.info.iter().any(|m| m.starts_with("Data integrity checked")));
}
