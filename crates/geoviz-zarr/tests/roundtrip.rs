//! Write datasets to zarr stores and read them back

use geoviz_dataset::{ArrayData, DatasetSink, DatasetSource, DType, Variable, TIME, TRAJECTORY};
use geoviz_test_utils::particle_dataset;
use geoviz_zarr::{ZarrSink, ZarrSource, ARRAY_DIMENSIONS};
use pretty_assertions::assert_eq;

#[test]
fn written_store_reopens_with_same_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.zarr");
    let ds = particle_dataset(12, 5);

    let bytes = ZarrSink::new().with_chunk_trajectories(4).write(&ds, &path).unwrap();
    assert!(bytes > 0);

    let source = ZarrSource::open(&path).unwrap();
    let summary = source.describe();
    assert_eq!(summary.trajectory_count().unwrap(), 12);
    assert_eq!(summary.time_count().unwrap(), 5);
    assert_eq!(summary.attrs.get("title"), ds.attrs().get("title"));
    assert_eq!(summary.size_bytes, Some(bytes));

    let lon = summary.variable("lon").unwrap();
    assert_eq!(lon.dims, vec![TRAJECTORY.to_string(), TIME.to_string()]);
    assert_eq!(lon.dtype, DType::Float32);
    assert_eq!(lon.attr_str("units"), Some("degrees_east"));
    assert!(!lon.attrs.contains_key(ARRAY_DIMENSIONS));
}

#[test]
fn slice_reads_only_requested_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice.zarr");
    let ds = particle_dataset(10, 3);
    ZarrSink::new().with_chunk_trajectories(3).write(&ds, &path).unwrap();

    let source = ZarrSource::open(&path).unwrap();
    let fragment = source.read_slice(4..7).unwrap();
    let expected = ds.slice_trajectory(4..7).unwrap();

    assert_eq!(fragment.trajectory_count().unwrap(), 3);
    assert_eq!(fragment.variable("lat").unwrap().data(), expected.variable("lat").unwrap().data());
    assert_eq!(fragment.variable(TIME).unwrap().data(), ds.variable(TIME).unwrap().data());
    source.close();
}

#[test]
fn sampled_rows_follow_requested_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.zarr");
    let ds = particle_dataset(6, 2);
    ZarrSink::new().write(&ds, &path).unwrap();

    let source = ZarrSource::open(&path).unwrap();
    let rows = source.read_variable_rows("lon", &[5, 0]).unwrap();
    let expected = ds.take_variable_rows("lon", &[5, 0]).unwrap();
    assert_eq!(rows.data(), expected.data());

    assert!(source.read_variable_rows("lon", &[6]).is_err());
    assert!(source.read_variable_rows("missing", &[0]).is_err());
}

#[test]
fn string_variables_survive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strings.zarr");
    let mut ds = particle_dataset(2, 2);
    ds.insert_variable(
        "particulate_class",
        Variable::new([TRAJECTORY, TIME], ArrayData::String(vec!["other".to_string(); 4])),
    )
    .unwrap();
    ZarrSink::new().write(&ds, &path).unwrap();

    let back = ZarrSource::open(&path).unwrap().read_slice(0..2).unwrap();
    assert_eq!(
        back.variable("particulate_class").unwrap().data(),
        &ArrayData::String(vec!["other".to_string(); 4])
    );
}

#[test]
fn overwrite_replaces_existing_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("again.zarr");
    ZarrSink::new().write(&particle_dataset(4, 2), &path).unwrap();

    assert!(ZarrSink::new().write(&particle_dataset(2, 2), &path).is_err());
    ZarrSink::new().with_overwrite(true).write(&particle_dataset(2, 2), &path).unwrap();
    assert_eq!(ZarrSource::open(&path).unwrap().describe().trajectory_count().unwrap(), 2);
}

#[test]
fn parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out/run.zarr");
    ZarrSink::new().write(&particle_dataset(1, 1), &path).unwrap();
    assert!(path.is_dir());
}
