//! Testing utilities for GeoViz workspace
//!
//! Synthetic particle-tracking datasets and in-memory sinks.

#![allow(missing_docs)]

use geoviz_dataset::{ArrayData, Dataset, DatasetError, DatasetSink, Variable, TIME, TRAJECTORY};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Dataset shaped like particle-model output without any sediment variables
///
/// Longitudes lie in [0, 10), latitudes in [50, 60), depth is non-positive.
pub fn particle_dataset(trajectories: usize, times: usize) -> Dataset {
    let mut ds = Dataset::with_trajectory_time(trajectories, times);
    let n = trajectories * times;

    let lon: Vec<f32> = (0..n).map(|i| (i % 1000) as f32 / 100.0).collect();
    let lat: Vec<f32> = (0..n).map(|i| 50.0 + (i % 1000) as f32 / 100.0).collect();
    let z: Vec<f32> = (0..n).map(|i| -((i % times.max(1)) as f32)).collect();

    ds.insert_variable(
        TRAJECTORY,
        Variable::new([TRAJECTORY], ArrayData::Int32((0..trajectories as i32).collect()))
            .with_attr("cf_role", "trajectory_id"),
    )
    .unwrap();
    ds.insert_variable(
        TIME,
        Variable::new([TIME], ArrayData::Float64((0..times).map(|t| t as f64 * 3600.0).collect()))
            .with_attr("units", "seconds since 1970-01-01 00:00:00"),
    )
    .unwrap();
    ds.insert_variable(
        "lon",
        Variable::new([TRAJECTORY, TIME], ArrayData::Float32(lon))
            .with_attr("units", "degrees_east")
            .with_attr("long_name", "longitude"),
    )
    .unwrap();
    ds.insert_variable(
        "lat",
        Variable::new([TRAJECTORY, TIME], ArrayData::Float32(lat))
            .with_attr("units", "degrees_north")
            .with_attr("long_name", "latitude"),
    )
    .unwrap();
    ds.insert_variable(
        "z",
        Variable::new([TRAJECTORY, TIME], ArrayData::Float32(z)).with_attr("units", "m"),
    )
    .unwrap();
    ds.insert_variable(
        "status",
        Variable::new([TRAJECTORY, TIME], ArrayData::Int32(vec![0; n])),
    )
    .unwrap();

    ds.set_attr("title", "Synthetic particle run");
    ds.set_attr("institution", "GeoViz test suite");
    ds.set_attr("Conventions", "CF-1.8");
    ds
}

/// Replace the longitude values of a dataset built by [`particle_dataset`]
pub fn with_longitudes(mut ds: Dataset, lon: Vec<f32>) -> Dataset {
    ds.insert_variable(
        "lon",
        Variable::new([TRAJECTORY, TIME], ArrayData::Float32(lon)).with_attr("units", "degrees_east"),
    )
    .unwrap();
    ds
}

/// One captured write
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub path: PathBuf,
    pub dataset: Dataset,
}

/// Sink that keeps written datasets in memory
///
/// Optionally fails on the n-th write (0-based), or on any path containing
/// a marker, to exercise error paths.
#[derive(Debug, Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<RecordedWrite>>,
    discarded: Mutex<Vec<PathBuf>>,
    fail_at: Option<usize>,
    fail_on: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose write number `index` (0-based) fails
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Sink that fails every write whose path contains `marker`
    ///
    /// Independent of write order, so usable from parallel runs.
    pub fn failing_on(marker: impl Into<String>) -> Self {
        Self {
            fail_on: Some(marker.into()),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.writes().into_iter().map(|w| w.path).collect()
    }

    pub fn discarded(&self) -> Vec<PathBuf> {
        self.discarded.lock().unwrap().clone()
    }
}

impl DatasetSink for RecordingSink {
    fn extension(&self) -> &str {
        ".mem"
    }

    fn write(&self, dataset: &Dataset, path: &Path) -> Result<u64, DatasetError> {
        let mut writes = self.writes.lock().unwrap();
        let marked = self
            .fail_on
            .as_deref()
            .is_some_and(|marker| path.to_string_lossy().contains(marker));
        if marked || self.fail_at == Some(writes.len()) {
            return Err(DatasetError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::Other, "simulated write failure"),
            ));
        }
        let bytes = dataset
            .variables()
            .map(|(_, v)| v.data().nbytes() as u64)
            .sum();
        writes.push(RecordedWrite {
            path: path.to_path_buf(),
            dataset: dataset.clone(),
        });
        Ok(bytes)
    }

    fn discard(&self, path: &Path) -> Result<(), DatasetError> {
        self.writes.lock().unwrap().retain(|w| w.path != path);
        self.discarded.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_has_expected_shape() {
        let ds = particle_dataset(5, 3);
        assert_eq!(ds.trajectory_count().unwrap(), 5);
        assert_eq!(ds.time_count().unwrap(), 3);
        assert!(ds.contains_variable("lon"));
        assert!(!ds.contains_variable("particulate_diameter"));
    }

    #[test]
    fn failing_sink_fails_on_requested_write() {
        let sink = RecordingSink::failing_at(1);
        let ds = particle_dataset(1, 1);
        sink.write(&ds, Path::new("a")).unwrap();
        assert!(sink.write(&ds, Path::new("b")).is_err());
        assert_eq!(sink.paths(), vec![PathBuf::from("a")]);
    }

    #[test]
    fn marked_path_fails_regardless_of_order() {
        let sink = RecordingSink::failing_on("_002_");
        let ds = particle_dataset(1, 1);
        assert!(sink.write(&ds, Path::new("run_fragment_002_of_003")).is_err());
        sink.write(&ds, Path::new("run_fragment_003_of_003")).unwrap();
        sink.write(&ds, Path::new("run_fragment_001_of_003")).unwrap();
        assert_eq!(
            sink.paths(),
            vec![PathBuf::from("run_fragment_003_of_003"), PathBuf::from("run_fragment_001_of_003")]
        );
    }
}
