//! Read access to a persisted archive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use grid_decoder::CoordinateAxes;
use tracing::debug;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs_filesystem::FilesystemStore;

use crate::attributes::ArchiveAttributes;
use crate::error::{ArchiveError, Result};
use crate::layout::{array_path, GROUP_METADATA, LATITUDE, LONGITUDE, TIME};
use crate::time::days_to_date;

/// An archive on disk, with its coordinates loaded and variables ready to read.
///
/// Variable data stays on disk until asked for, one time step at a time if
/// needed, so opening a large archive is cheap.
pub struct ExistingArchive {
    path: PathBuf,
    attributes: ArchiveAttributes,
    times: Vec<NaiveDate>,
    axes: CoordinateAxes,
    arrays: BTreeMap<String, Array<FilesystemStore>>,
}

impl ExistingArchive {
    /// Whether `path` holds an archive group.
    pub fn exists(path: &Path) -> bool {
        path.join(GROUP_METADATA).is_file()
    }

    /// Open an archive, checking that every listed variable has the
    /// `[time, latitude, longitude]` shape of the coordinates.
    pub fn open(path: &Path) -> Result<Self> {
        if !Self::exists(path) {
            return Err(ArchiveError::storage(format!(
                "no archive at {}",
                path.display()
            )));
        }

        let store = Arc::new(
            FilesystemStore::new(path).map_err(|e| ArchiveError::storage(e.to_string()))?,
        );

        let group =
            Group::open(store.clone(), "/").map_err(|e| ArchiveError::zarr(e.to_string()))?;
        let attributes = ArchiveAttributes::from_json_map(group.attributes())?;

        let days = read_days(&store)?;
        let times = days
            .iter()
            .map(|d| {
                days_to_date(*d).ok_or_else(|| {
                    ArchiveError::invalid_metadata(format!("time value {d} out of range"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ArchiveError::invalid_metadata(
                "time axis is not strictly increasing",
            ));
        }

        let axes = CoordinateAxes {
            latitude: read_degrees(&store, LATITUDE)?,
            longitude: read_degrees(&store, LONGITUDE)?,
        };

        let expected = [times.len() as u64, axes.rows() as u64, axes.cols() as u64];
        let mut arrays = BTreeMap::new();
        for name in &attributes.variables {
            let array = Array::open(store.clone(), &array_path(name))
                .map_err(|e| ArchiveError::zarr(format!("{name}: {e}")))?;
            if array.shape() != expected.as_slice() {
                return Err(ArchiveError::invalid_metadata(format!(
                    "{name} has shape {:?}, expected {:?}",
                    array.shape(),
                    expected
                )));
            }
            arrays.insert(name.clone(), array);
        }

        debug!(
            path = %path.display(),
            time_steps = times.len(),
            variables = arrays.len(),
            "Opened archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            attributes,
            times,
            axes,
            arrays,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attributes(&self) -> &ArchiveAttributes {
        &self.attributes
    }

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn axes(&self) -> &CoordinateAxes {
        &self.axes
    }

    /// Variable names, sorted.
    pub fn variables(&self) -> Vec<String> {
        self.arrays.keys().cloned().collect()
    }

    pub fn time_steps(&self) -> usize {
        self.times.len()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.times.binary_search(&date).is_ok()
    }

    /// Index of `date` on the time axis.
    pub fn time_index(&self, date: NaiveDate) -> Option<usize> {
        self.times.binary_search(&date).ok()
    }

    /// One `[latitude, longitude]` slice of a variable.
    pub fn read_time_slice(&self, variable: &str, index: usize) -> Result<Vec<f32>> {
        if index >= self.times.len() {
            return Err(ArchiveError::invalid(format!(
                "time index {index} out of range for {} steps",
                self.times.len()
            )));
        }
        self.read_steps(variable, index, 1)
    }

    /// Every time step of a variable, row-major `[time, latitude, longitude]`.
    pub fn read_variable(&self, variable: &str) -> Result<Vec<f32>> {
        self.read_steps(variable, 0, self.times.len())
    }

    fn read_steps(&self, variable: &str, start: usize, count: usize) -> Result<Vec<f32>> {
        let array = self.arrays.get(variable).ok_or_else(|| {
            ArchiveError::invalid(format!("archive has no variable '{variable}'"))
        })?;
        let subset = ArraySubset::new_with_start_shape(
            vec![start as u64, 0, 0],
            vec![count as u64, self.axes.rows() as u64, self.axes.cols() as u64],
        )
        .map_err(|e| ArchiveError::zarr(e.to_string()))?;

        array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| ArchiveError::zarr(format!("{variable}: {e}")))
    }
}

impl std::fmt::Debug for ExistingArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistingArchive")
            .field("path", &self.path)
            .field("time_steps", &self.times.len())
            .field("variables", &self.arrays.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Open a one-dimensional coordinate array and the subset covering all of it.
fn open_coordinate(
    store: &Arc<FilesystemStore>,
    name: &str,
) -> Result<(Array<FilesystemStore>, ArraySubset)> {
    let array = Array::open(store.clone(), &array_path(name))
        .map_err(|e| ArchiveError::zarr(format!("{name}: {e}")))?;
    let shape = array.shape().to_vec();
    if shape.len() != 1 {
        return Err(ArchiveError::invalid_metadata(format!(
            "{name} must be one-dimensional, has shape {shape:?}"
        )));
    }
    let subset = ArraySubset::new_with_start_shape(vec![0], shape)
        .map_err(|e| ArchiveError::zarr(e.to_string()))?;
    Ok((array, subset))
}

fn read_days(store: &Arc<FilesystemStore>) -> Result<Vec<i64>> {
    let (array, subset) = open_coordinate(store, TIME)?;
    array
        .retrieve_array_subset_elements::<i64>(&subset)
        .map_err(|e| ArchiveError::zarr(format!("{TIME}: {e}")))
}

fn read_degrees(store: &Arc<FilesystemStore>, name: &str) -> Result<Vec<f64>> {
    let (array, subset) = open_coordinate(store, name)?;
    array
        .retrieve_array_subset_elements::<f64>(&subset)
        .map_err(|e| ArchiveError::zarr(format!("{name}: {e}")))
}
