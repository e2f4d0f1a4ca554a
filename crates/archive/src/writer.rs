//! Atomic Zarr V3 archive writer.
//!
//! A write builds the complete archive in a hidden directory next to the
//! target, then swaps it in: the old archive is renamed to `.bak`, the new
//! one renamed into place, and the backup deleted. [`recover`] repairs the
//! state left by a crash between those renames.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use grid_decoder::CoordinateAxes;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::attributes::{ArchiveAttributes, UNITS};
use crate::config::{ArchiveCompression, ArchiveConfig};
use crate::dataset::ArchiveDataset;
use crate::error::{ArchiveError, Result};
use crate::layout::{
    array_path, backup_path, temp_path, temp_prefix, DIMENSIONS, LATITUDE, LONGITUDE, TIME,
};
use crate::merge::{MergePlan, SliceSource};
use crate::reader::ExistingArchive;
use crate::time::{date_to_days, TIME_UNITS};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What a completed write produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub time_steps: usize,
    /// Time steps taken from the new dataset.
    pub added: usize,
    pub variables: Vec<String>,
}

/// What [`recover`] found and repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    /// A backup was renamed back because the target was missing.
    pub restored_backup: bool,
    /// A leftover backup was deleted because the swap had completed.
    pub removed_backup: bool,
    pub removed_temp_dirs: usize,
}

impl Recovery {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Writer for per-year archives.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    config: ArchiveConfig,
}

impl ArchiveWriter {
    /// Create a new writer, validating the configuration.
    pub fn new(config: ArchiveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Write the archive described by `plan` to `path`, replacing any
    /// previous archive there.
    ///
    /// Existing time steps are copied from `existing` one slice at a time;
    /// new ones come from `new`. Variables are those listed in `attrs`.
    pub fn write(
        &self,
        path: &Path,
        attrs: &ArchiveAttributes,
        axes: &CoordinateAxes,
        plan: &MergePlan,
        existing: Option<&ExistingArchive>,
        new: &ArchiveDataset,
    ) -> Result<WriteSummary> {
        self.check_inputs(attrs, axes, plan, existing, new)?;

        let unique = format!(
            "{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let temp = temp_path(path, &unique)?;
        if temp.exists() {
            fs::remove_dir_all(&temp)?;
        }
        fs::create_dir_all(&temp)?;

        if let Err(e) = self.write_store(&temp, attrs, axes, plan, existing, new) {
            let _ = fs::remove_dir_all(&temp);
            return Err(e);
        }
        swap_into_place(&temp, path)?;

        info!(
            path = %path.display(),
            time_steps = plan.len(),
            added = plan.added(),
            variables = attrs.variables.len(),
            "Wrote archive"
        );

        Ok(WriteSummary {
            path: path.to_path_buf(),
            time_steps: plan.len(),
            added: plan.added(),
            variables: attrs.variables.clone(),
        })
    }

    fn check_inputs(
        &self,
        attrs: &ArchiveAttributes,
        axes: &CoordinateAxes,
        plan: &MergePlan,
        existing: Option<&ExistingArchive>,
        new: &ArchiveDataset,
    ) -> Result<()> {
        if plan.is_empty() {
            return Err(ArchiveError::invalid("nothing to write: merge plan is empty"));
        }
        if attrs.variables.is_empty() {
            return Err(ArchiveError::invalid("nothing to write: no variables"));
        }
        new.validate()?;

        if !new.is_empty() && !new.axes.approx_eq(axes) {
            return Err(ArchiveError::invalid("new data does not share the archive axes"));
        }
        let new_variables = new.variable_names();
        if plan.added() > 0 && new_variables != attrs.variables {
            return Err(ArchiveError::invalid(format!(
                "new data holds {new_variables:?}, archive lists {:?}",
                attrs.variables
            )));
        }

        if plan.uses_existing() {
            let existing = existing.ok_or_else(|| {
                ArchiveError::invalid("merge plan reads an existing archive that was not given")
            })?;
            if !existing.axes().approx_eq(axes) {
                return Err(ArchiveError::invalid(
                    "existing archive does not share the archive axes",
                ));
            }
            if existing.variables() != attrs.variables {
                return Err(ArchiveError::invalid(format!(
                    "existing archive holds {:?}, archive lists {:?}",
                    existing.variables(),
                    attrs.variables
                )));
            }
        }
        Ok(())
    }

    fn write_store(
        &self,
        dir: &Path,
        attrs: &ArchiveAttributes,
        axes: &CoordinateAxes,
        plan: &MergePlan,
        existing: Option<&ExistingArchive>,
        new: &ArchiveDataset,
    ) -> Result<()> {
        let store =
            Arc::new(FilesystemStore::new(dir).map_err(|e| ArchiveError::storage(e.to_string()))?);

        GroupBuilder::new()
            .attributes(attrs.to_json_map())
            .build(store.clone(), "/")
            .map_err(|e| ArchiveError::zarr(e.to_string()))?
            .store_metadata()
            .map_err(|e| ArchiveError::storage(e.to_string()))?;

        let days: Vec<i64> = plan.times().into_iter().map(date_to_days).collect();
        let time = self.coordinate_array(
            &store,
            TIME,
            DataType::Int64,
            FillValue::from(0i64),
            days.len(),
            coordinate_attrs(TIME_UNITS, "time"),
        )?;
        time.store_array_subset_elements(&whole_axis(days.len())?, days.as_slice())
            .map_err(|e| ArchiveError::zarr(e.to_string()))?;

        let latitude = self.coordinate_array(
            &store,
            LATITUDE,
            DataType::Float64,
            FillValue::from(f64::NAN),
            axes.rows(),
            coordinate_attrs("degrees_north", "latitude"),
        )?;
        latitude
            .store_array_subset_elements(&whole_axis(axes.rows())?, axes.latitude.as_slice())
            .map_err(|e| ArchiveError::zarr(e.to_string()))?;

        let longitude = self.coordinate_array(
            &store,
            LONGITUDE,
            DataType::Float64,
            FillValue::from(f64::NAN),
            axes.cols(),
            coordinate_attrs("degrees_east", "longitude"),
        )?;
        longitude
            .store_array_subset_elements(&whole_axis(axes.cols())?, axes.longitude.as_slice())
            .map_err(|e| ArchiveError::zarr(e.to_string()))?;

        for variable in &attrs.variables {
            self.write_variable(&store, variable, axes, plan, existing, new)?;
        }
        Ok(())
    }

    /// Copy every time step of one variable, slice by slice.
    fn write_variable(
        &self,
        store: &Arc<FilesystemStore>,
        variable: &str,
        axes: &CoordinateAxes,
        plan: &MergePlan,
        existing: Option<&ExistingArchive>,
        new: &ArchiveDataset,
    ) -> Result<()> {
        let (rows, cols) = (axes.rows() as u64, axes.cols() as u64);
        let array = self.variable_array(store, variable, plan.len() as u64, rows, cols)?;

        for (t, (date, source)) in plan.steps().iter().enumerate() {
            let slice: Cow<[f32]> = match (source, existing) {
                (SliceSource::Existing(i), Some(existing)) => {
                    Cow::Owned(existing.read_time_slice(variable, *i)?)
                }
                (SliceSource::Existing(_), None) => {
                    return Err(ArchiveError::invalid("existing archive not given"));
                }
                (SliceSource::New(i), _) => Cow::Borrowed(new.slice(variable, *i).ok_or_else(
                    || ArchiveError::invalid(format!("new data has no {variable} for {date}")),
                )?),
            };

            let subset =
                ArraySubset::new_with_start_shape(vec![t as u64, 0, 0], vec![1, rows, cols])
                    .map_err(|e| ArchiveError::zarr(e.to_string()))?;
            array
                .store_array_subset_elements(&subset, &slice[..])
                .map_err(|e| ArchiveError::zarr(format!("{variable} at {date}: {e}")))?;
        }

        debug!(variable, time_steps = plan.len(), "Wrote variable");
        Ok(())
    }

    fn variable_array(
        &self,
        store: &Arc<FilesystemStore>,
        variable: &str,
        time_steps: u64,
        rows: u64,
        cols: u64,
    ) -> Result<Array<FilesystemStore>> {
        let spatial = self.config.spatial_chunk as u64;
        let chunk_grid: zarrs::array::ChunkGrid = vec![
            (self.config.time_chunk as u64).min(time_steps).max(1),
            spatial.min(rows).max(1),
            spatial.min(cols).max(1),
        ]
        .try_into()
        .map_err(|e| ArchiveError::Config(format!("{:?}", e)))?;

        let mut attrs = Map::new();
        attrs.insert("units".to_string(), json!(UNITS));
        attrs.insert("long_name".to_string(), json!(variable));

        let mut binding = ArrayBuilder::new(
            vec![time_steps, rows, cols],
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        let mut builder = binding
            .attributes(attrs)
            .dimension_names(Some(DIMENSIONS));

        if self.config.compression != ArchiveCompression::None {
            builder = builder.bytes_to_bytes_codecs(vec![self.create_compression_codec(4)?]);
        }

        let array = builder
            .build(store.clone(), &array_path(variable))
            .map_err(|e| ArchiveError::zarr(e.to_string()))?;
        array
            .store_metadata()
            .map_err(|e| ArchiveError::storage(e.to_string()))?;
        Ok(array)
    }

    fn coordinate_array(
        &self,
        store: &Arc<FilesystemStore>,
        name: &str,
        data_type: DataType,
        fill_value: FillValue,
        len: usize,
        attrs: Map<String, Value>,
    ) -> Result<Array<FilesystemStore>> {
        let len = len as u64;
        let chunk_grid: zarrs::array::ChunkGrid = vec![len.max(1)]
            .try_into()
            .map_err(|e| ArchiveError::Config(format!("{:?}", e)))?;

        let array = ArrayBuilder::new(vec![len], data_type, chunk_grid, fill_value)
            .attributes(attrs)
            .dimension_names(Some([name]))
            .build(store.clone(), &array_path(name))
            .map_err(|e| ArchiveError::zarr(e.to_string()))?;
        array
            .store_metadata()
            .map_err(|e| ArchiveError::storage(e.to_string()))?;
        Ok(array)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
        typesize: usize,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| ArchiveError::Config("Invalid compression level".to_string()))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = self.config.shuffle.then_some(typesize);

        let compressor = match self.config.compression {
            ArchiveCompression::None => {
                return Err(ArchiveError::Config(
                    "No compression configured".to_string(),
                ))
            }
            ArchiveCompression::BloscLz4 => BloscCompressor::LZ4,
            ArchiveCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| ArchiveError::Config(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}

fn coordinate_attrs(units: &str, standard_name: &str) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert("units".to_string(), json!(units));
    attrs.insert("standard_name".to_string(), json!(standard_name));
    attrs
}

fn whole_axis(len: usize) -> Result<ArraySubset> {
    ArraySubset::new_with_start_shape(vec![0], vec![len as u64])
        .map_err(|e| ArchiveError::zarr(e.to_string()))
}

/// Replace `target` with the finished directory `temp`.
fn swap_into_place(temp: &Path, target: &Path) -> Result<()> {
    let backup = backup_path(target)?;
    if backup.exists() {
        if target.exists() {
            fs::remove_dir_all(&backup)?;
        } else {
            fs::rename(&backup, target)?;
        }
    }

    let had_target = target.exists();
    if had_target {
        fs::rename(target, &backup)?;
    }

    if let Err(e) = fs::rename(temp, target) {
        if had_target {
            if let Err(restore) = fs::rename(&backup, target) {
                warn!(
                    backup = %backup.display(),
                    error = %restore,
                    "Failed to restore previous archive; run recovery before the next write"
                );
            }
        }
        let _ = fs::remove_dir_all(temp);
        return Err(e.into());
    }

    if had_target {
        if let Err(e) = fs::remove_dir_all(&backup) {
            warn!(backup = %backup.display(), error = %e, "Failed to remove previous archive");
        }
    }
    Ok(())
}

/// Repair the state around `path` after an interrupted write.
///
/// A backup without a target means the swap stopped between its two
/// renames: the backup is the last complete archive and is restored. A
/// backup next to a target means the swap finished and only the cleanup was
/// lost. Hidden temporary directories are always partial and are removed.
pub fn recover(path: &Path) -> Result<Recovery> {
    let mut recovery = Recovery::default();

    let backup = backup_path(path)?;
    if backup.exists() {
        if path.exists() {
            fs::remove_dir_all(&backup)?;
            recovery.removed_backup = true;
        } else {
            fs::rename(&backup, path)?;
            recovery.restored_backup = true;
        }
    }

    let prefix = temp_prefix(path)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if parent.is_dir() {
        for entry in fs::read_dir(&parent)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                fs::remove_dir_all(entry.path())?;
                recovery.removed_temp_dirs += 1;
            }
        }
    }

    if !recovery.is_clean() {
        warn!(
            path = %path.display(),
            restored_backup = recovery.restored_backup,
            removed_backup = recovery.removed_backup,
            removed_temp_dirs = recovery.removed_temp_dirs,
            "Recovered from interrupted archive write"
        );
    }
    Ok(recovery)
}
