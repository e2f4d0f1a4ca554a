//! Names and paths shared by the archive reader and writer.

use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};

pub const TIME: &str = "time";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Dimension names of every variable array.
pub const DIMENSIONS: [&str; 3] = [TIME, LATITUDE, LONGITUDE];

/// Group metadata document written at the archive root.
pub const GROUP_METADATA: &str = "zarr.json";

/// Store path of a named array.
pub fn array_path(name: &str) -> String {
    format!("/{name}")
}

/// `snodas_{region}_{year}.zarr`, or `snodas_{year}.zarr` without a region.
pub fn archive_file_name(year: i32, region: Option<&str>) -> String {
    match region {
        Some(region) => format!("snodas_{region}_{year}.zarr"),
        None => format!("snodas_{year}.zarr"),
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ArchiveError::invalid(format!("{} has no file name", path.display())))
}

fn sibling(path: &Path, name: String) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Prefix of hidden temporary directories for `path`.
pub fn temp_prefix(path: &Path) -> Result<String> {
    Ok(format!(".{}.tmp-", file_name(path)?))
}

/// A fresh hidden temporary directory name next to `path`.
pub fn temp_path(path: &Path, unique: &str) -> Result<PathBuf> {
    Ok(sibling(path, format!("{}{unique}", temp_prefix(path)?)))
}

/// Where the previous archive waits while the new one is swapped in.
pub fn backup_path(path: &Path) -> Result<PathBuf> {
    Ok(sibling(path, format!("{}.bak", file_name(path)?)))
}
