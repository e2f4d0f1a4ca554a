//! Error types for the ingestion crate.

use std::path::PathBuf;

use archive::ArchiveError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that abort the build of one archive. Other years are unaffected.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("existing archive {path} is unreadable: {source}")]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    /// The configured subset no longer matches the archive's extent.
    #[error("configuration is incompatible with existing archive {path}: {reason}")]
    IncompatibleArchive { path: PathBuf, reason: String },

    #[error("failed to write archive {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors that abort a whole batch run.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("invalid year range: {start} is after {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("{0}")]
    Fatal(String),
}

/// Result type for single-archive builds.
pub type Result<T> = std::result::Result<T, BuildError>;
