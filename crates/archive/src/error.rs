//! Error types for archive reading and writing.

use thiserror::Error;

/// Errors raised while reading, merging or writing an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Zarr array or group could not be created, opened or accessed.
    #[error("Zarr format error: {0}")]
    Zarr(String),

    /// Storage/IO error inside the Zarr store.
    #[error("storage error: {0}")]
    Storage(String),

    /// Archive attributes are missing or malformed.
    #[error("invalid archive metadata: {0}")]
    InvalidMetadata(String),

    /// In-memory data violates the archive invariants.
    #[error("invalid archive data: {0}")]
    Invalid(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error outside the Zarr store (temp dirs, swaps).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Create a Zarr error.
    pub fn zarr(msg: impl Into<String>) -> Self {
        Self::Zarr(msg.into())
    }

    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create an Invalid error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
