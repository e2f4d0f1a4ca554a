//! Configuration for archive layout and compression.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Chunking and compression of the per-variable arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Time steps per chunk.
    pub time_chunk: usize,

    /// Chunk edge along latitude and longitude (square chunks).
    pub spatial_chunk: usize,

    /// Compression codec for Zarr arrays.
    pub compression: ArchiveCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            time_chunk: 1,
            spatial_chunk: 512,
            compression: ArchiveCompression::BloscZstd,
            compression_level: 5,
            shuffle: true,
        }
    }
}

impl ArchiveConfig {
    /// Load configuration from `ARCHIVE_*` environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ARCHIVE_TIME_CHUNK") {
            if let Ok(size) = val.parse() {
                config.time_chunk = size;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_SPATIAL_CHUNK") {
            if let Ok(size) = val.parse() {
                config.spatial_chunk = size;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_COMPRESSION") {
            if let Ok(compression) = val.parse() {
                config.compression = compression;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_SHUFFLE") {
            config.shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.time_chunk == 0 {
            return Err(ArchiveError::Config("time_chunk must be > 0".to_string()));
        }

        if self.spatial_chunk == 0 {
            return Err(ArchiveError::Config("spatial_chunk must be > 0".to_string()));
        }

        if self.compression != ArchiveCompression::None
            && (self.compression_level == 0 || self.compression_level > 9)
        {
            return Err(ArchiveError::Config(
                "compression_level must be 1-9".to_string(),
            ));
        }

        Ok(())
    }
}

/// Compression codec for archive arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd (recommended).
    #[default]
    BloscZstd,
}

impl ArchiveCompression {
    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl FromStr for ArchiveCompression {
    type Err = ArchiveError;

    /// Parse from string (case-insensitive); `lz4` and `zstd` name the blosc variants.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lz4" | "blosc_lz4" => Ok(Self::BloscLz4),
            "zstd" | "blosc_zstd" => Ok(Self::BloscZstd),
            other => Err(ArchiveError::Config(format!(
                "unknown compression '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ArchiveCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
