//! Assembler and batch configuration.
//!
//! Both are plain values handed to their consumers; nothing here reads
//! process-wide state except [`BatchConfig::today`] when no date is pinned.

use std::path::PathBuf;

use archive::ArchiveConfig;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use snow_common::{BoundingBox, Region};
use storage::FetchConfig;

use crate::error::BuildError;

/// Default number of dates fetched and decoded concurrently.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Settings for one [`ArchiveAssembler`](crate::ArchiveAssembler).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Dates in flight through fetch and decode at once.
    pub parallelism: usize,
    /// Ignore any existing archive and rebuild the whole range.
    pub rebuild: bool,
    /// Crop box applied while decoding; `None` keeps the full extent.
    pub subset: Option<BoundingBox>,
    /// Region name recorded in the archive attributes.
    pub region: Option<String>,
    pub archive: ArchiveConfig,
    /// Date treated as "today" when clamping ranges; `None` uses the clock.
    pub as_of: Option<NaiveDate>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            rebuild: false,
            subset: None,
            region: None,
            archive: ArchiveConfig::default(),
            as_of: None,
        }
    }
}

impl AssemblerConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.parallelism == 0 {
            return Err(BuildError::Config("parallelism must be at least 1".into()));
        }
        if let Some(subset) = &self.subset {
            subset
                .validate()
                .map_err(|e| BuildError::Config(e.to_string()))?;
        }
        self.archive
            .validate()
            .map_err(|e| BuildError::Config(e.to_string()))
    }

    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Everything a multi-year run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub start_year: i32,
    pub end_year: i32,
    /// Directory receiving one archive per year.
    pub output_dir: PathBuf,
    /// Directory holding downloaded containers.
    pub cache_dir: PathBuf,
    /// Crop every archive to this region; `None` keeps the full extent.
    pub region: Option<Region>,
    pub rebuild: bool,
    pub parallelism: usize,
    pub fetch: FetchConfig,
    pub archive: ArchiveConfig,
    /// Pinned "today"; also applied to the fetcher when it has none.
    pub as_of: Option<NaiveDate>,
}

impl BatchConfig {
    /// A config for `start_year..=end_year` with defaults everywhere else.
    pub fn new(
        start_year: i32,
        end_year: i32,
        output_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            start_year,
            end_year,
            output_dir: output_dir.into(),
            cache_dir: cache_dir.into(),
            region: Some(Region::colorado()),
            rebuild: false,
            parallelism: DEFAULT_PARALLELISM,
            fetch: FetchConfig::default(),
            archive: ArchiveConfig::default(),
            as_of: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn current_year(&self) -> i32 {
        self.today().year()
    }

    /// Region name used in filenames and titles.
    pub fn region_name(&self) -> Option<&str> {
        self.region.as_ref().map(|r| r.name.as_str())
    }

    /// The per-year assembler settings derived from this batch.
    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            parallelism: self.parallelism,
            rebuild: self.rebuild,
            subset: self.region.as_ref().map(|r| r.bbox),
            region: self.region.as_ref().map(|r| r.name.clone()),
            archive: self.archive.clone(),
            as_of: self.as_of,
        }
    }

    /// Fetcher settings with the batch's pinned date filled in.
    pub fn fetch_config(&self) -> FetchConfig {
        let mut fetch = self.fetch.clone();
        if fetch.as_of.is_none() {
            fetch.as_of = self.as_of;
        }
        fetch
    }
}
