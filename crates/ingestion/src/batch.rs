//! Multi-year driver: one archive per year, failures isolated per year.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use archive::archive_file_name;
use chrono::Datelike;
use snow_common::{DateRange, GeometryRegistry};
use storage::{DiskCache, GridSource, RemoteGridFetcher};
use tracing::{error, info, instrument, warn};
use walkdir::WalkDir;

use crate::assembler::ArchiveAssembler;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::report::{ArchiveFile, BatchReport, YearFailure};

/// Runs [`ArchiveAssembler`] over a range of years.
pub struct BatchDriver {
    config: BatchConfig,
    source: Arc<dyn GridSource>,
    registry: Arc<GeometryRegistry>,
}

impl BatchDriver {
    pub fn new(
        config: BatchConfig,
        source: Arc<dyn GridSource>,
        registry: GeometryRegistry,
    ) -> Self {
        Self {
            config,
            source,
            registry: Arc::new(registry),
        }
    }

    /// Driver backed by the NSIDC HTTPS archive, caching under `cache_dir`.
    pub fn from_config(config: BatchConfig) -> Result<Self, BatchError> {
        let cache = DiskCache::new(config.cache_dir.clone());
        let fetcher = RemoteGridFetcher::new(config.fetch_config(), cache)
            .map_err(|e| BatchError::Fatal(format!("failed to create fetcher: {e}")))?;
        Ok(Self::new(config, Arc::new(fetcher), GeometryRegistry::snodas()))
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Where the archive for `year` lives.
    pub fn archive_path(&self, year: i32) -> PathBuf {
        self.config
            .output_dir
            .join(archive_file_name(year, self.config.region_name()))
    }

    pub fn title(&self, year: i32) -> String {
        match self.config.region_name() {
            Some(region) => format!("SNODAS Dataset - {year} ({region})"),
            None => format!("SNODAS Dataset - {year}"),
        }
    }

    /// Years to build, with the end clamped to the current year.
    pub fn years(&self) -> Result<(i32, i32), BatchError> {
        let (start, requested_end) = (self.config.start_year, self.config.end_year);
        if start > requested_end {
            return Err(BatchError::InvalidYearRange {
                start,
                end: requested_end,
            });
        }

        let current_year = self.config.current_year();
        let end = requested_end.min(current_year);
        if end < requested_end {
            warn!(
                requested = requested_end,
                current_year, "End year is in the future, clamping to the current year"
            );
        }
        if start > end {
            return Err(BatchError::InvalidYearRange { start, end });
        }
        Ok((start, end))
    }

    #[instrument(
        skip(self),
        fields(start_year = self.config.start_year, end_year = self.config.end_year)
    )]
    pub async fn run(&self) -> Result<BatchReport, BatchError> {
        let (start, end) = self.years()?;

        for dir in [&self.config.output_dir, &self.config.cache_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                BatchError::Fatal(format!("failed to create {}: {e}", dir.display()))
            })?;
        }

        let assembler = ArchiveAssembler::new(
            self.config.assembler_config(),
            Arc::clone(&self.source),
            Arc::clone(&self.registry),
        )
        .map_err(|e| BatchError::Fatal(e.to_string()))?;

        info!(
            start,
            end,
            region = ?self.config.region_name(),
            rebuild = self.config.rebuild,
            output_dir = %self.config.output_dir.display(),
            "Starting batch"
        );

        let today = self.config.today();
        let mut report = BatchReport::default();
        for year in start..=end {
            let Some(range) = DateRange::for_year(year, today) else {
                report.failed.push(YearFailure {
                    year,
                    reason: format!("no dates on or before {today}"),
                });
                continue;
            };
            let path = self.archive_path(year);

            match assembler.build(range, &path, &self.title(year)).await {
                Ok(outcome) => {
                    if outcome.is_success() {
                        report.succeeded.push(year);
                    } else {
                        warn!(year, status = %outcome.status, "Year produced no archive");
                        report.failed.push(YearFailure {
                            year,
                            reason: outcome.status.to_string(),
                        });
                    }
                    report.outcomes.push((year, outcome));
                }
                Err(e) => {
                    error!(year, error = %e, "Year failed");
                    report.failed.push(YearFailure {
                        year,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.inventory = inventory(&self.config.output_dir);
        report.fetch = self.source.stats();
        Ok(report)
    }
}

/// Archives directly inside `dir`, sorted by path, with their on-disk size.
pub fn inventory(dir: &Path) -> Vec<ArchiveFile> {
    let mut files: Vec<ArchiveFile> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.ends_with(".zarr") && !name.starts_with('.')
        })
        .map(|e| ArchiveFile {
            size_bytes: directory_size(e.path()),
            path: e.into_path(),
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use snow_common::Region;
    use storage::{FetchResult, RawContainer};

    struct NoSource;

    #[async_trait::async_trait]
    impl GridSource for NoSource {
        async fn fetch(&self, date: NaiveDate) -> FetchResult<RawContainer> {
            Err(storage::FetchError::NotPublished {
                url: date.to_string(),
                status: 404,
            })
        }
    }

    fn driver(start: i32, end: i32, region: Option<Region>) -> BatchDriver {
        let mut config = BatchConfig::new(start, end, "/tmp/snodas/out", "/tmp/snodas/cache");
        config.region = region;
        config.as_of = NaiveDate::from_ymd_opt(2021, 6, 1);
        BatchDriver::new(config, Arc::new(NoSource), GeometryRegistry::snodas())
    }

    #[test]
    fn test_paths_and_titles() {
        let regional = driver(2020, 2021, Some(Region::colorado()));
        assert_eq!(
            regional.archive_path(2021),
            PathBuf::from("/tmp/snodas/out/snodas_co_2021.zarr")
        );
        assert_eq!(regional.title(2021), "SNODAS Dataset - 2021 (co)");

        let full = driver(2020, 2021, None);
        assert_eq!(
            full.archive_path(2020),
            PathBuf::from("/tmp/snodas/out/snodas_2020.zarr")
        );
        assert_eq!(full.title(2020), "SNODAS Dataset - 2020");
    }

    #[test]
    fn test_years_clamped_to_current() {
        assert_eq!(driver(2019, 2030, None).years().unwrap(), (2019, 2021));
        assert_eq!(driver(2019, 2020, None).years().unwrap(), (2019, 2020));
    }

    #[test]
    fn test_years_rejects_inverted_and_future() {
        assert!(matches!(
            driver(2021, 2020, None).years(),
            Err(BatchError::InvalidYearRange { start: 2021, end: 2020 })
        ));
        assert!(matches!(
            driver(2025, 2030, None).years(),
            Err(BatchError::InvalidYearRange { start: 2025, end: 2021 })
        ));
    }

    #[test]
    fn test_inventory_lists_archives_only() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("snodas_2021.zarr");
        std::fs::create_dir_all(archive.join("swe")).unwrap();
        std::fs::write(archive.join("zarr.json"), vec![0u8; 100]).unwrap();
        std::fs::write(archive.join("swe").join("c"), vec![0u8; 50]).unwrap();
        std::fs::create_dir_all(dir.path().join(".snodas_2021.zarr.tmp-1-0")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let files = inventory(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, archive);
        assert_eq!(files[0].size_bytes, 150);
    }
}
