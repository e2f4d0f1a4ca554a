//! Builder configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, then command-line flags and their environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use archive::ArchiveConfig;
use chrono::NaiveDate;
use ingestion::{BatchConfig, DEFAULT_PARALLELISM};
use serde::{Deserialize, Serialize};
use snow_common::{BoundingBox, Region};
use storage::FetchConfig;

pub const DEFAULT_START_YEAR: i32 = 2020;
pub const DEFAULT_END_YEAR: i32 = 2025;
pub const DEFAULT_OUTPUT_DIR: &str = "snodas_archive";
pub const DEFAULT_CACHE_DIR: &str = "snodas_cache";
pub const DEFAULT_SUBSET: &str = "co";

/// Which part of the grid each archive keeps.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsetChoice {
    Full,
    Region(Region),
}

impl SubsetChoice {
    /// Parse `co`, `full` (or `none`), or `[name:]min_lon,min_lat,max_lon,max_lat`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "co" | "colorado" => return Ok(Self::Region(Region::colorado())),
            "full" | "none" | "full_extent" => return Ok(Self::Full),
            _ => {}
        }

        let (name, bbox) = match s.split_once(':') {
            Some((name, bbox)) => (name.trim(), bbox),
            None => ("custom", s),
        };
        let valid = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if name.is_empty() || !name.chars().all(valid) {
            bail!("invalid region name '{name}'");
        }
        let bbox = BoundingBox::parse(bbox).with_context(|| format!("invalid subset '{s}'"))?;
        Ok(Self::Region(Region::new(name, bbox)))
    }

    pub fn into_region(self) -> Option<Region> {
        match self {
            Self::Full => None,
            Self::Region(region) => Some(region),
        }
    }
}

/// Contents of the YAML configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub output_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    /// Same syntax as `--subset`.
    pub subset: Option<String>,
    pub rebuild: Option<bool>,
    pub parallelism: Option<usize>,
    pub as_of: Option<NaiveDate>,
    pub fetch: Option<FetchConfig>,
    pub archive: Option<ArchiveConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Values given as flags or environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub output_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub subset: Option<String>,
    pub rebuild: bool,
    pub parallelism: Option<usize>,
    pub as_of: Option<NaiveDate>,
    pub base_url: Option<String>,
    pub max_retries: Option<u32>,
}

/// Merge the layers into a validated batch configuration.
pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<BatchConfig> {
    let start_year = overrides
        .start_year
        .or(file.start_year)
        .unwrap_or(DEFAULT_START_YEAR);
    let end_year = overrides.end_year.or(file.end_year).unwrap_or(DEFAULT_END_YEAR);
    let output_dir = overrides
        .output_dir
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let cache_dir = overrides
        .cache_dir
        .or(file.cache_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

    let mut config = BatchConfig::new(start_year, end_year, output_dir, cache_dir);

    let subset = overrides
        .subset
        .or(file.subset)
        .unwrap_or_else(|| DEFAULT_SUBSET.to_string());
    config.region = SubsetChoice::parse(&subset)?.into_region();
    config.rebuild = overrides.rebuild || file.rebuild.unwrap_or(false);
    config.parallelism = overrides
        .parallelism
        .or(file.parallelism)
        .unwrap_or(DEFAULT_PARALLELISM);
    config.as_of = overrides.as_of.or(file.as_of);

    config.fetch = file.fetch.unwrap_or_default();
    if let Some(base_url) = overrides.base_url {
        config.fetch.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(max_retries) = overrides.max_retries {
        config.fetch.max_retries = max_retries;
    }
    config.archive = file.archive.unwrap_or_else(ArchiveConfig::from_env);

    if config.parallelism == 0 {
        bail!("parallelism must be at least 1");
    }
    config.fetch.validate()?;
    config.archive.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_choices() {
        assert_eq!(
            SubsetChoice::parse("co").unwrap(),
            SubsetChoice::Region(Region::colorado())
        );
        assert_eq!(SubsetChoice::parse("FULL").unwrap(), SubsetChoice::Full);
        assert_eq!(SubsetChoice::parse("none").unwrap(), SubsetChoice::Full);

        let custom = SubsetChoice::parse("ut:-114,37,-109,42").unwrap();
        let region = custom.into_region().unwrap();
        assert_eq!(region.name, "ut");
        assert_eq!(region.bbox, BoundingBox::new(-114.0, 37.0, -109.0, 42.0));

        let unnamed = SubsetChoice::parse("-114,37,-109,42").unwrap();
        assert_eq!(unnamed.into_region().unwrap().name, "custom");
    }

    #[test]
    fn test_subset_rejects_garbage() {
        assert!(SubsetChoice::parse("mars").is_err());
        assert!(SubsetChoice::parse("a b:-114,37,-109,42").is_err());
        assert!(SubsetChoice::parse("-109,41,-104,37").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = resolve(FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(config.start_year, DEFAULT_START_YEAR);
        assert_eq!(config.end_year, DEFAULT_END_YEAR);
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.region, Some(Region::colorado()));
        assert!(!config.rebuild);
        assert_eq!(config.parallelism, DEFAULT_PARALLELISM);
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig::from_yaml(
            r#"
start_year: 2010
end_year: 2012
output_dir: /data/snodas
subset: full
parallelism: 2
as_of: 2012-06-30
fetch:
  max_retries: 7
"#,
        )
        .unwrap();
        let overrides = Overrides {
            end_year: Some(2011),
            subset: Some("co".into()),
            rebuild: true,
            base_url: Some("http://localhost:8080/masked/".into()),
            ..Default::default()
        };

        let config = resolve(file, overrides).unwrap();
        assert_eq!(config.start_year, 2010);
        assert_eq!(config.end_year, 2011);
        assert_eq!(config.output_dir, PathBuf::from("/data/snodas"));
        assert_eq!(config.region_name(), Some("co"));
        assert!(config.rebuild);
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2012, 6, 30));
        assert_eq!(config.fetch.max_retries, 7);
        assert_eq!(config.fetch.base_url, "http://localhost:8080/masked");
    }

    #[test]
    fn test_unknown_yaml_key_rejected() {
        assert!(FileConfig::from_yaml("start_yaer: 2010\n").is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero = Overrides {
            parallelism: Some(0),
            ..Default::default()
        };
        assert!(resolve(FileConfig::default(), zero).is_err());

        let bad_url = Overrides {
            base_url: Some("ftp://example.org".into()),
            ..Default::default()
        };
        assert!(resolve(FileConfig::default(), bad_url).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snodas.yaml");
        std::fs::write(&path, "start_year: 2015\nrebuild: true\n").unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.start_year, Some(2015));
        assert_eq!(file.rebuild, Some(true));
        assert!(FileConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
