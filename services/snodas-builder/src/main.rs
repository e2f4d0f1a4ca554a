//! SNODAS archive builder.
//!
//! Downloads daily SNODAS snow grids from the NSIDC archive and keeps one
//! archive per year up to date, fetching only the days each archive lacks.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Parser;
use ingestion::BatchDriver;
use snow_common::parse_date_key;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{FileConfig, Overrides};

#[derive(Parser, Debug)]
#[command(name = "snodas-builder")]
#[command(about = "Build and update per-year SNODAS snow archives")]
struct Args {
    /// YAML configuration file; flags and environment variables override it
    #[arg(short, long, env = "SNODAS_CONFIG")]
    config: Option<PathBuf>,

    /// First year to build
    #[arg(long, env = "SNODAS_START_YEAR")]
    start_year: Option<i32>,

    /// Last year to build (clamped to the current year)
    #[arg(long, env = "SNODAS_END_YEAR")]
    end_year: Option<i32>,

    /// Directory receiving the yearly archives
    #[arg(long, env = "SNODAS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Directory caching downloaded daily tarballs
    #[arg(long, env = "SNODAS_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Spatial subset: `co`, `full`, or `[name:]min_lon,min_lat,max_lon,max_lat`
    #[arg(long, env = "SNODAS_SUBSET")]
    subset: Option<String>,

    /// Rebuild archives from scratch instead of extending them
    #[arg(long, env = "SNODAS_REBUILD")]
    rebuild: bool,

    /// Days fetched and decoded concurrently
    #[arg(long, env = "SNODAS_PARALLELISM")]
    parallelism: Option<usize>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, env = "SNODAS_AS_OF", value_parser = parse_as_of)]
    as_of: Option<NaiveDate>,

    /// Root URL of the remote archive
    #[arg(long, env = "SNODAS_BASE_URL")]
    base_url: Option<String>,

    /// Retries for transient download failures
    #[arg(long, env = "SNODAS_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            start_year: self.start_year,
            end_year: self.end_year,
            output_dir: self.output_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            subset: self.subset.clone(),
            rebuild: self.rebuild,
            parallelism: self.parallelism,
            as_of: self.as_of,
            base_url: self.base_url.clone(),
            max_retries: self.max_retries,
        }
    }
}

fn parse_as_of(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date_key(s).map_err(|e| e.to_string())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    info!("Starting SNODAS archive builder");

    let file = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            FileConfig::load(path)?
        }
        None => FileConfig::default(),
    };
    let config = config::resolve(file, args.overrides())?;

    info!(
        start_year = config.start_year,
        end_year = config.end_year,
        output_dir = %config.output_dir.display(),
        cache_dir = %config.cache_dir.display(),
        region = ?config.region_name(),
        rebuild = config.rebuild,
        parallelism = config.parallelism,
        base_url = %config.fetch.base_url,
        "Loaded configuration"
    );

    let driver = BatchDriver::from_config(config)?;
    let report = driver.run().await?;
    report.log_summary();

    if !report.is_success() {
        let years: Vec<i32> = report.failed.iter().map(|f| f.year).collect();
        bail!("{} year(s) failed: {years:?}", years.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "snodas-builder",
            "--start-year",
            "2018",
            "--end-year",
            "2019",
            "--subset",
            "full",
            "--rebuild",
            "--as-of",
            "2019-12-31",
        ])
        .unwrap();

        let overrides = args.overrides();
        assert_eq!(overrides.start_year, Some(2018));
        assert_eq!(overrides.end_year, Some(2019));
        assert_eq!(overrides.subset.as_deref(), Some("full"));
        assert!(overrides.rebuild);
        assert_eq!(overrides.as_of, NaiveDate::from_ymd_opt(2019, 12, 31));
    }

    #[test]
    fn test_args_reject_bad_date() {
        assert!(Args::try_parse_from(["snodas-builder", "--as-of", "2019-02-30"]).is_err());
    }
}
