//! Remote layout of the NSIDC SNODAS distribution.
//!
//! Daily tarballs live under `{base}/{YYYY}/{MM_Mon}/SNODAS_{YYYYMMDD}.tar`,
//! e.g. `.../masked/2021/01_Jan/SNODAS_20210101.tar`.

use chrono::NaiveDate;
use snow_common::date_key;

/// Masked (contiguous US) archive at NSIDC.
pub const DEFAULT_BASE_URL: &str = "https://noaadata.apps.nsidc.org/NOAA/G02158/masked";

/// Where a date's container lives remotely, and its cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    pub url: String,
    pub filename: String,
}

impl RemoteLocation {
    pub fn for_date(base_url: &str, date: NaiveDate) -> Self {
        let filename = container_filename(date);
        let url = format!(
            "{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            date.format("%Y"),
            month_dir(date),
            filename
        );
        Self { url, filename }
    }
}

/// `SNODAS_YYYYMMDD.tar`
pub fn container_filename(date: NaiveDate) -> String {
    format!("SNODAS_{}.tar", date_key(date))
}

/// Month directory such as `01_Jan` or `12_Dec`.
pub fn month_dir(date: NaiveDate) -> String {
    date.format("%m_%b").to_string()
}
