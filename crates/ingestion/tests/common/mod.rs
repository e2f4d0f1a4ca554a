//! Shared helpers for ingestion integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use archive::ExistingArchive;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use ingestion::{ArchiveAssembler, AssemblerConfig};
use snow_common::{DateRange, GridGeometry};
use storage::{container_filename, FetchError, FetchResult, FetchStats, GridSource, RawContainer};
use test_utils::{
    assert_grid_eq, expected_values, raw_test_grid, seed_for, synthetic_container, test_registry,
};

pub const SNOW_DEPTH: &str = "1036";
pub const SWE: &str = "1034";

/// In-memory stand-in for the remote archive.
///
/// Serves [`synthetic_container`]s and records every date requested.
pub struct FakeSource {
    geometry: GridGeometry,
    codes: Vec<&'static str>,
    unavailable: HashSet<NaiveDate>,
    published_from: Option<NaiveDate>,
    corrupt: HashSet<NaiveDate>,
    geometry_on: HashMap<NaiveDate, GridGeometry>,
    codes_on: HashMap<NaiveDate, Vec<&'static str>>,
    fetched: Mutex<Vec<NaiveDate>>,
}

impl FakeSource {
    pub fn new(geometry: GridGeometry, codes: &[&'static str]) -> Self {
        Self {
            geometry,
            codes: codes.to_vec(),
            unavailable: HashSet::new(),
            published_from: None,
            corrupt: HashSet::new(),
            geometry_on: HashMap::new(),
            codes_on: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(mut self, date: NaiveDate) -> Self {
        self.unavailable.insert(date);
        self
    }

    /// Every date before `date` answers as not published.
    pub fn published_from(mut self, date: NaiveDate) -> Self {
        self.published_from = Some(date);
        self
    }

    pub fn corrupt(mut self, date: NaiveDate) -> Self {
        self.corrupt.insert(date);
        self
    }

    pub fn geometry_on(mut self, date: NaiveDate, geometry: GridGeometry) -> Self {
        self.geometry_on.insert(date, geometry);
        self
    }

    pub fn codes_on(mut self, date: NaiveDate, codes: &[&'static str]) -> Self {
        self.codes_on.insert(date, codes.to_vec());
        self
    }

    /// Dates requested so far, sorted, and forget them.
    pub fn take_fetched(&self) -> Vec<NaiveDate> {
        let mut fetched = std::mem::take(&mut *self.fetched.lock().unwrap());
        fetched.sort();
        fetched
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    fn is_unavailable(&self, date: NaiveDate) -> bool {
        self.unavailable.contains(&date) || self.published_from.is_some_and(|from| date < from)
    }
}

#[async_trait]
impl GridSource for FakeSource {
    async fn fetch(&self, date: NaiveDate) -> FetchResult<RawContainer> {
        self.fetched.lock().unwrap().push(date);

        let filename = container_filename(date);
        if self.is_unavailable(date) {
            return Err(FetchError::NotPublished {
                url: format!("fake://{filename}"),
                status: 404,
            });
        }

        let bytes = if self.corrupt.contains(&date) {
            Bytes::from_static(b"definitely not a tarball")
        } else {
            let geometry = self.geometry_on.get(&date).unwrap_or(&self.geometry);
            let codes = self.codes_on.get(&date).unwrap_or(&self.codes);
            synthetic_container(date, geometry, codes)
        };

        Ok(RawContainer {
            date,
            filename,
            bytes,
            from_cache: false,
        })
    }

    fn stats(&self) -> FetchStats {
        FetchStats {
            downloads: self.fetch_count() as u64,
            ..Default::default()
        }
    }
}

/// Assembler config pinned to the end of 2021.
pub fn config() -> AssemblerConfig {
    AssemblerConfig {
        parallelism: 3,
        as_of: NaiveDate::from_ymd_opt(2021, 12, 31),
        ..Default::default()
    }
}

pub fn assembler(source: &Arc<FakeSource>, config: AssemblerConfig) -> ArchiveAssembler {
    let source: Arc<dyn GridSource> = source.clone();
    ArchiveAssembler::new(config, source, Arc::new(test_registry())).unwrap()
}

pub fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).unwrap()
}

/// Values the decoder yields for a code on a date of a full-extent grid.
pub fn expected_slice(geometry: &GridGeometry, code: &str, date: NaiveDate) -> Vec<f32> {
    expected_values(&raw_test_grid(geometry, seed_for(code, date)))
}

/// Two archives hold the same times, axes, attributes and values.
pub fn assert_same_archive(a: &Path, b: &Path) {
    let a = ExistingArchive::open(a).unwrap();
    let b = ExistingArchive::open(b).unwrap();
    assert_eq!(a.times(), b.times());
    assert_eq!(a.axes(), b.axes());
    assert_eq!(a.attributes(), b.attributes());
    for variable in a.variables() {
        assert_grid_eq!(
            a.read_variable(&variable).unwrap(),
            b.read_variable(&variable).unwrap()
        );
    }
}
