//! Building one archive from a date range.
//!
//! ```text
//! missing dates ──► fetch (GridSource) ──► decode (blocking pool)
//!                   └──────── buffered(parallelism), date order ────────┘
//!                                          │
//!                  axes check ◄────────────┘
//!                      │
//!            completeness filter ──► merge plan ──► atomic write
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use archive::{
    recover, ArchiveAttributes, ArchiveDataset, ArchiveError, ArchiveWriter, ExistingArchive,
    MergePlan,
};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use grid_decoder::{decode_container, CoordinateAxes, DecodedDate};
use metrics::counter;
use snow_common::{BoundingBox, DateRange, GeometryRegistry};
use storage::GridSource;
use tracing::{debug, info, instrument, warn};

use crate::config::AssemblerConfig;
use crate::error::{BuildError, Result};
use crate::report::{BuildOutcome, BuildStatus, DroppedVariable, FailedDate, FailureReason};

/// Grids of one decoded date, keyed by variable name.
type Slice = (NaiveDate, BTreeMap<String, Vec<f32>>);

/// Builds and incrementally updates a single archive.
pub struct ArchiveAssembler {
    config: AssemblerConfig,
    source: Arc<dyn GridSource>,
    registry: Arc<GeometryRegistry>,
    writer: ArchiveWriter,
}

impl ArchiveAssembler {
    pub fn new(
        config: AssemblerConfig,
        source: Arc<dyn GridSource>,
        registry: Arc<GeometryRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let writer = ArchiveWriter::new(config.archive.clone())
            .map_err(|e| BuildError::Config(e.to_string()))?;
        Ok(Self {
            config,
            source,
            registry,
            writer,
        })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Dates of `range` absent from `existing`; every date when rebuilding
    /// or when there is no archive.
    pub fn missing_dates(
        &self,
        range: &DateRange,
        existing: Option<&ExistingArchive>,
    ) -> Vec<NaiveDate> {
        match existing {
            Some(existing) if !self.config.rebuild => range
                .days()
                .filter(|date| !existing.contains_date(*date))
                .collect(),
            _ => range.days().collect(),
        }
    }

    /// Bring the archive at `output_path` up to date with `range`.
    ///
    /// Dates that cannot be fetched or decoded are reported in the outcome
    /// and never abort the build. Errors are reserved for conditions that
    /// leave nothing sensible to write.
    #[instrument(
        skip_all,
        fields(path = %output_path.display(), start = %range.start, end = %range.end)
    )]
    pub async fn build(
        &self,
        range: DateRange,
        output_path: &Path,
        title: &str,
    ) -> Result<BuildOutcome> {
        if range.start > range.end {
            return Err(BuildError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        let today = self.config.today();
        let requested = range.clamp_to(today);
        if requested.map_or(true, |r| r.end < range.end) {
            debug!(%today, "Range extends past today, clamped");
        }

        let recovery = recover(output_path).map_err(|source| BuildError::Write {
            path: output_path.to_path_buf(),
            source,
        })?;
        if !recovery.is_clean() {
            info!(?recovery, "Repaired interrupted write");
        }

        let existing = if self.config.rebuild {
            None
        } else {
            open_existing(output_path)?
        };
        if let Some(existing) = &existing {
            let held = existing.attributes().subset;
            if held != self.config.subset {
                return Err(BuildError::IncompatibleArchive {
                    path: output_path.to_path_buf(),
                    reason: format!(
                        "archive covers {}, configured subset is {}",
                        describe_subset(held.as_ref()),
                        describe_subset(self.config.subset.as_ref())
                    ),
                });
            }
        }
        let missing = requested
            .map(|r| self.missing_dates(&r, existing.as_ref()))
            .unwrap_or_default();

        let mut outcome = BuildOutcome {
            status: BuildStatus::UpToDate,
            path: output_path.to_path_buf(),
            dates_requested: missing.len(),
            dates_added: 0,
            failed_dates: Vec::new(),
            dropped_variables: Vec::new(),
            variables: existing.as_ref().map(|e| e.variables()).unwrap_or_default(),
            time_steps: existing.as_ref().map_or(0, |e| e.time_steps()),
        };

        if missing.is_empty() {
            outcome.status = if existing.is_some() {
                BuildStatus::UpToDate
            } else {
                BuildStatus::NoData
            };
            info!(status = %outcome.status, "Nothing to fetch");
            return Ok(outcome);
        }

        info!(
            dates = missing.len(),
            incremental = existing.is_some(),
            parallelism = self.config.parallelism,
            "Fetching missing dates"
        );
        let collected = self.collect(&missing, existing.as_ref()).await;
        let Collected {
            axes,
            grid_config,
            slices,
            failed,
        } = collected;
        outcome.failed_dates = failed;

        let (Some(axes), Some(grid_config), false) = (axes, grid_config, slices.is_empty()) else {
            outcome.status = if existing.is_some() {
                BuildStatus::NoNewData
            } else {
                BuildStatus::NoData
            };
            warn!(
                status = %outcome.status,
                failed = outcome.failed_dates.len(),
                "No date decoded"
            );
            return Ok(outcome);
        };

        let (slices, retained, dropped) = match &existing {
            Some(existing) => {
                let held = existing.variables();
                let (kept, rejected) = require_variables(slices, &held);
                for failed in rejected {
                    counter!("snodas_dates_failed_total").increment(1);
                    warn!(date = %failed.date, reason = %failed.reason, "Skipping date");
                    outcome.failed_dates.push(failed);
                }
                let dropped = extra_variables(&kept, &held);
                (kept, held, dropped)
            }
            None => {
                let (retained, dropped) = partition_variables(&slices);
                (slices, retained, dropped)
            }
        };
        outcome.failed_dates.sort_by_key(|failed| failed.date);
        for variable in &dropped {
            warn!(
                variable = %variable.name,
                present = variable.present,
                expected = variable.expected,
                missing = %summarize_dates(&variable.missing_dates),
                "Dropping variable not held on every date"
            );
        }
        outcome.dropped_variables = dropped;

        if slices.is_empty() {
            outcome.status = BuildStatus::NoNewData;
            warn!(
                failed = outcome.failed_dates.len(),
                "No new date carries every archived variable"
            );
            return Ok(outcome);
        }
        if retained.is_empty() {
            outcome.status = BuildStatus::NoCompleteVariables;
            warn!(dates = slices.len(), "No variable present on every decoded date");
            return Ok(outcome);
        }

        let write_error = |source: ArchiveError| BuildError::Write {
            path: output_path.to_path_buf(),
            source,
        };

        let mut dataset = ArchiveDataset::new(axes.clone(), retained.iter().cloned());
        for (date, mut grids) in slices {
            grids.retain(|name, _| retained.contains(name));
            dataset.push_time_step(date, &grids).map_err(write_error)?;
        }

        let plan = match &existing {
            Some(existing) => MergePlan::new(existing.times(), &dataset.times),
            None => MergePlan::fresh(&dataset.times),
        };
        let attrs = ArchiveAttributes::new(
            title,
            grid_config,
            retained,
            self.config.subset,
            self.config.region.clone(),
        );

        let writer = self.writer.clone();
        let path = output_path.to_path_buf();
        let summary = tokio::task::spawn_blocking(move || {
            writer.write(&path, &attrs, &axes, &plan, existing.as_ref(), &dataset)
        })
        .await
        .map_err(|e| write_error(ArchiveError::storage(format!("write task failed: {e}"))))?
        .map_err(write_error)?;

        counter!("snodas_archives_written_total").increment(1);
        outcome.status = BuildStatus::Written;
        outcome.dates_added = summary.added;
        outcome.time_steps = summary.time_steps;
        outcome.variables = summary.variables;

        info!(
            time_steps = outcome.time_steps,
            added = outcome.dates_added,
            failed = outcome.failed_dates.len(),
            "Archive updated"
        );
        Ok(outcome)
    }

    /// Fetch and decode `dates` concurrently, consuming results in date order.
    async fn collect(&self, dates: &[NaiveDate], existing: Option<&ExistingArchive>) -> Collected {
        let mut collected = Collected {
            axes: existing.map(|e| e.axes().clone()),
            grid_config: existing.map(|e| e.attributes().grid_config.clone()),
            slices: Vec::with_capacity(dates.len()),
            failed: Vec::new(),
        };

        let mut results = stream::iter(dates.iter().copied())
            .map(|date| async move { (date, self.fetch_and_decode(date).await) })
            .buffered(self.config.parallelism);

        while let Some((date, result)) = results.next().await {
            match result {
                Ok(decoded) => collected.accept(decoded),
                Err(reason) => collected.fail(date, reason),
            }
        }
        collected
    }

    async fn fetch_and_decode(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<DecodedDate, FailureReason> {
        let raw = self
            .source
            .fetch(date)
            .await
            .map_err(|e| FailureReason::Unavailable(e.to_string()))?;

        let registry = Arc::clone(&self.registry);
        let subset = self.config.subset;
        tokio::task::spawn_blocking(move || {
            decode_container(&raw.bytes, date, &registry, subset.as_ref())
        })
        .await
        .map_err(|e| FailureReason::Decode(format!("decode task failed: {e}")))?
        .map_err(|e| FailureReason::Decode(e.to_string()))
    }
}

fn open_existing(path: &Path) -> Result<Option<ExistingArchive>> {
    if !path.exists() {
        return Ok(None);
    }
    ExistingArchive::open(path)
        .map(Some)
        .map_err(|source| BuildError::ArchiveUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// Decoded dates gathered so far, in date order.
struct Collected {
    /// Axes every accepted date shares; fixed by the archive or the first date.
    axes: Option<CoordinateAxes>,
    grid_config: Option<String>,
    slices: Vec<Slice>,
    failed: Vec<FailedDate>,
}

impl Collected {
    fn accept(&mut self, decoded: DecodedDate) {
        let mismatch = self
            .axes
            .as_ref()
            .is_some_and(|axes| !axes.approx_eq(&decoded.axes));
        if mismatch {
            self.fail(decoded.date, FailureReason::AxesMismatch);
            return;
        }
        if self.axes.is_none() {
            self.axes = Some(decoded.axes.clone());
        }
        if self.grid_config.is_none() {
            self.grid_config = Some(decoded.geometry.label.clone());
        }

        counter!("snodas_dates_decoded_total").increment(1);
        debug!(date = %decoded.date, variables = decoded.grids.len(), "Decoded date");
        let grids = decoded
            .grids
            .into_iter()
            .map(|(name, grid)| (name, grid.data))
            .collect();
        self.slices.push((decoded.date, grids));
    }

    fn fail(&mut self, date: NaiveDate, reason: FailureReason) {
        counter!("snodas_dates_failed_total").increment(1);
        warn!(%date, %reason, "Skipping date");
        self.failed.push(FailedDate { date, reason });
    }
}

/// Split variables into those present on every slice and those that are not.
fn partition_variables(slices: &[Slice]) -> (Vec<String>, Vec<DroppedVariable>) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, grids) in slices {
        for name in grids.keys() {
            *seen.entry(name.as_str()).or_default() += 1;
        }
    }

    let expected = slices.len();
    let mut retained = Vec::new();
    let mut dropped = Vec::new();
    for (name, present) in seen {
        if present == expected {
            retained.push(name.to_string());
            continue;
        }
        dropped.push(DroppedVariable {
            name: name.to_string(),
            present,
            expected,
            missing_dates: slices
                .iter()
                .filter(|(_, grids)| !grids.contains_key(name))
                .map(|(date, _)| *date)
                .collect(),
        });
    }
    (retained, dropped)
}

/// Keep slices carrying every `held` variable; the rest fail.
fn require_variables(slices: Vec<Slice>, held: &[String]) -> (Vec<Slice>, Vec<FailedDate>) {
    let mut kept = Vec::with_capacity(slices.len());
    let mut rejected = Vec::new();
    for (date, grids) in slices {
        let lacking: Vec<String> = held
            .iter()
            .filter(|name| !grids.contains_key(name.as_str()))
            .cloned()
            .collect();
        if lacking.is_empty() {
            kept.push((date, grids));
        } else {
            rejected.push(FailedDate {
                date,
                reason: FailureReason::MissingVariables(lacking),
            });
        }
    }
    (kept, rejected)
}

/// Variables the slices carry beyond the archived set.
fn extra_variables(slices: &[Slice], held: &[String]) -> Vec<DroppedVariable> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, grids) in slices {
        for name in grids.keys().filter(|name| !held.contains(name)) {
            *seen.entry(name.as_str()).or_default() += 1;
        }
    }
    seen.into_iter()
        .map(|(name, present)| DroppedVariable {
            name: name.to_string(),
            present,
            expected: slices.len(),
            missing_dates: slices
                .iter()
                .filter(|(_, grids)| !grids.contains_key(name))
                .map(|(date, _)| *date)
                .collect(),
        })
        .collect()
}

/// First few dates plus a count, for log fields.
fn summarize_dates(dates: &[NaiveDate]) -> String {
    const SHOWN: usize = 5;
    let head: Vec<String> = dates.iter().take(SHOWN).map(|d| d.to_string()).collect();
    match dates.len().saturating_sub(SHOWN) {
        0 => head.join(", "),
        rest => format!("{} (+{rest} more)", head.join(", ")),
    }
}

fn describe_subset(subset: Option<&BoundingBox>) -> String {
    subset.map_or_else(|| "the full extent".to_string(), BoundingBox::describe)
}
