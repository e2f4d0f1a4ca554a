//! Outcomes of archive builds and batch runs.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use storage::FetchStats;
use tracing::{info, warn};

/// Why a single date contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The container could not be retrieved.
    Unavailable(String),
    /// The container was retrieved but could not be decoded.
    Decode(String),
    /// The date decoded on axes different from the rest of the archive.
    AxesMismatch,
    /// The date lacks variables the existing archive holds.
    MissingVariables(Vec<String>),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::AxesMismatch => write!(f, "coordinate axes differ from the archive"),
            Self::MissingVariables(names) => {
                write!(f, "lacks archived variables: {}", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDate {
    pub date: NaiveDate,
    pub reason: FailureReason,
}

/// A variable left out because some successful dates lacked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedVariable {
    pub name: String,
    /// Successful dates that carried the variable.
    pub present: usize,
    /// Successful dates overall.
    pub expected: usize,
    pub missing_dates: Vec<NaiveDate>,
}

impl DroppedVariable {
    /// Fraction of successful dates carrying the variable.
    pub fn coverage(&self) -> f64 {
        if self.expected == 0 {
            return 0.0;
        }
        self.present as f64 / self.expected as f64
    }
}

/// How a build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// Every requested date was already archived.
    UpToDate,
    /// A new archive was written.
    Written,
    /// Nothing new decoded; the existing archive was kept.
    NoNewData,
    /// Nothing decoded and no archive existed.
    NoData,
    /// Dates decoded, but no variable was present on all of them.
    NoCompleteVariables,
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::UpToDate | Self::Written | Self::NoNewData)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UpToDate => "up to date",
            Self::Written => "written",
            Self::NoNewData => "no new data",
            Self::NoData => "no data decoded",
            Self::NoCompleteVariables => "no variable present on every decoded date",
        };
        f.write_str(text)
    }
}

/// Result of building one archive.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub status: BuildStatus,
    pub path: PathBuf,
    /// Dates that were missing from the archive and therefore requested.
    pub dates_requested: usize,
    /// Time steps new to the archive.
    pub dates_added: usize,
    pub failed_dates: Vec<FailedDate>,
    pub dropped_variables: Vec<DroppedVariable>,
    /// Variables in the archive after the build.
    pub variables: Vec<String>,
    /// Time steps in the archive after the build.
    pub time_steps: usize,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A year that produced no usable archive.
#[derive(Debug, Clone, PartialEq)]
pub struct YearFailure {
    pub year: i32,
    pub reason: String,
}

/// An archive found in the output directory after the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Summary of a multi-year run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<i32>,
    pub failed: Vec<YearFailure>,
    /// Outcome of every year whose build returned one, success or not.
    pub outcomes: Vec<(i32, BuildOutcome)>,
    pub inventory: Vec<ArchiveFile>,
    pub fetch: FetchStats,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn outcome(&self, year: i32) -> Option<&BuildOutcome> {
        self.outcomes
            .iter()
            .find(|(y, _)| *y == year)
            .map(|(_, outcome)| outcome)
    }

    /// Emit the end-of-run summary.
    pub fn log_summary(&self) {
        info!(
            succeeded = self.succeeded.len(),
            failed = self.failed.len(),
            cache_hits = self.fetch.cache_hits,
            downloads = self.fetch.downloads,
            fetch_failures = self.fetch.failures,
            bytes_downloaded = self.fetch.bytes_downloaded,
            "Batch complete"
        );

        for (year, outcome) in &self.outcomes {
            info!(
                year,
                status = %outcome.status,
                time_steps = outcome.time_steps,
                added = outcome.dates_added,
                failed_dates = outcome.failed_dates.len(),
                variables = ?outcome.variables,
                "Year summary"
            );
            for dropped in &outcome.dropped_variables {
                warn!(
                    year,
                    variable = %dropped.name,
                    present = dropped.present,
                    expected = dropped.expected,
                    coverage = format!("{:.1}%", dropped.coverage() * 100.0),
                    "Variable dropped for incomplete coverage"
                );
            }
        }

        for failure in &self.failed {
            warn!(year = failure.year, reason = %failure.reason, "Year failed");
        }

        for file in &self.inventory {
            info!(
                path = %file.path.display(),
                size_mb = format!("{:.1}", file.size_bytes as f64 / (1024.0 * 1024.0)),
                "Archive"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_success() {
        assert!(BuildStatus::UpToDate.is_success());
        assert!(BuildStatus::Written.is_success());
        assert!(BuildStatus::NoNewData.is_success());
        assert!(!BuildStatus::NoData.is_success());
        assert!(!BuildStatus::NoCompleteVariables.is_success());
    }

    #[test]
    fn test_coverage() {
        let dropped = DroppedVariable {
            name: "swe".into(),
            present: 9,
            expected: 10,
            missing_dates: vec![],
        };
        assert!((dropped.coverage() - 0.9).abs() < 1e-12);

        let empty = DroppedVariable {
            expected: 0,
            present: 0,
            ..dropped
        };
        assert_eq!(empty.coverage(), 0.0);
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::Unavailable("HTTP 404".into()).to_string(),
            "unavailable: HTTP 404"
        );
        assert!(FailureReason::AxesMismatch.to_string().contains("axes"));
    }
}
