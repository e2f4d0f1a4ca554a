//! Error types for container retrieval.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Why a daily container could not be obtained.
///
/// Callers treat every variant except [`FetchError::Config`] as "not
/// available": the date is skipped and the batch continues.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Products for this date cannot exist yet.
    #[error("{date} is after {today}")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    /// The server says the file does not exist (404/403/410). Not retried.
    #[error("{url} is not published (HTTP {status})")]
    NotPublished { url: String, status: u16 },

    /// Any other non-success status, after retries.
    #[error("{url} returned HTTP {status} after {attempts} attempts")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// Transport failure, after retries.
    #[error("request to {url} failed after {attempts} attempts: {message}")]
    Http {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Every attempt ran into the request timeout.
    #[error("request to {url} timed out after {attempts} attempts")]
    Timeout { url: String, attempts: u32 },

    /// The server answered 200 with no content.
    #[error("{url} returned an empty body")]
    EmptyBody { url: String },

    /// Reading or writing the on-disk cache failed.
    #[error("cache error at {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid fetcher configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FetchError {
    pub(crate) fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Cache {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Http { .. } | Self::Timeout { .. }
        )
    }
}
