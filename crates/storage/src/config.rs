//! Fetcher configuration.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, FetchResult};
use crate::location::DEFAULT_BASE_URL;

/// Settings for [`RemoteGridFetcher`](crate::RemoteGridFetcher).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Root of the remote archive, without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
    /// Maximum concurrent HTTP requests.
    pub max_in_flight: usize,
    /// Date treated as "today" when rejecting future dates; `None` uses the clock.
    pub as_of: Option<NaiveDate>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(60),
            max_in_flight: 4,
            as_of: None,
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> FetchResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FetchError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.max_in_flight == 0 {
            return Err(FetchError::Config("max_in_flight must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(FetchError::Config("request_timeout must be positive".into()));
        }
        if self.initial_retry_delay > self.max_retry_delay {
            return Err(FetchError::Config(
                "initial_retry_delay must not exceed max_retry_delay".into(),
            ));
        }
        Ok(())
    }

    /// The date after which requests are refused.
    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FetchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = FetchConfig {
            base_url: "ftp://example".into(),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let no_slots = FetchConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        assert!(no_slots.validate().is_err());

        let inverted = FetchConfig {
            initial_retry_delay: Duration::from_secs(10),
            max_retry_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_as_of_overrides_clock() {
        let day = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
        let config = FetchConfig {
            as_of: Some(day),
            ..Default::default()
        };
        assert_eq!(config.today(), day);
    }
}
