//! Retrieval of daily containers: cache first, then HTTP with bounded retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::NaiveDate;
use futures::StreamExt;
use metrics::counter;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::cache::DiskCache;
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::location::RemoteLocation;

/// A daily tarball as retrieved, before decoding.
#[derive(Debug, Clone)]
pub struct RawContainer {
    pub date: NaiveDate,
    /// Remote filename, also the cache key.
    pub filename: String,
    pub bytes: Bytes,
    pub from_cache: bool,
}

/// Counters for the final run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub cache_hits: u64,
    pub downloads: u64,
    pub failures: u64,
    pub bytes_downloaded: u64,
}

/// Anything that can produce the container for a date.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Retrieve the container for `date`. Any error means the date is unavailable.
    async fn fetch(&self, date: NaiveDate) -> FetchResult<RawContainer>;

    /// Retrieval counters so far.
    fn stats(&self) -> FetchStats {
        FetchStats::default()
    }
}

#[derive(Debug, Default)]
struct StatCounters {
    cache_hits: AtomicU64,
    downloads: AtomicU64,
    failures: AtomicU64,
    bytes_downloaded: AtomicU64,
}

/// Fetches containers from the NSIDC HTTPS archive through a [`DiskCache`].
pub struct RemoteGridFetcher {
    client: Client,
    config: FetchConfig,
    cache: DiskCache,
    permits: Arc<Semaphore>,
    stats: StatCounters,
}

impl RemoteGridFetcher {
    pub fn new(config: FetchConfig, cache: DiskCache) -> FetchResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_in_flight)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            cache,
            stats: StatCounters::default(),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Download with exponential backoff on transient failures.
    async fn download(&self, location: &RemoteLocation) -> FetchResult<Bytes> {
        let mut attempt = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempt += 1;
            match self.try_download(location, attempt).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt <= self.config.max_retries => {
                    warn!(
                        url = %location.url,
                        error = %e,
                        retry = attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_download(&self, location: &RemoteLocation, attempt: u32) -> FetchResult<Bytes> {
        let url = &location.url;
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Http {
            url: url.clone(),
            attempts: attempt,
            message: "request limiter closed".into(),
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, attempt, e))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::GONE
        ) {
            return Err(FetchError::NotPublished {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
                attempts: attempt,
            });
        }

        let mut body = BytesMut::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(url, attempt, e))?;
            body.extend_from_slice(&chunk);
        }
        if body.is_empty() {
            return Err(FetchError::EmptyBody { url: url.clone() });
        }
        Ok(body.freeze())
    }

    fn record_failure(&self) {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        counter!("snodas_fetch_failures_total").increment(1);
    }
}

#[async_trait]
impl GridSource for RemoteGridFetcher {
    #[instrument(skip(self), fields(date = %date))]
    async fn fetch(&self, date: NaiveDate) -> FetchResult<RawContainer> {
        let today = self.config.today();
        if date > today {
            return Err(FetchError::FutureDate { date, today });
        }

        let location = RemoteLocation::for_date(&self.config.base_url, date);

        if let Some(bytes) = self.cache.get(&location.filename).await? {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            counter!("snodas_fetch_cache_hits_total").increment(1);
            debug!(filename = %location.filename, "Cache hit");
            return Ok(RawContainer {
                date,
                filename: location.filename,
                bytes,
                from_cache: true,
            });
        }

        let bytes = match self.download(&location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.record_failure();
                return Err(e);
            }
        };

        if let Err(e) = self.cache.put(&location.filename, &bytes).await {
            self.record_failure();
            return Err(e);
        }

        self.stats.downloads.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_downloaded
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        counter!("snodas_fetch_downloads_total").increment(1);
        info!(url = %location.url, bytes = bytes.len(), "Downloaded container");

        Ok(RawContainer {
            date,
            filename: location.filename,
            bytes,
            from_cache: false,
        })
    }

    fn stats(&self) -> FetchStats {
        FetchStats {
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            downloads: self.stats.downloads.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            bytes_downloaded: self.stats.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

fn transport_error(url: &str, attempts: u32, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            attempts,
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            attempts,
            message: error.to_string(),
        }
    }
}
