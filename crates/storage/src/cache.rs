//! On-disk cache of downloaded containers.
//!
//! Entries are keyed by remote filename and never expire: a published daily
//! container does not change. Writes go to a unique `.partial` sibling and
//! are renamed into place, so a reader never sees a half-written entry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// Suffix of in-progress cache writes.
pub const PARTIAL_SUFFIX: &str = ".partial";

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory of cached containers.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Create the cache directory if needed.
    pub async fn ensure_dir(&self) -> FetchResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| FetchError::cache(&self.dir, e))
    }

    pub async fn contains(&self, filename: &str) -> bool {
        fs::metadata(self.path_for(filename))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Cached bytes for `filename`, or `None` on a miss.
    pub async fn get(&self, filename: &str) -> FetchResult<Option<Bytes>> {
        let path = self.path_for(filename);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FetchError::cache(path, e)),
        }
    }

    /// Store `data` under `filename`, replacing any previous entry.
    pub async fn put(&self, filename: &str, data: &[u8]) -> FetchResult<PathBuf> {
        self.ensure_dir().await?;

        let final_path = self.path_for(filename);
        let partial_path = self.dir.join(format!(
            ".{}.{}-{}{}",
            filename,
            std::process::id(),
            PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed),
            PARTIAL_SUFFIX
        ));

        if let Err(e) = write_synced(&partial_path, data).await {
            let _ = fs::remove_file(&partial_path).await;
            return Err(FetchError::cache(partial_path, e));
        }
        if let Err(e) = fs::rename(&partial_path, &final_path).await {
            let _ = fs::remove_file(&partial_path).await;
            return Err(FetchError::cache(final_path, e));
        }

        debug!(path = %final_path.display(), bytes = data.len(), "Cached container");
        Ok(final_path)
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}
