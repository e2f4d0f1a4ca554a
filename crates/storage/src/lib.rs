//! Retrieval of SNODAS daily containers.
//!
//! Provides:
//! - [`GridSource`]: the seam the assembler fetches through
//! - [`RemoteGridFetcher`]: HTTPS retrieval with retry, backoff and a request limit
//! - [`DiskCache`]: never-expiring on-disk copies keyed by remote filename

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod location;

pub use cache::DiskCache;
pub use config::FetchConfig;
pub use error::{FetchError, FetchResult};
pub use fetcher::{FetchStats, GridSource, RawContainer, RemoteGridFetcher};
pub use location::{container_filename, month_dir, RemoteLocation, DEFAULT_BASE_URL};
