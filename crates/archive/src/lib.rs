//! Per-year SNODAS archives stored as Zarr V3 groups.
//!
//! Each archive is one directory holding a `time` coordinate (days since
//! 1970-01-01), `latitude`/`longitude` cell-centre coordinates, and one
//! `float32` array per variable shaped `[time, latitude, longitude]` with
//! `NaN` as nodata.
//!
//! # Write path
//!
//! ```text
//! ArchiveDataset (new days)      ExistingArchive (on disk)
//!          │                              │
//!          └──────────► MergePlan ◄───────┘
//!                          │   sorted union, existing wins
//!                          ▼
//!     ArchiveWriter::write ──► .name.tmp-*  (slice-by-slice copy)
//!                          │
//!                          ▼
//!          name ──► name.bak, tmp ──► name, rm name.bak
//! ```
//!
//! # Example
//!
//! ```ignore
//! use archive::{ArchiveConfig, ArchiveWriter, ExistingArchive, MergePlan};
//!
//! let existing = ExistingArchive::open(&path)?;
//! let plan = MergePlan::new(existing.times(), &new.times);
//! ArchiveWriter::new(ArchiveConfig::default())?
//!     .write(&path, &attrs, &new.axes, &plan, Some(&existing), &new)?;
//! ```

pub mod attributes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod layout;
pub mod merge;
pub mod reader;
pub mod time;
pub mod writer;

pub use attributes::{ArchiveAttributes, FULL_EXTENT};
pub use config::{ArchiveCompression, ArchiveConfig};
pub use dataset::ArchiveDataset;
pub use error::{ArchiveError, Result};
pub use layout::archive_file_name;
pub use merge::{MergePlan, SliceSource};
pub use reader::ExistingArchive;
pub use time::{date_to_days, days_to_date};
pub use writer::{recover, ArchiveWriter, Recovery, WriteSummary};
