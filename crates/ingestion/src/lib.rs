//! SNODAS archive assembly.
//!
//! Turns daily containers from a [`GridSource`](storage::GridSource) into
//! per-year archives and keeps them up to date.
//!
//! # Architecture
//!
//! - [`ArchiveAssembler`] builds or incrementally extends one archive from a
//!   date range: fetches only missing dates, decodes them on the blocking
//!   pool, drops incomplete variables and writes atomically.
//! - [`BatchDriver`] runs the assembler once per year and reports what
//!   happened, without letting one year's failure stop the rest.

pub mod assembler;
pub mod batch;
pub mod config;
pub mod error;
pub mod report;

// Re-exports
pub use assembler::ArchiveAssembler;
pub use batch::{inventory, BatchDriver};
pub use config::{AssemblerConfig, BatchConfig, DEFAULT_PARALLELISM};
pub use error::{BatchError, BuildError, Result};
pub use report::{
    ArchiveFile, BatchReport, BuildOutcome, BuildStatus, DroppedVariable, FailedDate,
    FailureReason, YearFailure,
};
