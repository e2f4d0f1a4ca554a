//! Error types shared by the SNODAS archive crates.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Configuration and parsing errors for the shared types.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Geometries '{first}' and '{second}' both have {cells} cells")]
    GeometryCollision {
        first: String,
        second: String,
        cells: usize,
    },

    #[error("Invalid grid geometry '{label}': {message}")]
    InvalidGeometry { label: String, message: String },

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Invalid date '{0}', expected YYYYMMDD or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },
}
