//! Error types for container decoding.

use thiserror::Error;

/// Result type for decoder operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reasons a daily container cannot be turned into grids.
///
/// Every variant rejects the whole container; callers record the date as
/// failed and move on.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The tar stream itself is unreadable.
    #[error("corrupt container: {0}")]
    Container(String),

    /// A member's gzip stream is unreadable.
    #[error("failed to decompress {member}: {message}")]
    Decompress { member: String, message: String },

    /// No registered geometry has this many cells.
    #[error("no registered grid geometry has {element_count} cells")]
    UnknownGeometry { element_count: usize },

    /// A member's byte length disagrees with the detected geometry.
    #[error("{member} holds {actual} bytes, expected {expected} for {geometry}")]
    PayloadSize {
        member: String,
        expected: usize,
        actual: usize,
        geometry: String,
    },

    /// Not a single member was identified as a known variable.
    #[error("container holds no recognised variables")]
    NoVariables,

    /// The subset box selects no cell of the grid.
    #[error("subset {bbox} selects no cells of {geometry}")]
    EmptySubset { bbox: String, geometry: String },
}
