//! Common types and utilities shared across the SNODAS archive crates.

pub mod bbox;
pub mod error;
pub mod geometry;
pub mod time;
pub mod variables;

pub use bbox::{BoundingBox, Region};
pub use error::{CommonError, CommonResult};
pub use geometry::{GeometryRegistry, GridGeometry};
pub use time::{parse_date_key, date_key, DateRange};
pub use variables::{identify_variable, variable_name, VariableCode, NODATA_RAW, VARIABLE_CODES};
