//! Decoder for SNODAS daily containers.
//!
//! A container is a tar archive of gzip-compressed members, each a headerless
//! row-major raster of big-endian `i16`. The grid geometry is inferred from
//! the element count via a [`GeometryRegistry`](snow_common::GeometryRegistry);
//! values are scaled to meters with the nodata sentinel mapped to `NaN`.
//! An optional bounding box crops every grid and axis by index.

pub mod axes;
pub mod container;
pub mod decoder;
pub mod error;
pub mod payload;
pub mod subset;

pub use axes::{linspace, CoordinateAxes, AXIS_TOLERANCE};
pub use decoder::{decode_container, DecodedDate, DecodedGrid};
pub use error::{DecodeError, DecodeResult};
pub use payload::{convert_raw, decode_payload, SCALE_FACTOR, ZERO_THRESHOLD};
pub use subset::SubsetWindow;
