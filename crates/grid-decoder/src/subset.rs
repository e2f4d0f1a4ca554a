//! Spatial subsetting by bounding box.
//!
//! Cropping is by index range over the cell-centre axes; values are copied,
//! never resampled.

use snow_common::BoundingBox;

use crate::axes::CoordinateAxes;

/// Half-open row and column ranges selected from a full grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
    /// Column count of the grid the window was computed on.
    source_cols: usize,
}

impl SubsetWindow {
    /// The window covering every cell.
    pub fn full(axes: &CoordinateAxes) -> Self {
        Self {
            row_start: 0,
            row_end: axes.rows(),
            col_start: 0,
            col_end: axes.cols(),
            source_cols: axes.cols(),
        }
    }

    /// Cells whose centres lie inside `bbox`, edges included.
    ///
    /// Returns `None` when no row or no column qualifies.
    pub fn for_bbox(axes: &CoordinateAxes, bbox: &BoundingBox) -> Option<Self> {
        let (row_start, row_end) = index_range(&axes.latitude, |lat| bbox.contains_lat(lat))?;
        let (col_start, col_end) = index_range(&axes.longitude, |lon| bbox.contains_lon(lon))?;
        Some(Self {
            row_start,
            row_end,
            col_start,
            col_end,
            source_cols: axes.cols(),
        })
    }

    pub fn rows(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn cols(&self) -> usize {
        self.col_end - self.col_start
    }

    pub fn cell_count(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_full(&self, axes: &CoordinateAxes) -> bool {
        *self == Self::full(axes)
    }

    /// Crop the axes.
    pub fn apply_axes(&self, axes: &CoordinateAxes) -> CoordinateAxes {
        CoordinateAxes {
            latitude: axes.latitude[self.row_start..self.row_end].to_vec(),
            longitude: axes.longitude[self.col_start..self.col_end].to_vec(),
        }
    }

    /// Crop a row-major grid of the source shape.
    pub fn apply_grid(&self, data: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.cell_count());
        for row in self.row_start..self.row_end {
            let offset = row * self.source_cols;
            out.extend_from_slice(&data[offset + self.col_start..offset + self.col_end]);
        }
        out
    }
}

/// First and one-past-last index satisfying `keep`; axes are monotonic, so
/// the selected indices are contiguous.
fn index_range(values: &[f64], keep: impl Fn(f64) -> bool) -> Option<(usize, usize)> {
    let first = values.iter().position(|v| keep(*v))?;
    let last = values.iter().rposition(|v| keep(*v))?;
    Some((first, last + 1))
}
