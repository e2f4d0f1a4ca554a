//! Cell-centre coordinate axes.

use snow_common::GridGeometry;

/// Tolerance used when comparing axes from different containers.
pub const AXIS_TOLERANCE: f64 = 1e-9;

/// Latitude (descending, north first) and longitude (ascending) of cell centres.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateAxes {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

impl CoordinateAxes {
    /// Build the axes of a full grid.
    ///
    /// Row 0 of a SNODAS raster is the northern edge, so latitude runs from
    /// `max - dy/2` down to `min + dy/2`.
    pub fn from_geometry(geometry: &GridGeometry) -> Self {
        let dx = geometry.cell_size_x();
        let dy = geometry.cell_size_y();
        Self {
            longitude: linspace(
                geometry.min_longitude + dx / 2.0,
                geometry.max_longitude - dx / 2.0,
                geometry.column_count,
            ),
            latitude: linspace(
                geometry.max_latitude - dy / 2.0,
                geometry.min_latitude + dy / 2.0,
                geometry.row_count,
            ),
        }
    }

    pub fn rows(&self) -> usize {
        self.latitude.len()
    }

    pub fn cols(&self) -> usize {
        self.longitude.len()
    }

    /// Same lengths and every coordinate within [`AXIS_TOLERANCE`].
    pub fn approx_eq(&self, other: &CoordinateAxes) -> bool {
        fn close(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= AXIS_TOLERANCE)
        }
        close(&self.latitude, &other.latitude) && close(&self.longitude, &other.longitude)
    }
}

/// `n` evenly spaced values from `start` to `stop`, both included.
///
/// Matches numpy's `linspace`: the last value is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}
