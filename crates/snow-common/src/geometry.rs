//! Grid geometries used by the SNODAS products.
//!
//! SNODAS rasters carry no header, so the only way to tell which grid a
//! payload belongs to is its element count. The registry enforces that
//! `column_count * row_count` is unique among its entries.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{CommonError, CommonResult};

/// A regular lat/lon raster extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub column_count: usize,
    pub row_count: usize,
    /// Epoch name recorded in archive metadata (e.g. "Post-Oct-2013").
    pub label: String,
}

impl GridGeometry {
    pub fn new(
        label: impl Into<String>,
        (min_longitude, max_longitude): (f64, f64),
        (min_latitude, max_latitude): (f64, f64),
        column_count: usize,
        row_count: usize,
    ) -> Self {
        Self {
            min_longitude,
            max_longitude,
            min_latitude,
            max_latitude,
            column_count,
            row_count,
            label: label.into(),
        }
    }

    /// SNODAS masked grid before the October 2013 change.
    pub fn pre_oct_2013() -> Self {
        Self::new(
            "Pre-Oct-2013",
            (-124.73375000000000, -66.94208333333333),
            (24.94958333333333, 52.87458333333333),
            6935,
            3351,
        )
    }

    /// SNODAS masked grid from October 2013 onwards.
    pub fn post_oct_2013() -> Self {
        Self::new(
            "Post-Oct-2013",
            (-124.73333333333333, -66.94166666666667),
            (24.95000000000000, 52.87500000000000),
            3353,
            3353,
        )
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.column_count * self.row_count
    }

    /// Cell width in degrees.
    pub fn cell_size_x(&self) -> f64 {
        (self.max_longitude - self.min_longitude) / self.column_count as f64
    }

    /// Cell height in degrees.
    pub fn cell_size_y(&self) -> f64 {
        (self.max_latitude - self.min_latitude) / self.row_count as f64
    }

    /// Outer extent of the grid.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_longitude,
            self.min_latitude,
            self.max_longitude,
            self.max_latitude,
        )
    }

    fn validate(&self) -> CommonResult<()> {
        let invalid = |message: &str| CommonError::InvalidGeometry {
            label: self.label.clone(),
            message: message.to_string(),
        };

        if self.column_count == 0 || self.row_count == 0 {
            return Err(invalid("column_count and row_count must be > 0"));
        }
        if !(self.min_longitude < self.max_longitude) {
            return Err(invalid("min_longitude must be < max_longitude"));
        }
        if !(self.min_latitude < self.max_latitude) {
            return Err(invalid("min_latitude must be < max_latitude"));
        }
        Ok(())
    }
}

/// Catalog of known geometries, keyed by cell count.
#[derive(Debug, Clone)]
pub struct GeometryRegistry {
    geometries: Vec<GridGeometry>,
}

impl GeometryRegistry {
    /// Build a registry, rejecting invalid entries and cell-count collisions.
    pub fn new(geometries: Vec<GridGeometry>) -> CommonResult<Self> {
        for (i, geometry) in geometries.iter().enumerate() {
            geometry.validate()?;

            if let Some(other) = geometries[..i]
                .iter()
                .find(|g| g.cell_count() == geometry.cell_count())
            {
                return Err(CommonError::GeometryCollision {
                    first: other.label.clone(),
                    second: geometry.label.clone(),
                    cells: geometry.cell_count(),
                });
            }
        }

        Ok(Self { geometries })
    }

    /// The two historical SNODAS grids.
    pub fn snodas() -> Self {
        // The two built-in grids have distinct cell counts.
        Self {
            geometries: vec![GridGeometry::pre_oct_2013(), GridGeometry::post_oct_2013()],
        }
    }

    /// Find the geometry whose cell count equals `element_count`.
    pub fn detect(&self, element_count: usize) -> Option<&GridGeometry> {
        self.geometries
            .iter()
            .find(|g| g.cell_count() == element_count)
    }

    /// Look up a geometry by its label.
    pub fn by_label(&self, label: &str) -> Option<&GridGeometry> {
        self.geometries.iter().find(|g| g.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridGeometry> {
        self.geometries.iter()
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

impl Default for GeometryRegistry {
    fn default() -> Self {
        Self::snodas()
    }
}
