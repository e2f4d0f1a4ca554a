//! Container decoding: geometry detection, conversion and subsetting.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use snow_common::{BoundingBox, GeometryRegistry, GridGeometry};
use tracing::{debug, warn};

use crate::axes::CoordinateAxes;
use crate::container::for_each_raster;
use crate::error::{DecodeError, DecodeResult};
use crate::payload::decode_payload;
use crate::subset::SubsetWindow;

/// One variable of one day, in meters, row-major `(rows, cols)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGrid {
    pub variable: String,
    pub date: NaiveDate,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl DecodedGrid {
    /// Value at a row and column, if in range.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }
}

/// Everything decoded from one daily container.
#[derive(Debug, Clone)]
pub struct DecodedDate {
    pub date: NaiveDate,
    /// Full-extent geometry the payloads matched.
    pub geometry: GridGeometry,
    /// Axes after subsetting.
    pub axes: CoordinateAxes,
    pub grids: BTreeMap<String, DecodedGrid>,
}

impl DecodedDate {
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.grids.keys().map(String::as_str)
    }

    pub fn grid(&self, variable: &str) -> Option<&DecodedGrid> {
        self.grids.get(variable)
    }
}

/// Geometry and crop window fixed by the first recognised member.
struct Layout {
    geometry: GridGeometry,
    full_axes: CoordinateAxes,
    window: SubsetWindow,
}

impl Layout {
    fn detect(
        element_count: usize,
        registry: &GeometryRegistry,
        subset: Option<&BoundingBox>,
    ) -> DecodeResult<Self> {
        let geometry = registry
            .detect(element_count)
            .ok_or(DecodeError::UnknownGeometry { element_count })?
            .clone();
        let full_axes = CoordinateAxes::from_geometry(&geometry);
        let window = match subset {
            Some(bbox) => SubsetWindow::for_bbox(&full_axes, bbox).ok_or_else(|| {
                DecodeError::EmptySubset {
                    bbox: bbox.describe(),
                    geometry: geometry.label.clone(),
                }
            })?,
            None => SubsetWindow::full(&full_axes),
        };
        Ok(Self {
            geometry,
            full_axes,
            window,
        })
    }
}

/// Decode a daily tarball into physical-unit grids.
///
/// The geometry is detected once, from the first recognised member, and every
/// further member must match it byte for byte. A variable appearing twice
/// keeps its last occurrence.
pub fn decode_container(
    container: &[u8],
    date: NaiveDate,
    registry: &GeometryRegistry,
    subset: Option<&BoundingBox>,
) -> DecodeResult<DecodedDate> {
    let mut layout: Option<Layout> = None;
    let mut grids = BTreeMap::new();

    for_each_raster(container, |member| {
        if layout.is_none() {
            layout = Some(Layout::detect(member.payload.len() / 2, registry, subset)?);
        }
        let Some(layout) = layout.as_ref() else {
            return Err(DecodeError::NoVariables);
        };

        let expected = layout.geometry.cell_count() * 2;
        if member.payload.len() != expected {
            return Err(DecodeError::PayloadSize {
                member: member.name,
                expected,
                actual: member.payload.len(),
                geometry: layout.geometry.label.clone(),
            });
        }

        let values = decode_payload(&member.payload);
        let data = if layout.window.is_full(&layout.full_axes) {
            values
        } else {
            layout.window.apply_grid(&values)
        };

        if grids.contains_key(member.variable) {
            warn!(
                %date,
                variable = member.variable,
                member = %member.name,
                "Duplicate variable in container, keeping the later member"
            );
        }
        grids.insert(
            member.variable.to_string(),
            DecodedGrid {
                variable: member.variable.to_string(),
                date,
                rows: layout.window.rows(),
                cols: layout.window.cols(),
                data,
            },
        );
        Ok(())
    })?;

    let layout = match layout {
        Some(layout) if !grids.is_empty() => layout,
        _ => return Err(DecodeError::NoVariables),
    };

    debug!(
        %date,
        grid = %layout.geometry.label,
        variables = grids.len(),
        rows = layout.window.rows(),
        cols = layout.window.cols(),
        "Decoded container"
    );

    Ok(DecodedDate {
        date,
        axes: layout.window.apply_axes(&layout.full_axes),
        geometry: layout.geometry,
        grids,
    })
}
