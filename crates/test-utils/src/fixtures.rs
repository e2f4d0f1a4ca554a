//! Common test fixtures for SNODAS archive tests.
//!
//! Real SNODAS grids hold tens of millions of cells; these stand-ins keep
//! the same layout conventions at a size a unit test can decode in
//! microseconds.

use chrono::NaiveDate;
use snow_common::{BoundingBox, GeometryRegistry, GridGeometry};

/// Label of the coarse test geometry.
pub const TEST_OLD_LABEL: &str = "Test-Old";

/// Label of the fine test geometry.
pub const TEST_NEW_LABEL: &str = "Test-New";

/// 10 x 8 cells of 1 degree over lon -110..-100, lat 35..43.
pub fn test_old_geometry() -> GridGeometry {
    GridGeometry::new(TEST_OLD_LABEL, (-110.0, -100.0), (35.0, 43.0), 10, 8)
}

/// 20 x 16 cells of 0.5 degree over the same extent.
pub fn test_new_geometry() -> GridGeometry {
    GridGeometry::new(TEST_NEW_LABEL, (-110.0, -100.0), (35.0, 43.0), 20, 16)
}

/// Registry holding both test geometries.
pub fn test_registry() -> GeometryRegistry {
    GeometryRegistry::new(vec![test_old_geometry(), test_new_geometry()])
        .expect("test geometries have distinct cell counts")
}

/// Box covering the western half of the test extent and all of its latitudes.
pub fn western_half_bbox() -> BoundingBox {
    BoundingBox::new(-110.0, 35.0, -105.0, 43.0)
}

/// Shorthand for building dates in tests.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Consecutive days starting at `start`.
pub fn days_from(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start.iter_days().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_detects_both() {
        let registry = test_registry();
        assert_eq!(registry.detect(80).unwrap().label, TEST_OLD_LABEL);
        assert_eq!(registry.detect(320).unwrap().label, TEST_NEW_LABEL);
    }

    #[test]
    fn test_days_from() {
        let days = days_from(date(2021, 1, 30), 3);
        assert_eq!(days, vec![date(2021, 1, 30), date(2021, 1, 31), date(2021, 2, 1)]);
    }
}
