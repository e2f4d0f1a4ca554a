//! Tests for the shared geometry, variable and bounding box types.

use chrono::NaiveDate;
use snow_common::{
    identify_variable, parse_date_key, BoundingBox, CommonError, DateRange, GeometryRegistry,
    GridGeometry, Region, VARIABLE_CODES,
};

// ============================================================================
// Geometry registry
// ============================================================================

#[test]
fn test_registry_detects_each_epoch_by_cell_count() {
    let registry = GeometryRegistry::snodas();
    for geometry in registry.iter() {
        let detected = registry.detect(geometry.column_count * geometry.row_count);
        assert_eq!(detected, Some(geometry));
    }
}

#[test]
fn test_registry_lookup_by_label() {
    let registry = GeometryRegistry::snodas();
    let g = registry.by_label("Post-Oct-2013").unwrap();
    assert_eq!((g.column_count, g.row_count), (3353, 3353));
    assert!(registry.by_label("unknown").is_none());
}

#[test]
fn test_custom_registry_collision_names_both_entries() {
    let err = GeometryRegistry::new(vec![
        GridGeometry::new("first", (0.0, 2.0), (0.0, 8.0), 2, 8),
        GridGeometry::new("second", (0.0, 4.0), (0.0, 4.0), 4, 4),
    ])
    .unwrap_err();

    match err {
        CommonError::GeometryCollision { first, second, cells } => {
            assert_eq!(first, "first");
            assert_eq!(second, "second");
            assert_eq!(cells, 16);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_geometry_bounds_match_extent() {
    let g = GridGeometry::pre_oct_2013();
    let b = g.bounds();
    assert_eq!(b.min_lon, g.min_longitude);
    assert_eq!(b.max_lat, g.max_latitude);
}

// ============================================================================
// Variable table
// ============================================================================

#[test]
fn test_every_code_is_identified_when_group_aligned() {
    for entry in VARIABLE_CODES {
        let name = format!("member_{}_x.dat.gz", entry.code);
        assert_eq!(identify_variable(&name), Some(entry.name));
    }
}

#[test]
fn test_every_code_is_identified_by_fallback() {
    for entry in VARIABLE_CODES {
        let name = format!("us_ssmv1{}tS__T0001TTNATS2021010105HP001.dat.gz", entry.code);
        assert_eq!(identify_variable(&name), Some(entry.name), "{name}");
    }
}

// ============================================================================
// Bounding boxes and dates
// ============================================================================

#[test]
fn test_colorado_region() {
    let region = Region::colorado();
    assert_eq!(region.name, "co");
    assert_eq!(region.bbox, BoundingBox::new(-109.0, 37.0, -104.0, 41.0));
    assert_eq!(region.bbox.width(), 5.0);
    assert_eq!(region.bbox.height(), 4.0);
}

#[test]
fn test_date_range_for_leap_year() {
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    let range = DateRange::for_year(2020, today).unwrap();
    assert_eq!(range.len(), 366);
    assert!(range.contains(parse_date_key("20200229").unwrap()));
}
