//! Tests for BoundingBox parsing, validity and transformation.

use tile_common::bbox::{lonlat_to_mercator, mercator_to_lonlat, BboxParseError, MERCATOR_MAX_EXTENT};
use tile_common::{BoundingBox, CrsCode};

// ============================================================================
// from_bbox_string tests
// ============================================================================

#[test]
fn test_parse_bbox_integer() {
    let bbox = BoundingBox::from_bbox_string("0,0,100,100").unwrap();
    assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_parse_bbox_web_mercator() {
    let bbox =
        BoundingBox::from_bbox_string("-20037508.34,-20037508.34,20037508.34,20037508.34").unwrap();
    assert!((bbox.min_x - (-20037508.34)).abs() < 0.01);
    assert!((bbox.max_x - 20037508.34).abs() < 0.01);
}

#[test]
fn test_parse_bbox_tolerates_spaces() {
    let bbox = BoundingBox::from_bbox_string(" 5.0, 47.0, 15.0, 55.0 ").unwrap();
    assert_eq!(bbox, BoundingBox::new(5.0, 47.0, 15.0, 55.0));
}

#[test]
fn test_parse_bbox_invalid_format() {
    assert!(matches!(
        BoundingBox::from_bbox_string("0,0,100"),
        Err(BboxParseError::InvalidFormat(_))
    ));
    assert!(matches!(
        BoundingBox::from_bbox_string("0,0,100,100,200"),
        Err(BboxParseError::InvalidFormat(_))
    ));
}

#[test]
fn test_parse_bbox_invalid_number() {
    let result = BoundingBox::from_bbox_string("abc,0,100,100");
    assert!(matches!(result, Err(BboxParseError::InvalidNumber(_))));
}

#[test]
fn test_parse_bbox_rejects_inverted() {
    let result = BoundingBox::from_bbox_string("10,10,0,0");
    assert!(matches!(result, Err(BboxParseError::Degenerate(_))));
}

// ============================================================================
// Validity tests
// ============================================================================

#[test]
fn test_bbox_validity() {
    assert!(BoundingBox::new(0.0, 0.0, 1e-10, 1e-10).is_valid());
    assert!(!BoundingBox::new(5.0, 5.0, 5.0, 5.0).is_valid());
    assert!(!BoundingBox::new(10.0, 10.0, 0.0, 0.0).is_valid());
    assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
    assert!(!BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0).is_valid());
}

// ============================================================================
// Intersection tests
// ============================================================================

#[test]
fn test_bbox_intersects_is_symmetric() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
}

#[test]
fn test_bbox_intersects_adjacent_edge() {
    // Touching at edge - not intersecting (open interval)
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert!(!a.intersects(&b));
}

// ============================================================================
// Transformation tests
// ============================================================================

#[test]
fn test_transform_identity() {
    let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!(bbox.transform(CrsCode::Epsg3413, CrsCode::Epsg3413), Some(bbox));
}

#[test]
fn test_transform_unsupported_pair() {
    let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!(bbox.transform(CrsCode::Epsg4326, CrsCode::Epsg3413), None);
}

#[test]
fn test_lonlat_to_mercator_origin_and_antimeridian() {
    let (x, y) = lonlat_to_mercator(0.0, 0.0);
    assert!(x.abs() < 1e-9);
    assert!(y.abs() < 1e-9);

    let (x, _) = lonlat_to_mercator(180.0, 0.0);
    assert!((x - MERCATOR_MAX_EXTENT).abs() < 1e-6);
}

#[test]
fn test_lonlat_to_mercator_clamps_poles() {
    let (_, y) = lonlat_to_mercator(0.0, 90.0);
    assert!(y.is_finite());
    assert!((y - MERCATOR_MAX_EXTENT).abs() < 1.0);
}

#[test]
fn test_mercator_to_lonlat_inverse() {
    let (lon, lat) = mercator_to_lonlat(1_113_194.9079327357, 6_446_275.841017158);
    assert!((lon - 10.0).abs() < 1e-6);
    assert!((lat - 50.0).abs() < 1e-6);
}
