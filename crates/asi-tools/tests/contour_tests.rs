//! Integration tests for CCD-space contours.

use asi_common::AsiError;
use asi_tools::config::ToolsConfig;
use asi_tools::contour::{self, ContourOptions, LatLonRequest};
use test_utils::{contains_point, reference_time, scenario_skymap, FailingMagnetic, OffsetMagnetic, SyntheticSkymap};

// ============================================================================
// Elevation
// ============================================================================

#[test]
fn test_elevation_crossings_with_edges() {
    let skymap = scenario_skymap();
    let c = contour::elevation(&skymap, 60.0, &ContourOptions::default().keep_edges()).unwrap();
    assert!(contains_point(&c.x, &c.y, 1.0, 1.0, 1e-9));
    assert!(contains_point(&c.x, &c.y, 1.2857, 0.0, 1e-3));
    assert!(contains_point(&c.x, &c.y, 1.6667, 2.0, 1e-3));
}

#[test]
fn test_elevation_above_maximum_is_empty() {
    let skymap = scenario_skymap();
    let c = contour::elevation(&skymap, 95.0, &ContourOptions::default().keep_edges()).unwrap();
    assert!(c.is_empty());
}

#[test]
fn test_elevation_at_maximum_is_peak_pixel() {
    let skymap = scenario_skymap();
    let c = contour::elevation(&skymap, 85.0, &ContourOptions::default().keep_edges()).unwrap();
    assert_eq!(c.len(), 1);
    assert_eq!((c.x[0], c.y[0]), (2.0, 0.0));
}

#[test]
fn test_edge_filter_follows_config() {
    let skymap = scenario_skymap();

    let filtered = ContourOptions::from_config(&ToolsConfig::default());
    let c = contour::elevation(&skymap, 60.0, &filtered).unwrap();
    assert!(contains_point(&c.x, &c.y, 1.0, 1.0, 1e-9));
    assert!(!contains_point(&c.x, &c.y, 1.2857, 0.0, 1e-3));

    let config = ToolsConfig::from_yaml_str("remove_edge_cases: false\n").unwrap();
    let c = contour::elevation(&skymap, 60.0, &ContourOptions::from_config(&config)).unwrap();
    assert!(contains_point(&c.x, &c.y, 1.2857, 0.0, 1e-3));
}

#[test]
fn test_zero_n_points_rejected() {
    let skymap = scenario_skymap();
    let err = contour::elevation(&skymap, 60.0, &ContourOptions::default().with_n_points(0)).unwrap_err();
    assert!(matches!(err, AsiError::InvalidParameter { .. }));
}

// ============================================================================
// Azimuth
// ============================================================================

#[test]
fn test_azimuth_east_stays_in_east_half() {
    let skymap = SyntheticSkymap::default().build();
    let c = contour::azimuth(&skymap, 90.0, None, None, &ContourOptions::default()).unwrap();
    assert!(!c.is_empty());
    assert!(c.x.iter().all(|&x| x >= 10.0));
    assert!(contains_point(&c.x, &c.y, 11.0, 10.0, 1e-9));
}

#[test]
fn test_azimuth_inverted_elevation_bounds() {
    let skymap = SyntheticSkymap::default().build();
    let err = contour::azimuth(&skymap, 90.0, Some(40.0), Some(20.0), &ContourOptions::default()).unwrap_err();
    assert!(matches!(err, AsiError::InvalidBounds(_)));
}

// ============================================================================
// Geographic / magnetic
// ============================================================================

#[test]
fn test_constant_latitude_follows_one_row() {
    let skymap = SyntheticSkymap::default().build();
    let c = contour::geo(&skymap, 110.0, &LatLonRequest::ConstantLat(56.02), &ContourOptions::default()).unwrap();
    assert!(!c.is_empty());
    assert!(c.y.iter().all(|&y| y == 10.0));
}

#[test]
fn test_unsupported_altitude() {
    let skymap = SyntheticSkymap::default().build();
    let err = contour::geo(&skymap, 120.0, &LatLonRequest::ConstantLat(56.02), &ContourOptions::default()).unwrap_err();
    match err {
        AsiError::UnsupportedAltitude { requested_km, valid_km } => {
            assert_eq!(requested_km, 120.0);
            assert_eq!(valid_km, vec![90.0, 110.0, 150.0]);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_magnetic_constant_latitude_under_offset() {
    let skymap = SyntheticSkymap::default().build();
    let transform = OffsetMagnetic::new(10.0, 50.0);
    let c = contour::mag(
        &skymap,
        &transform,
        reference_time(),
        110.0,
        &LatLonRequest::ConstantLat(66.02),
        &ContourOptions::default(),
    )
    .unwrap();
    assert!(!c.is_empty());
    assert!(c.y.iter().all(|&y| y == 10.0));
}

#[test]
fn test_magnetic_without_solutions_is_empty() {
    let skymap = SyntheticSkymap::default().build();
    let c = contour::mag(
        &skymap,
        &FailingMagnetic,
        reference_time(),
        110.0,
        &LatLonRequest::ConstantLat(66.02),
        &ContourOptions::default(),
    )
    .unwrap();
    assert!(c.is_empty());
}
