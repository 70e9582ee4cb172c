//! Integration tests for region metrics.

use asi_common::{AsiError, LonLatBounds};
use asi_tools::metric::{extract_metric, extract_metric_single, Metric, RegionBounds};
use test_utils::{
    constant_stack, indexed_stack, reference_time, scenario_skymap, stack_from_fn, OffsetMagnetic, SyntheticSkymap,
};

#[test]
fn test_full_frame_ccd_mean() {
    let stack = indexed_stack(4, 5, 1, 2);
    let bounds = RegionBounds::Ccd { y0: 0, y1: 3, x0: 0, x1: 4 };
    let out = extract_metric_single(&stack, None, &bounds, Metric::Mean, None).unwrap();
    assert_eq!(out, vec![1502.0, 1_001_502.0]);
}

#[test]
fn test_ccd_bounds_outside_image() {
    let stack = indexed_stack(4, 5, 1, 1);
    let bounds = RegionBounds::Ccd { y0: 0, y1: 4, x0: 0, x1: 4 };
    let err = extract_metric(&stack, None, &bounds, Metric::Median, None).unwrap_err();
    assert!(matches!(err, AsiError::InvalidBounds(_)));
}

#[test]
fn test_elevation_band_selects_zenith() {
    let skymap = SyntheticSkymap::default().build();
    let stack = indexed_stack(21, 21, 1, 1);
    let bounds = RegionBounds::Elevation { min: 89.0, max: 90.0 };
    let out = extract_metric_single(&stack, Some(&skymap), &bounds, Metric::Sum, None).unwrap();
    assert_eq!(out, vec![10_010.0]);
}

#[test]
fn test_non_ccd_bounds_need_skymap() {
    let stack = indexed_stack(21, 21, 1, 1);
    let bounds = RegionBounds::Elevation { min: 10.0, max: 90.0 };
    let err = extract_metric(&stack, None, &bounds, Metric::Median, None).unwrap_err();
    assert!(matches!(err, AsiError::InvalidParameter { .. }));
}

#[test]
fn test_magnetic_box_matches_shifted_geographic_box() {
    let skymap = SyntheticSkymap::default().build();
    let stack = constant_stack::<u16>(21, 21, 3, 1);
    let transform = OffsetMagnetic::new(10.0, 50.0);

    let geo = RegionBounds::Geographic {
        bounds: LonLatBounds::new(-110.6, -109.4, 55.9, 56.3).unwrap(),
        altitude_km: 110.0,
    };
    let mag = RegionBounds::Magnetic {
        bounds: LonLatBounds::new(-60.6, -59.4, 65.9, 66.3).unwrap(),
        altitude_km: 110.0,
        timestamp: reference_time(),
    };

    let g = extract_metric_single(&stack, Some(&skymap), &geo, Metric::Sum, None).unwrap();
    let m = extract_metric_single(&stack, Some(&skymap), &mag, Metric::Sum, Some(&transform)).unwrap();
    assert_eq!(g, vec![24.0; 3]);
    assert_eq!(g, m);
}

#[test]
fn test_region_outside_field_of_view() {
    let skymap = SyntheticSkymap::default().build();
    let stack = constant_stack::<u16>(21, 21, 1, 1);
    let bounds = RegionBounds::Geographic {
        bounds: LonLatBounds::new(10.0, 20.0, 10.0, 20.0).unwrap(),
        altitude_km: 110.0,
    };
    let err = extract_metric(&stack, Some(&skymap), &bounds, Metric::Median, None).unwrap_err();
    assert!(matches!(err, AsiError::EmptyRegion(_)));
}

#[test]
fn test_full_ccd_bounds_match_unmasked_metric() {
    let stack = stack_from_fn::<u16>(4, 5, 2, 3, |r, c, ch, f| ((r * 7 + c * 3 + ch * 11 + f * 5) % 13) as u16);
    let bounds = RegionBounds::Ccd { y0: 0, y1: 3, x0: 0, x1: 4 };
    for metric in [Metric::Mean, Metric::Median, Metric::Sum] {
        let out = extract_metric(&stack, None, &bounds, metric, None).unwrap();
        for f in 0..3 {
            for ch in 0..2 {
                let mut all: Vec<f64> = (0..4)
                    .flat_map(|r| (0..5).map(move |c| (r, c)))
                    .map(|(r, c)| stack.value(r, c, ch, f))
                    .collect();
                assert_eq!(out[[f, ch]], metric.apply(&mut all), "{:?} frame {} channel {}", metric, f, ch);
            }
        }
    }
}

#[test]
fn test_channels_aggregate_independently() {
    let stack = indexed_stack(4, 5, 3, 2);
    let bounds = RegionBounds::Ccd { y0: 1, y1: 2, x0: 1, x1: 3 };
    let out = extract_metric(&stack, None, &bounds, Metric::Mean, None).unwrap();
    assert_eq!(out.dim(), (2, 3));
    // mean of rows 1..=2 and cols 1..=3 is 1502 before the channel and frame offsets
    assert_eq!(out[[0, 0]], 1502.0);
    assert_eq!(out[[0, 1]], 101_502.0);
    assert_eq!(out[[0, 2]], 201_502.0);
    assert_eq!(out[[1, 2]], 1_201_502.0);
}

#[test]
fn test_azimuth_range_across_north() {
    let skymap = SyntheticSkymap::default().build();
    let dim = skymap.dim();
    let count = |start: f64, end: f64| {
        RegionBounds::Azimuth { start, end }
            .mask(dim, Some(&skymap), None)
            .unwrap()
            .iter()
            .filter(|&&m| m)
            .count()
    };

    let wrapped = RegionBounds::Azimuth { start: 350.0, end: 10.0 }
        .mask(dim, Some(&skymap), None)
        .unwrap();
    // straight north of centre has azimuth 0, straight south 180
    assert!(wrapped[[20, 10]]);
    assert!(!wrapped[[0, 10]]);
    assert!(!wrapped[[10, 20]]);
    assert_eq!(
        wrapped.iter().filter(|&&m| m).count(),
        count(350.0, 360.0) + count(0.0, 10.0)
    );
}

#[test]
fn test_first_corner_row_selects_pixel_row_zero() {
    let skymap = scenario_skymap();
    let stack = indexed_stack(3, 3, 1, 1);
    // only corner row 0 (lat 56.0) and corner columns 0..=2 fall inside
    let bounds = RegionBounds::Geographic {
        bounds: LonLatBounds::new(-110.05, -109.75, 55.95, 56.05).unwrap(),
        altitude_km: 110.0,
    };
    let mask = bounds.mask((3, 3), Some(&skymap), None).unwrap();
    assert_eq!(mask.iter().filter(|&&m| m).count(), 2);
    assert!(mask[[0, 0]] && mask[[0, 1]]);

    let out = extract_metric_single(&stack, Some(&skymap), &bounds, Metric::Sum, None).unwrap();
    assert_eq!(out, vec![1.0]);
}
