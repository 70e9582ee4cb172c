//! Common test fixtures for ASI geometry tests.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::{Array2, Array3};
use skymap::{MagneticTransform, SiteLocation, Skymap};

/// A fixed reference time for tests (2023-02-24T06:15:00Z).
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 2, 24, 6, 15, 0)
        .single()
        .expect("valid reference time")
}

/// A small elevation field with a single interior crossing of 60°.
pub const SCENARIO_ELEVATION: [[f64; 3]; 3] = [
    [10.0, 50.0, 85.0],
    [20.0, 60.0, 80.0],
    [5.0, 40.0, 70.0],
];

pub fn scenario_elevation() -> Array2<f64> {
    Array2::from_shape_fn((3, 3), |(r, c)| SCENARIO_ELEVATION[r][c])
}

/// 3x3 skymap using [`SCENARIO_ELEVATION`] with a flat 0.1° corner grid.
pub fn scenario_skymap() -> Skymap {
    let lat = Array3::from_shape_fn((1, 4, 4), |(_, i, _)| 56.0 + i as f64 * 0.1);
    let lon = Array3::from_shape_fn((1, 4, 4), |(_, _, j)| -110.0 + j as f64 * 0.1);
    Skymap::new(
        "scenario",
        SiteLocation {
            lat: 56.15,
            lon: -109.85,
            alt_m: 0.0,
        },
        scenario_elevation(),
        Array2::zeros((3, 3)),
        vec![110.0],
        lat,
        lon,
    )
    .expect("scenario skymap is well formed")
}

/// Magnetic transform double: magnetic = geographic + fixed offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetMagnetic {
    pub dlat: f64,
    pub dlon: f64,
}

impl OffsetMagnetic {
    pub fn new(dlat: f64, dlon: f64) -> Self {
        Self { dlat, dlon }
    }
}

impl MagneticTransform for OffsetMagnetic {
    fn geo_to_mag(&self, lat: f64, lon: f64, _altitude_km: f64, _timestamp: DateTime<Utc>) -> Option<(f64, f64)> {
        Some((lat + self.dlat, lon + self.dlon))
    }

    fn mag_to_geo(&self, lat: f64, lon: f64, _altitude_km: f64, _timestamp: DateTime<Utc>) -> Option<(f64, f64)> {
        Some((lat - self.dlat, lon - self.dlon))
    }
}

/// Magnetic transform double with no valid solutions anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingMagnetic;

impl MagneticTransform for FailingMagnetic {
    fn geo_to_mag(&self, _lat: f64, _lon: f64, _altitude_km: f64, _timestamp: DateTime<Utc>) -> Option<(f64, f64)> {
        None
    }

    fn mag_to_geo(&self, _lat: f64, _lon: f64, _altitude_km: f64, _timestamp: DateTime<Utc>) -> Option<(f64, f64)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_magnetic_inverts() {
        let t = OffsetMagnetic::new(9.0, 60.0);
        let (mlat, mlon) = t.geo_to_mag(56.0, -110.0, 110.0, reference_time()).unwrap();
        assert_eq!((mlat, mlon), (65.0, -50.0));
        assert_eq!(t.mag_to_geo(mlat, mlon, 110.0, reference_time()), Some((56.0, -110.0)));
    }

    #[test]
    fn test_scenario_skymap_shape() {
        let skymap = scenario_skymap();
        assert_eq!(skymap.dim(), (3, 3));
        assert_eq!(skymap.elevation()[[1, 1]], 60.0);
    }
}
