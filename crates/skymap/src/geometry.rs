//! The skymap itself and altitude resolution.

use asi_common::bbox::normalize_lon;
use asi_common::{AsiError, Result};
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::corners::CornerGrid;

/// Two altitudes closer than this (in km) are considered equal.
pub const ALTITUDE_TOLERANCE_KM: f64 = 1e-6;

/// Geographic location of an imager.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteLocation {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

/// Immutable calibration geometry for one site and epoch.
///
/// `elevation` and `azimuth` hold one value per pixel. `corner_lat` and
/// `corner_lon` hold one value per pixel corner for each altitude, with
/// shape `(altitudes, rows + 1, cols + 1)`. Corner longitudes are stored in
/// (-180, 180].
#[derive(Debug, Clone, PartialEq)]
pub struct Skymap {
    site_uid: String,
    site: SiteLocation,
    elevation: Array2<f64>,
    azimuth: Array2<f64>,
    altitudes_km: Vec<f64>,
    corner_lat: Array3<f64>,
    corner_lon: Array3<f64>,
}

impl Skymap {
    /// Create a skymap, validating all shape invariants.
    pub fn new(
        site_uid: impl Into<String>,
        site: SiteLocation,
        elevation: Array2<f64>,
        azimuth: Array2<f64>,
        altitudes_km: Vec<f64>,
        corner_lat: Array3<f64>,
        mut corner_lon: Array3<f64>,
    ) -> Result<Self> {
        let (rows, cols) = elevation.dim();
        if rows == 0 || cols == 0 {
            return Err(AsiError::shape_mismatch(
                "skymap elevation",
                "non-empty [rows, cols]",
                (rows, cols),
            ));
        }
        if azimuth.dim() != (rows, cols) {
            return Err(AsiError::shape_mismatch(
                "skymap azimuth vs elevation",
                (rows, cols),
                azimuth.dim(),
            ));
        }

        if altitudes_km.is_empty() {
            return Err(AsiError::invalid_bounds("skymap has no altitudes"));
        }
        if altitudes_km.iter().any(|a| !a.is_finite()) {
            return Err(AsiError::invalid_bounds(format!(
                "skymap altitudes must be finite, got {:?}",
                altitudes_km
            )));
        }
        if altitudes_km.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AsiError::invalid_bounds(format!(
                "skymap altitudes must be strictly increasing, got {:?}",
                altitudes_km
            )));
        }

        let expected = (altitudes_km.len(), rows + 1, cols + 1);
        if corner_lat.dim() != expected {
            return Err(AsiError::shape_mismatch(
                "skymap corner latitudes",
                expected,
                corner_lat.dim(),
            ));
        }
        if corner_lon.dim() != expected {
            return Err(AsiError::shape_mismatch(
                "skymap corner longitudes",
                expected,
                corner_lon.dim(),
            ));
        }

        corner_lon.mapv_inplace(normalize_lon);

        Ok(Self {
            site_uid: site_uid.into(),
            site,
            elevation,
            azimuth,
            altitudes_km,
            corner_lat,
            corner_lon,
        })
    }

    pub fn site_uid(&self) -> &str {
        &self.site_uid
    }

    pub fn site(&self) -> SiteLocation {
        self.site
    }

    /// Pixel grid shape `(rows, cols)`.
    pub fn dim(&self) -> (usize, usize) {
        self.elevation.dim()
    }

    pub fn elevation(&self) -> &Array2<f64> {
        &self.elevation
    }

    pub fn azimuth(&self) -> &Array2<f64> {
        &self.azimuth
    }

    pub fn altitudes_km(&self) -> &[f64] {
        &self.altitudes_km
    }

    /// The middle precomputed altitude, used when a caller does not pick one.
    pub fn default_altitude_km(&self) -> f64 {
        self.altitudes_km[self.altitudes_km.len() / 2]
    }

    /// Index of `requested_km` in the altitude list.
    ///
    /// Only exact matches (within [`ALTITUDE_TOLERANCE_KM`]) are accepted.
    /// Altitudes are never interpolated.
    pub fn resolve_altitude(&self, requested_km: f64) -> Result<usize> {
        self.altitudes_km
            .iter()
            .position(|a| (a - requested_km).abs() <= ALTITUDE_TOLERANCE_KM)
            .ok_or_else(|| AsiError::unsupported_altitude(requested_km, &self.altitudes_km))
    }

    /// Corner lat/lon grids at a resolved altitude.
    pub fn corner_grid(&self, altitude_km: f64) -> Result<CornerGrid<'_>> {
        let idx = self.resolve_altitude(altitude_km)?;
        Ok(CornerGrid::new(
            self.altitudes_km[idx],
            self.corner_lat.index_axis(Axis(0), idx),
            self.corner_lon.index_axis(Axis(0), idx),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(altitudes: Vec<f64>) -> Result<Skymap> {
        let n = altitudes.len();
        Skymap::new(
            "test",
            SiteLocation::default(),
            Array2::from_elem((2, 3), 45.0),
            Array2::zeros((2, 3)),
            altitudes,
            Array3::zeros((n, 3, 4)),
            Array3::from_elem((n, 3, 4), 250.0),
        )
    }

    #[test]
    fn test_resolve_exact_altitudes() {
        let skymap = tiny(vec![90.0, 110.0, 150.0]).unwrap();
        assert_eq!(skymap.resolve_altitude(90.0).unwrap(), 0);
        assert_eq!(skymap.resolve_altitude(110.0).unwrap(), 1);
        assert_eq!(skymap.resolve_altitude(150.0 + 1e-9).unwrap(), 2);
    }

    #[test]
    fn test_resolve_rejects_intermediate_altitude() {
        let skymap = tiny(vec![90.0, 110.0, 150.0]).unwrap();
        match skymap.resolve_altitude(100.0) {
            Err(AsiError::UnsupportedAltitude { requested_km, valid_km }) => {
                assert_eq!(requested_km, 100.0);
                assert_eq!(valid_km, vec![90.0, 110.0, 150.0]);
            }
            other => panic!("expected UnsupportedAltitude, got {:?}", other),
        }
    }

    #[test]
    fn test_longitudes_normalized() {
        let skymap = tiny(vec![110.0]).unwrap();
        let grid = skymap.corner_grid(110.0).unwrap();
        assert_eq!(grid.lon(0, 0), -110.0);
    }

    #[test]
    fn test_shape_validation() {
        let err = Skymap::new(
            "bad",
            SiteLocation::default(),
            Array2::zeros((2, 3)),
            Array2::zeros((3, 2)),
            vec![110.0],
            Array3::zeros((1, 3, 4)),
            Array3::zeros((1, 3, 4)),
        )
        .unwrap_err();
        assert_eq!(err.code(), "ShapeMismatch");

        let err = Skymap::new(
            "bad",
            SiteLocation::default(),
            Array2::zeros((2, 3)),
            Array2::zeros((2, 3)),
            vec![110.0],
            Array3::zeros((1, 2, 3)),
            Array3::zeros((1, 3, 4)),
        )
        .unwrap_err();
        assert_eq!(err.code(), "ShapeMismatch");
    }

    #[test]
    fn test_altitudes_must_increase() {
        assert!(matches!(tiny(vec![150.0, 110.0]), Err(AsiError::InvalidBounds(_))));
        assert!(matches!(tiny(vec![]), Err(AsiError::InvalidBounds(_))));
    }

    #[test]
    fn test_default_altitude_is_middle() {
        assert_eq!(tiny(vec![90.0, 110.0, 150.0]).unwrap().default_altitude_km(), 110.0);
    }
}
