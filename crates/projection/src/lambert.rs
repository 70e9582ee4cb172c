//! Lambert Conformal Conic projection.
//!
//! Maps a cone tangent or secant to the earth onto a flat plane. It keeps
//! shapes locally true across the mid-latitude band most ASI networks sit
//! in, which makes it the usual choice for continental auroral mosaics.
//!
//! The projection parameters include:
//! - Central meridian (lon0) and reference latitude (lat0) of the origin
//! - Standard parallel(s): latin1 and latin2 (equal for a tangent cone)

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{wrap_radians, MapProjection, EARTH_RADIUS_M};

/// Lambert Conformal Conic projection parameters.
///
/// Plane coordinates are metres from the origin `(lat0, lon0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Reference latitude in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the reference latitude
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection from parameters in degrees.
    ///
    /// # Arguments
    /// * `central_lon_deg` - Central meridian
    /// * `central_lat_deg` - Latitude of the origin
    /// * `latin1_deg` - First standard parallel
    /// * `latin2_deg` - Second standard parallel
    pub fn new(central_lon_deg: f64, central_lat_deg: f64, latin1_deg: f64, latin2_deg: f64) -> Self {
        let lon0 = central_lon_deg.to_radians();
        let lat0 = central_lat_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();
        let earth_radius = EARTH_RADIUS_M;

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio = ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (PI / 4.0 + lat0 / 2.0).tan().powf(n);

        Self {
            lon0,
            lat0,
            latin1,
            latin2,
            earth_radius,
            n,
            f,
            rho0,
        }
    }

    /// Projection centred on the Canadian auroral zone.
    ///
    /// - Central meridian: 100°W
    /// - Origin latitude: 55°N
    /// - Standard parallels: 45°N and 65°N
    pub fn canada() -> Self {
        Self::new(-100.0, 55.0, 45.0, 65.0)
    }

    fn rho(&self, lat: f64) -> f64 {
        self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n)
    }
}

impl MapProjection for LambertConformal {
    fn project(&self, lat_deg: f64, lon_deg: f64) -> Option<(f64, f64)> {
        if !lat_deg.is_finite() || !lon_deg.is_finite() || lat_deg.abs() > 90.0 {
            return None;
        }

        let rho = self.rho(lat_deg.to_radians());
        let theta = self.n * wrap_radians(lon_deg.to_radians() - self.lon0);

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();

        if x.is_finite() && y.is_finite() {
            Some((x, y))
        } else {
            None
        }
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let dy = self.rho0 - y;
        let mut rho = (x * x + dy * dy).sqrt();
        let theta = if self.n < 0.0 {
            rho = -rho;
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };

        let lat = if rho == 0.0 {
            PI / 2.0 * self.n.signum()
        } else {
            2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0
        };
        let lon = wrap_radians(self.lon0 + theta / self.n);

        if lat.is_finite() && lon.is_finite() {
            Some((lat.to_degrees(), lon.to_degrees()))
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        "lambert_conformal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = LambertConformal::canada();
        let (x, y) = proj.project(55.0, -100.0).unwrap();
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);
    }

    #[test]
    fn test_roundtrip() {
        let proj = LambertConformal::canada();

        // Yellowknife
        let (x, y) = proj.project(62.45, -114.37).unwrap();
        let (lat, lon) = proj.unproject(x, y).unwrap();

        assert!((lat - 62.45).abs() < 1e-6, "lat roundtrip failed: {}", lat);
        assert!((lon + 114.37).abs() < 1e-6, "lon roundtrip failed: {}", lon);
    }

    #[test]
    fn test_east_is_positive_x_north_is_positive_y() {
        let proj = LambertConformal::canada();
        let (x_east, _) = proj.project(55.0, -90.0).unwrap();
        let (_, y_north) = proj.project(65.0, -100.0).unwrap();
        assert!(x_east > 0.0, "east of the central meridian should be +x, got {}", x_east);
        assert!(y_north > 0.0, "north of the origin should be +y, got {}", y_north);
    }

    #[test]
    fn test_south_pole_not_projectable() {
        let proj = LambertConformal::canada();
        assert!(proj.project(-90.0, 0.0).is_none());
    }

    #[test]
    fn test_tangent_cone() {
        let proj = LambertConformal::new(-97.5, 38.5, 38.5, 38.5);
        let (x, y) = proj.project(38.5, -97.5).unwrap();
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }
}
