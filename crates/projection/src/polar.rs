//! North polar stereographic projection.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{wrap_radians, MapProjection, EARTH_RADIUS_M};

/// North polar stereographic on a sphere.
///
/// The pole maps to the origin and the central meridian points along -y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarStereographic {
    /// Central meridian in degrees
    pub central_lon: f64,
    /// Latitude of true scale in degrees
    pub true_scale_lat: f64,
    k0: f64,
}

impl PolarStereographic {
    pub fn new(central_lon: f64, true_scale_lat: f64) -> Self {
        let k0 = (1.0 + true_scale_lat.to_radians().sin()) / 2.0;
        Self {
            central_lon,
            true_scale_lat,
            k0,
        }
    }
}

impl Default for PolarStereographic {
    fn default() -> Self {
        Self::new(-100.0, 90.0)
    }
}

impl MapProjection for PolarStereographic {
    fn project(&self, lat_deg: f64, lon_deg: f64) -> Option<(f64, f64)> {
        if !lat_deg.is_finite() || !lon_deg.is_finite() || lat_deg.abs() > 90.0 {
            return None;
        }
        if lat_deg <= -90.0 {
            return None;
        }

        let rho = 2.0 * EARTH_RADIUS_M * self.k0 * (PI / 4.0 - lat_deg.to_radians() / 2.0).tan();
        let dlon = wrap_radians((lon_deg - self.central_lon).to_radians());
        Some((rho * dlon.sin(), -rho * dlon.cos()))
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let rho = (x * x + y * y).sqrt();
        let lat = PI / 2.0 - 2.0 * (rho / (2.0 * EARTH_RADIUS_M * self.k0)).atan();
        let lon = if rho == 0.0 {
            self.central_lon.to_radians()
        } else {
            self.central_lon.to_radians() + x.atan2(-y)
        };
        Some((lat.to_degrees(), wrap_radians(lon).to_degrees()))
    }

    fn name(&self) -> &'static str {
        "polar_stereographic"
    }
}
