//! Equirectangular (plate carrée) projection.

use serde::{Deserialize, Serialize};

use crate::MapProjection;

/// Plate carrée: x is longitude relative to the central meridian, y is
/// latitude, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlateCarree {
    pub central_lon: f64,
}

impl PlateCarree {
    pub fn new(central_lon: f64) -> Self {
        Self { central_lon }
    }
}

impl MapProjection for PlateCarree {
    fn project(&self, lat_deg: f64, lon_deg: f64) -> Option<(f64, f64)> {
        if !lat_deg.is_finite() || !lon_deg.is_finite() || lat_deg.abs() > 90.0 {
            return None;
        }
        let dlon = crate::wrap_radians((lon_deg - self.central_lon).to_radians()).to_degrees();
        Some((dlon, lat_deg))
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || y.abs() > 90.0 {
            return None;
        }
        let lon = crate::wrap_radians((x + self.central_lon).to_radians()).to_degrees();
        Some((y, asi_common::bbox::normalize_lon(lon)))
    }

    fn name(&self) -> &'static str {
        "plate_carree"
    }
}
