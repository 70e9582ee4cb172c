//! Geographic bounding boxes in longitude/latitude degrees.

use serde::{Deserialize, Serialize};

use crate::error::{AsiError, Result};

/// A longitude/latitude box used to select skymap pixels.
///
/// Longitudes are stored in (-180, 180]. A box whose normalized western edge
/// lies east of its eastern edge wraps across the antimeridian. Deserializing
/// goes through [`LonLatBounds::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct LonLatBounds {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

#[derive(Deserialize)]
struct RawBounds {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

impl TryFrom<RawBounds> for LonLatBounds {
    type Error = AsiError;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.lon_min, raw.lon_max, raw.lat_min, raw.lat_max)
    }
}

impl LonLatBounds {
    /// Create a validated box from `[lon_min, lon_max, lat_min, lat_max]`.
    ///
    /// Longitudes may be given in [-180, 360]; values above 180 are shifted
    /// into (-180, 180]. Inverted or zero-area ranges are rejected, as are
    /// longitude spans that wrap the globe onto themselves.
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self> {
        for (name, lat) in [("lat_min", lat_min), ("lat_max", lat_max)] {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(AsiError::invalid_bounds(format!(
                    "{} = {} must be within [-90, 90]",
                    name, lat
                )));
            }
        }
        for (name, lon) in [("lon_min", lon_min), ("lon_max", lon_max)] {
            if !lon.is_finite() || !(-180.0..=360.0).contains(&lon) {
                return Err(AsiError::invalid_bounds(format!(
                    "{} = {} must be within [-180, 360]",
                    name, lon
                )));
            }
        }
        if lat_min >= lat_max {
            return Err(AsiError::invalid_bounds(format!(
                "latitude range [{}, {}] is inverted or has zero area",
                lat_min, lat_max
            )));
        }
        if lon_min >= lon_max {
            return Err(AsiError::invalid_bounds(format!(
                "longitude range [{}, {}] is inverted or has zero area",
                lon_min, lon_max
            )));
        }

        if lon_max - lon_min > 360.0 {
            return Err(AsiError::invalid_bounds(format!(
                "longitude range [{}, {}] spans more than 360 degrees",
                lon_min, lon_max
            )));
        }
        let (west, east) = (normalize_lon(lon_min), normalize_lon(lon_max));
        if west == east {
            return Err(AsiError::invalid_bounds(format!(
                "longitude range [{}, {}] collapses to a single meridian",
                lon_min, lon_max
            )));
        }

        Ok(Self {
            lon_min: west,
            lon_max: east,
            lat_min,
            lat_max,
        })
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    /// Whether the box wraps across the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.lon_min > self.lon_max
    }

    /// Strict interior test (points on an edge are excluded).
    pub fn contains_strict(&self, lon: f64, lat: f64) -> bool {
        let lon = normalize_lon(lon);
        let lat_ok = lat > self.lat_min && lat < self.lat_max;
        let lon_ok = if self.crosses_antimeridian() {
            lon > self.lon_min || lon < self.lon_max
        } else {
            lon > self.lon_min && lon < self.lon_max
        };
        lat_ok && lon_ok
    }

    /// Inclusive test (points on an edge are included).
    pub fn contains_inclusive(&self, lon: f64, lat: f64) -> bool {
        let lon = normalize_lon(lon);
        let lat_ok = lat >= self.lat_min && lat <= self.lat_max;
        let lon_ok = if self.crosses_antimeridian() {
            lon >= self.lon_min || lon <= self.lon_max
        } else {
            lon >= self.lon_min && lon <= self.lon_max
        };
        lat_ok && lon_ok
    }
}

/// Shift a longitude above 180 degrees into (-180, 180].
pub fn normalize_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}
