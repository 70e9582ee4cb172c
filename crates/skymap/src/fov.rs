//! Field-of-view rings: where an imager's lowest usable elevation meets the
//! emission layer.
//!
//! The site is placed on the WGS84 ellipsoid, a line of sight is cast at
//! `min_elevation` for every whole degree of azimuth, and the point where it
//! reaches `height_km` is converted back to geodetic latitude/longitude.

use asi_common::{AsiError, Result};
use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::{SiteLocation, Skymap};

/// WGS84 semi-major axis, metres.
const WGS84_A_M: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Mean Earth radius used for the slant range, km.
const SLANT_EARTH_RADIUS_KM: f64 = 6371.2;
/// Fixed-point passes when recovering geodetic latitude.
const GEODETIC_ITERATIONS: usize = 5;

/// Points in a ring: one per degree of azimuth, 0 and 360 both included.
pub const FOV_RING_POINTS: usize = 361;

/// Valid emission heights for a ring, km.
pub const FOV_HEIGHT_RANGE_KM: (f64, f64) = (10.0, 1000.0);

fn eccentricity_sq() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

/// Slant distance (km) from the ground to `height_km` along a line of sight
/// at `elevation_deg`, on a sphere of radius [`SLANT_EARTH_RADIUS_KM`].
fn slant_range_km(height_km: f64, elevation_deg: f64) -> f64 {
    let re = SLANT_EARTH_RADIUS_KM;
    let b = re * elevation_deg.to_radians().sin();
    (b * b + height_km * (2.0 * re + height_km)).sqrt() - b
}

fn ecef_to_geodetic(p: &Vector3<f64>) -> (f64, f64) {
    let e2 = eccentricity_sq();
    let lon = p.y.atan2(p.x);
    let r = p.x.hypot(p.y);
    let mut phi = 0.0_f64;
    let mut n = 0.0_f64;
    for _ in 0..GEODETIC_ITERATIONS {
        phi = ((p.z + n * e2 * phi.sin()) / r).atan();
        n = WGS84_A_M / (1.0 - e2 * phi.sin().powi(2)).sqrt();
    }
    (phi.to_degrees(), lon.to_degrees())
}

impl SiteLocation {
    /// Closed ring of `(lat, lon)` points bounding what the imager sees at
    /// `height_km` above `min_elevation` degrees.
    ///
    /// Point `k` lies at azimuth `k` degrees east of north; the first and
    /// last points coincide.
    pub fn fov_ring(&self, height_km: f64, min_elevation: f64) -> Result<Vec<(f64, f64)>> {
        let (lo, hi) = FOV_HEIGHT_RANGE_KM;
        if !(lo..=hi).contains(&height_km) {
            return Err(AsiError::invalid_parameter(
                "height_km",
                format!("{} is outside [{}, {}]", height_km, lo, hi),
            ));
        }
        if !(0.0..=90.0).contains(&min_elevation) {
            return Err(AsiError::invalid_parameter(
                "min_elevation",
                format!("{} is outside [0, 90]", min_elevation),
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=360.0).contains(&self.lon) {
            return Err(AsiError::invalid_bounds(format!(
                "site location ({}, {}) is not a valid lat/lon",
                self.lat, self.lon
            )));
        }

        let e2 = eccentricity_sq();
        let (phi, lam) = (self.lat.to_radians(), self.lon.to_radians());
        let (s_phi, c_phi) = phi.sin_cos();
        let (s_lam, c_lam) = lam.sin_cos();
        let n = WGS84_A_M / (1.0 - e2 * s_phi * s_phi).sqrt();
        let origin = Vector3::new(n * c_phi * c_lam, n * c_phi * s_lam, (1.0 - e2) * n * s_phi);

        let east = Vector3::new(-s_lam, c_lam, 0.0);
        let north = Vector3::new(-s_phi * c_lam, -s_phi * s_lam, c_phi);
        let up = Vector3::new(c_phi * c_lam, c_phi * s_lam, s_phi);

        let (s_el, c_el) = min_elevation.to_radians().sin_cos();
        let range_m = slant_range_km(height_km, min_elevation) * 1000.0;

        let ring: Vec<(f64, f64)> = (0..FOV_RING_POINTS)
            .map(|deg| {
                let (s_az, c_az) = (deg as f64).to_radians().sin_cos();
                let aim = north * (c_az * c_el) + east * (s_az * c_el) + up * s_el;
                ecef_to_geodetic(&(origin + aim * range_m))
            })
            .collect();

        debug!(
            lat = self.lat,
            lon = self.lon,
            height_km,
            min_elevation,
            slant_km = range_m / 1000.0,
            "computed field-of-view ring"
        );
        Ok(ring)
    }
}

impl Skymap {
    /// [`SiteLocation::fov_ring`] for this skymap's site.
    pub fn fov_ring(&self, height_km: f64, min_elevation: f64) -> Result<Vec<(f64, f64)>> {
        self.site().fov_ring(height_km, min_elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::haversine_m;

    fn gillam() -> SiteLocation {
        SiteLocation {
            lat: 56.38,
            lon: -94.64,
            alt_m: 0.0,
        }
    }

    #[test]
    fn test_slant_range_limits() {
        // straight up the range is the height itself
        assert!((slant_range_km(110.0, 90.0) - 110.0).abs() < 1e-9);
        assert!(slant_range_km(110.0, 10.0) > slant_range_km(110.0, 30.0));
        assert!(slant_range_km(110.0, 0.0).is_finite());
    }

    #[test]
    fn test_zenith_ring_collapses_onto_site() {
        let site = gillam();
        let ring = site.fov_ring(110.0, 90.0).unwrap();
        assert_eq!(ring.len(), FOV_RING_POINTS);
        for (lat, lon) in ring {
            assert!((lat - site.lat).abs() < 1e-6, "lat {}", lat);
            assert!((lon - site.lon).abs() < 1e-6, "lon {}", lon);
        }
    }

    #[test]
    fn test_ring_is_closed_and_oriented() {
        let site = gillam();
        let ring = site.fov_ring(110.0, 10.0).unwrap();
        let (first, last) = (ring[0], ring[FOV_RING_POINTS - 1]);
        assert!((first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9);

        assert!(ring[0].0 > site.lat);
        assert!(ring[90].1 > site.lon);
        assert!(ring[180].0 < site.lat);
        assert!(ring[270].1 < site.lon);
    }

    #[test]
    fn test_ring_radius_grows_as_elevation_drops() {
        let site = gillam();
        let radius = |min_el: f64| {
            let ring = site.fov_ring(110.0, min_el).unwrap();
            haversine_m(site.lat, site.lon, ring[45].0, ring[45].1)
        };
        let r10 = radius(10.0);
        assert!(r10 > 400_000.0 && r10 < 600_000.0, "radius {}", r10);
        assert!(radius(5.0) > r10);
        assert!(radius(30.0) < r10);
    }

    #[test]
    fn test_invalid_inputs() {
        let site = gillam();
        assert!(matches!(site.fov_ring(5.0, 10.0), Err(AsiError::InvalidParameter { .. })));
        assert!(matches!(site.fov_ring(110.0, 95.0), Err(AsiError::InvalidParameter { .. })));
        let bad = SiteLocation { lat: 100.0, ..site };
        assert!(matches!(bad.fov_ring(110.0, 10.0), Err(AsiError::InvalidBounds(_))));
    }
}
