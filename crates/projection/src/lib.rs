//! Map projections for placing mosaic polygons on a 2-D plotting surface.
//!
//! Implements the handful of projections auroral mosaics are drawn in, from
//! scratch on a spherical earth. Every projection maps geographic degrees to
//! plane coordinates and back through [`MapProjection`].

pub mod geographic;
pub mod lambert;
pub mod polar;

pub use geographic::PlateCarree;
pub use lambert::LambertConformal;
pub use polar::PolarStereographic;

/// Mean earth radius in metres used by the conformal projections.
pub const EARTH_RADIUS_M: f64 = 6_371_229.0;

/// A forward/inverse map projection.
///
/// Implementations return `None` for points that cannot be represented
/// (e.g. the opposite pole of a polar projection).
pub trait MapProjection: Send + Sync {
    /// Geographic `(lat, lon)` in degrees to plane `(x, y)`.
    fn project(&self, lat_deg: f64, lon_deg: f64) -> Option<(f64, f64)>;

    /// Plane `(x, y)` back to geographic `(lat, lon)` in degrees.
    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Wrap a longitude difference in radians to [-PI, PI].
pub(crate) fn wrap_radians(mut dlon: f64) -> f64 {
    use std::f64::consts::PI;
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}
