//! Geographic/geomagnetic conversion seam.

use chrono::{DateTime, Utc};

/// External geographic ↔ geomagnetic coordinate transform.
///
/// Implementations wrap a magnetic field model (e.g. AACGM). Both directions
/// return `None` where the model has no valid solution.
pub trait MagneticTransform: Send + Sync {
    /// Geographic `(lat, lon)` to magnetic `(lat, lon)`, degrees.
    fn geo_to_mag(
        &self,
        lat: f64,
        lon: f64,
        altitude_km: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<(f64, f64)>;

    /// Magnetic `(lat, lon)` to geographic `(lat, lon)`, degrees.
    fn mag_to_geo(
        &self,
        lat: f64,
        lon: f64,
        altitude_km: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<(f64, f64)>;
}
