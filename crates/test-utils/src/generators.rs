//! Test data generators for synthetic skymaps and image stacks.
//!
//! These generators create predictable, verifiable geometry and pixel
//! patterns that can be used across the test suite.

use asi_common::{ImageStack, Pixel};
use chrono::{DateTime, Duration, Utc};
use ndarray::{Array2, Array3, Array4};
use skymap::{SiteLocation, Skymap};

use crate::fixtures::reference_time;

/// Builder for a synthetic skymap with a radial elevation field.
///
/// - Elevation is 90° at the centre pixel and falls linearly with radius to
///   `horizon_elevation` at the corner pixels.
/// - Azimuth is measured from +row (north) towards +col (east).
/// - Corner latitude increases with row and longitude with column, both
///   linearly, spreading proportionally to altitude (1x at 110 km).
///
/// # Example
///
/// ```
/// use test_utils::SyntheticSkymap;
///
/// let skymap = SyntheticSkymap::default().build();
/// assert_eq!(skymap.dim(), (21, 21));
/// assert_eq!(skymap.elevation()[[10, 10]], 90.0);
/// ```
#[derive(Debug, Clone)]
pub struct SyntheticSkymap {
    pub site_uid: String,
    pub rows: usize,
    pub cols: usize,
    pub site_lat: f64,
    pub site_lon: f64,
    pub altitudes_km: Vec<f64>,
    /// Degrees of latitude per pixel at 110 km (longitude spans twice this).
    pub deg_per_pixel: f64,
    /// Elevation of the corner-most pixels.
    pub horizon_elevation: f64,
}

impl Default for SyntheticSkymap {
    fn default() -> Self {
        Self {
            site_uid: "test".to_string(),
            rows: 21,
            cols: 21,
            site_lat: 56.0,
            site_lon: -110.0,
            altitudes_km: vec![90.0, 110.0, 150.0],
            deg_per_pixel: 0.1,
            horizon_elevation: 0.0,
        }
    }
}

impl SyntheticSkymap {
    pub fn with_size(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_site(mut self, uid: &str, lat: f64, lon: f64) -> Self {
        self.site_uid = uid.to_string();
        self.site_lat = lat;
        self.site_lon = lon;
        self
    }

    fn centre(&self) -> (f64, f64) {
        ((self.rows as f64 - 1.0) / 2.0, (self.cols as f64 - 1.0) / 2.0)
    }

    /// Elevation of pixel `(row, col)`.
    pub fn elevation_at(&self, row: usize, col: usize) -> f64 {
        let (rc, cc) = self.centre();
        let dmax = rc.hypot(cc);
        if dmax == 0.0 {
            return 90.0;
        }
        let d = (row as f64 - rc).hypot(col as f64 - cc);
        90.0 - (90.0 - self.horizon_elevation) * d / dmax
    }

    /// Azimuth of pixel `(row, col)` in [0, 360).
    pub fn azimuth_at(&self, row: usize, col: usize) -> f64 {
        let (rc, cc) = self.centre();
        let dy = row as f64 - rc;
        let dx = col as f64 - cc;
        dx.atan2(dy).to_degrees().rem_euclid(360.0)
    }

    /// Latitude of corner row `i` at `altitude_km`.
    pub fn corner_lat(&self, altitude_km: f64, i: usize) -> f64 {
        let (rc, _) = self.centre();
        self.site_lat + (i as f64 - 0.5 - rc) * self.deg_per_pixel * altitude_km / 110.0
    }

    /// Longitude of corner column `j` at `altitude_km`.
    pub fn corner_lon(&self, altitude_km: f64, j: usize) -> f64 {
        let (_, cc) = self.centre();
        self.site_lon + (j as f64 - 0.5 - cc) * 2.0 * self.deg_per_pixel * altitude_km / 110.0
    }

    pub fn build(&self) -> Skymap {
        let elevation = Array2::from_shape_fn((self.rows, self.cols), |(r, c)| self.elevation_at(r, c));
        let azimuth = Array2::from_shape_fn((self.rows, self.cols), |(r, c)| self.azimuth_at(r, c));
        let shape = (self.altitudes_km.len(), self.rows + 1, self.cols + 1);
        let corner_lat = Array3::from_shape_fn(shape, |(a, i, _)| self.corner_lat(self.altitudes_km[a], i));
        let corner_lon = Array3::from_shape_fn(shape, |(a, _, j)| self.corner_lon(self.altitudes_km[a], j));

        Skymap::new(
            self.site_uid.clone(),
            SiteLocation {
                lat: self.site_lat,
                lon: self.site_lon,
                alt_m: 250.0,
            },
            elevation,
            azimuth,
            self.altitudes_km.clone(),
            corner_lat,
            corner_lon,
        )
        .expect("synthetic skymap is always well formed")
    }
}

/// `n` timestamps from the reference time, `cadence_s` seconds apart.
pub fn timestamps(n: usize, cadence_s: i64) -> Vec<DateTime<Utc>> {
    timestamps_from(reference_time(), n, cadence_s)
}

/// `n` timestamps from `start`, `cadence_s` seconds apart.
pub fn timestamps_from(start: DateTime<Utc>, n: usize, cadence_s: i64) -> Vec<DateTime<Utc>> {
    (0..n)
        .map(|i| start + Duration::seconds(cadence_s * i as i64))
        .collect()
}

/// A single-channel stack where every pixel of every frame is `value`.
pub fn constant_stack<T: Pixel>(rows: usize, cols: usize, frames: usize, value: T) -> ImageStack<T> {
    ImageStack::new(
        Array4::from_elem((rows, cols, 1, frames), value),
        timestamps(frames, 3),
    )
    .expect("constant stack is always well formed")
}

/// A stack built from `f(row, col, channel, frame)`, 3 s cadence.
pub fn stack_from_fn<T: Pixel>(
    rows: usize,
    cols: usize,
    channels: usize,
    frames: usize,
    f: impl Fn(usize, usize, usize, usize) -> T,
) -> ImageStack<T> {
    ImageStack::new(
        Array4::from_shape_fn((rows, cols, channels, frames), |(r, c, ch, fr)| f(r, c, ch, fr)),
        timestamps(frames, 3),
    )
    .expect("generated stack is always well formed")
}

/// Creates a stack with predictable values.
///
/// Each sample is `frame * 1_000_000 + channel * 100_000 + row * 1000 + col`,
/// so any extracted value identifies where it came from.
///
/// # Example
///
/// ```
/// use test_utils::indexed_stack;
///
/// let stack = indexed_stack(4, 5, 1, 2);
/// assert_eq!(stack.value(3, 4, 0, 1), 1_003_004.0);
/// ```
pub fn indexed_stack(rows: usize, cols: usize, channels: usize, frames: usize) -> ImageStack<f64> {
    stack_from_fn(rows, cols, channels, frames, |r, c, ch, f| {
        (f * 1_000_000 + ch * 100_000 + r * 1000 + c) as f64
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_skymap_centre_is_zenith() {
        let gen = SyntheticSkymap::default();
        assert_eq!(gen.elevation_at(10, 10), 90.0);
        assert!((gen.elevation_at(0, 0) - 0.0).abs() < 1e-9);
        assert!(gen.elevation_at(0, 10) > gen.elevation_at(0, 0));
    }

    #[test]
    fn test_synthetic_azimuth_directions() {
        let gen = SyntheticSkymap::default();
        assert!((gen.azimuth_at(20, 10) - 0.0).abs() < 1e-9, "north");
        assert!((gen.azimuth_at(10, 20) - 90.0).abs() < 1e-9, "east");
        assert!((gen.azimuth_at(0, 10) - 180.0).abs() < 1e-9, "south");
        assert!((gen.azimuth_at(10, 0) - 270.0).abs() < 1e-9, "west");
    }

    #[test]
    fn test_corners_monotonic() {
        let gen = SyntheticSkymap::default();
        assert!(gen.corner_lat(110.0, 1) > gen.corner_lat(110.0, 0));
        assert!(gen.corner_lon(110.0, 1) > gen.corner_lon(110.0, 0));
        assert!(gen.corner_lat(150.0, 0) < gen.corner_lat(110.0, 0));
    }

    #[test]
    fn test_timestamps_cadence() {
        let ts = timestamps(3, 6);
        assert_eq!(ts[2] - ts[0], Duration::seconds(12));
    }
}
