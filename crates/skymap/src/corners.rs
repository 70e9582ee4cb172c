//! Corner lat/lon grids at a single altitude.

use ndarray::ArrayView2;

use crate::index::CornerIndex;

/// Earth radius in metres used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in metres between two points in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Pixel owning corner `(i, j)`: `(i - 1, j - 1)`, saturating at 0.
#[inline]
pub fn corner_to_pixel(i: usize, j: usize) -> (usize, usize) {
    (i.saturating_sub(1), j.saturating_sub(1))
}

/// Borrowed corner latitude/longitude grids of shape `(rows + 1, cols + 1)`.
#[derive(Debug, Clone, Copy)]
pub struct CornerGrid<'a> {
    altitude_km: f64,
    lat: ArrayView2<'a, f64>,
    lon: ArrayView2<'a, f64>,
}

impl<'a> CornerGrid<'a> {
    pub(crate) fn new(altitude_km: f64, lat: ArrayView2<'a, f64>, lon: ArrayView2<'a, f64>) -> Self {
        Self {
            altitude_km,
            lat,
            lon,
        }
    }

    pub fn altitude_km(&self) -> f64 {
        self.altitude_km
    }

    /// Corner grid shape `(rows + 1, cols + 1)`.
    pub fn dim(&self) -> (usize, usize) {
        self.lat.dim()
    }

    /// Pixel grid shape `(rows, cols)`.
    pub fn pixel_dim(&self) -> (usize, usize) {
        let (r, c) = self.lat.dim();
        (r.saturating_sub(1), c.saturating_sub(1))
    }

    #[inline]
    pub fn lat(&self, i: usize, j: usize) -> f64 {
        self.lat[[i, j]]
    }

    #[inline]
    pub fn lon(&self, i: usize, j: usize) -> f64 {
        self.lon[[i, j]]
    }

    pub fn lat_view(&self) -> ArrayView2<'a, f64> {
        self.lat
    }

    pub fn lon_view(&self) -> ArrayView2<'a, f64> {
        self.lon
    }

    /// Whether both coordinates of a corner are finite.
    #[inline]
    pub fn is_valid(&self, i: usize, j: usize) -> bool {
        self.lat[[i, j]].is_finite() && self.lon[[i, j]].is_finite()
    }

    /// Representative `(lat, lon)` of pixel `(row, col)`: corner `(row + 1, col + 1)`.
    #[inline]
    pub fn representative_point(&self, row: usize, col: usize) -> (f64, f64) {
        (self.lat[[row + 1, col + 1]], self.lon[[row + 1, col + 1]])
    }

    /// `(min, max)` of finite corner latitudes.
    pub fn lat_range(&self) -> Option<(f64, f64)> {
        finite_range(self.lat.iter().copied())
    }

    /// `(min, max)` of finite corner longitudes.
    pub fn lon_range(&self) -> Option<(f64, f64)> {
        finite_range(self.lon.iter().copied())
    }

    /// Whether `(lat, lon)` falls within the grid's lat/lon ranges.
    pub fn covers(&self, lat: f64, lon: f64) -> bool {
        match (self.lat_range(), self.lon_range()) {
            (Some((lat0, lat1)), Some((lon0, lon1))) => {
                lat >= lat0 && lat <= lat1 && lon >= lon0 && lon <= lon1
            }
            _ => false,
        }
    }

    /// Nearest corner by great-circle distance, scanning every corner.
    ///
    /// Ties go to the lowest row-major index. NaN corners never match.
    pub fn nearest_corner_linear(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        let (_, ncols) = self.dim();
        let mut best: Option<(f64, usize)> = None;
        for ((i, j), &clat) in self.lat.indexed_iter() {
            let clon = self.lon[[i, j]];
            if !clat.is_finite() || !clon.is_finite() {
                continue;
            }
            let d = haversine_m(lat, lon, clat, clon);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, i * ncols + j));
            }
        }
        best.map(|(_, k)| (k / ncols, k % ncols))
    }

    /// Build a spatial index over the finite corners.
    pub fn index(&self) -> CornerIndex {
        CornerIndex::build(self)
    }
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
