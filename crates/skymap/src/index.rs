//! Grid-bucket spatial index over skymap corners.
//!
//! Corners are binned into a regular lat/lon bucket grid. A query visits
//! rings of buckets around the query's bucket and stops once no unvisited
//! bucket can hold a corner at least as close as the best one found. The
//! result is always identical to [`CornerGrid::nearest_corner_linear`],
//! including the lowest-row-major-index tie-break.

use crate::corners::{haversine_m, CornerGrid, EARTH_RADIUS_M};

/// Target number of corners per bucket.
const POINTS_PER_BUCKET: usize = 4;

/// Slack applied to the ring lower bound to absorb rounding.
const BOUND_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct Entry {
    lat: f64,
    lon: f64,
    /// Row-major corner index
    flat: usize,
}

/// Nearest-corner index built from a [`CornerGrid`].
#[derive(Debug, Clone)]
pub struct CornerIndex {
    ncols: usize,
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    dlat: f64,
    dlon: f64,
    nb_lat: usize,
    nb_lon: usize,
    /// Entries grouped by bucket, row-major order within each bucket
    entries: Vec<Entry>,
    /// Bucket `b` owns `entries[starts[b]..starts[b + 1]]`
    starts: Vec<usize>,
}

impl CornerIndex {
    pub fn build(grid: &CornerGrid<'_>) -> Self {
        let (nrows, ncols) = grid.dim();
        let mut points = Vec::with_capacity(nrows * ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                if grid.is_valid(i, j) {
                    points.push(Entry {
                        lat: grid.lat(i, j),
                        lon: grid.lon(i, j),
                        flat: i * ncols + j,
                    });
                }
            }
        }

        let (lat_min, lat_max) = grid.lat_range().unwrap_or((0.0, 0.0));
        let (lon_min, lon_max) = grid.lon_range().unwrap_or((0.0, 0.0));

        let per_axis = ((points.len() / POINTS_PER_BUCKET).max(1) as f64).sqrt().ceil() as usize;
        let nb_lat = if lat_max > lat_min { per_axis.max(1) } else { 1 };
        let nb_lon = if lon_max > lon_min { per_axis.max(1) } else { 1 };
        let dlat = if nb_lat > 1 { (lat_max - lat_min) / nb_lat as f64 } else { f64::INFINITY };
        let dlon = if nb_lon > 1 { (lon_max - lon_min) / nb_lon as f64 } else { f64::INFINITY };

        let mut index = Self {
            ncols,
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            dlat,
            dlon,
            nb_lat,
            nb_lon,
            entries: Vec::new(),
            starts: Vec::new(),
        };

        // Counting sort into buckets keeps row-major order inside each bucket
        let n_buckets = nb_lat * nb_lon;
        let mut counts = vec![0usize; n_buckets + 1];
        let bucket_of: Vec<usize> = points
            .iter()
            .map(|p| {
                let (bi, bj) = index.bucket(p.lat, p.lon);
                bi * nb_lon + bj
            })
            .collect();
        for &b in &bucket_of {
            counts[b + 1] += 1;
        }
        for b in 0..n_buckets {
            counts[b + 1] += counts[b];
        }
        let mut cursor = counts.clone();
        let mut entries = vec![
            Entry {
                lat: 0.0,
                lon: 0.0,
                flat: 0
            };
            points.len()
        ];
        for (p, &b) in points.iter().zip(&bucket_of) {
            entries[cursor[b]] = *p;
            cursor[b] += 1;
        }

        index.entries = entries;
        index.starts = counts;

        tracing::trace!(
            corners = index.entries.len(),
            buckets_lat = nb_lat,
            buckets_lon = nb_lon,
            "built corner index"
        );
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest corner `(i, j)` to `(lat, lon)` in degrees.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        if self.entries.is_empty() || !lat.is_finite() || !lon.is_finite() {
            return None;
        }

        // Ring bounds rely on the linear longitude gap equalling the true
        // angular gap, which only holds within half a turn of every corner.
        let wraps = self.lon_max - self.lon_min > 180.0
            || lon < self.lon_max - 180.0
            || lon > self.lon_min + 180.0;
        let flat = if wraps {
            self.scan(lat, lon, 0..self.entries.len())
        } else {
            self.ring_search(lat, lon)
        };
        flat.map(|k| (k / self.ncols, k % self.ncols))
    }

    fn bucket(&self, lat: f64, lon: f64) -> (usize, usize) {
        let bi = if self.nb_lat > 1 {
            (((lat - self.lat_min) / self.dlat).floor().max(0.0) as usize).min(self.nb_lat - 1)
        } else {
            0
        };
        let bj = if self.nb_lon > 1 {
            (((lon - self.lon_min) / self.dlon).floor().max(0.0) as usize).min(self.nb_lon - 1)
        } else {
            0
        };
        (bi, bj)
    }

    fn scan(&self, lat: f64, lon: f64, range: std::ops::Range<usize>) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for e in &self.entries[range] {
            let d = haversine_m(lat, lon, e.lat, e.lon);
            if is_better(d, e.flat, best) {
                best = Some((d, e.flat));
            }
        }
        best.map(|(_, k)| k)
    }

    fn ring_search(&self, lat: f64, lon: f64) -> Option<usize> {
        let (qi, qj) = self.bucket(lat, lon);
        let max_ring = qi
            .max(self.nb_lat - 1 - qi)
            .max(qj)
            .max(self.nb_lon - 1 - qj);

        // Smallest cos(lat) anywhere between the query and the grid
        let lo = lat.min(self.lat_min).to_radians();
        let hi = lat.max(self.lat_max).to_radians();
        let cos_min = lo.cos().min(hi.cos()).max(0.0);

        let mut best: Option<(f64, usize)> = None;
        for ring in 0..=max_ring {
            self.visit_ring(qi, qj, ring, |range| {
                for e in &self.entries[range] {
                    let d = haversine_m(lat, lon, e.lat, e.lon);
                    if is_better(d, e.flat, best) {
                        best = Some((d, e.flat));
                    }
                }
            });

            if let Some((best_d, _)) = best {
                let bound = self.ring_lower_bound(qi, qj, ring, cos_min);
                if best_d < bound * (1.0 - BOUND_SLACK) {
                    break;
                }
            }
        }
        best.map(|(_, k)| k)
    }

    /// Lower bound on the distance to any corner in rings beyond `ring`.
    fn ring_lower_bound(&self, qi: usize, qj: usize, ring: usize, cos_min: f64) -> f64 {
        let next = ring + 1;
        let lat_reachable = qi >= next || qi + next < self.nb_lat;
        let lon_reachable = qj >= next || qj + next < self.nb_lon;

        let lat_bound = if lat_reachable {
            EARTH_RADIUS_M * (ring as f64 * self.dlat).to_radians()
        } else {
            f64::INFINITY
        };
        let lon_bound = if lon_reachable {
            let gap = (ring as f64 * self.dlon).to_radians().min(std::f64::consts::PI);
            2.0 * EARTH_RADIUS_M * (cos_min * (gap / 2.0).sin()).min(1.0).asin()
        } else {
            f64::INFINITY
        };
        lat_bound.min(lon_bound)
    }

    fn visit_ring(&self, qi: usize, qj: usize, ring: usize, mut f: impl FnMut(std::ops::Range<usize>)) {
        let i0 = qi as isize - ring as isize;
        let i1 = qi as isize + ring as isize;
        let j0 = qj as isize - ring as isize;
        let j1 = qj as isize + ring as isize;
        for bi in i0..=i1 {
            if bi < 0 || bi >= self.nb_lat as isize {
                continue;
            }
            for bj in j0..=j1 {
                if bj < 0 || bj >= self.nb_lon as isize {
                    continue;
                }
                let on_ring = bi == i0 || bi == i1 || bj == j0 || bj == j1;
                if !on_ring {
                    continue;
                }
                let b = bi as usize * self.nb_lon + bj as usize;
                f(self.starts[b]..self.starts[b + 1]);
            }
        }
    }
}

#[inline]
fn is_better(d: f64, flat: usize, best: Option<(f64, usize)>) -> bool {
    match best {
        None => true,
        Some((bd, bk)) => d < bd || (d == bd && flat < bk),
    }
}
