//! CCD-space contours for lines of constant elevation, azimuth, geographic
//! or magnetic coordinates.
//!
//! Every function returns pixel coordinates `(x, y)` with `x` along columns
//! and `y` along rows. A request that does not intersect the field of view
//! yields an empty [`ContourResult`] rather than an error.

pub mod marching;

use asi_common::{AsiError, Result};
use chrono::{DateTime, Utc};
use ndarray::ArrayView2;
use skymap::{corner_to_pixel, CornerGrid, MagneticTransform, Skymap};
use tracing::debug;

use crate::config::ToolsConfig;
use marching::{connect_segments, march_squares};

/// Longitude spacing used to trace a line of constant latitude, degrees.
pub const CONSTANT_LAT_LON_STEP: f64 = 0.2;

/// Latitude spacing used to trace a line of constant longitude, degrees.
pub const CONSTANT_LON_LAT_STEP: f64 = 0.1;

/// Elevations within this many degrees of the image maximum count as the peak.
const PEAK_TOLERANCE_DEG: f64 = 1e-9;

/// Equal-length pixel coordinate sequences tracing a path through the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourResult {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ContourResult {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    /// Iterate `(x, y)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    fn from_pixels(pixels: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut out = Self::default();
        for (row, col) in pixels {
            out.push(col as f64, row as f64);
        }
        out
    }

    /// Drop points lying exactly on the outermost rows or columns.
    fn remove_edges(mut self, rows: usize, cols: usize) -> Self {
        let max_x = cols.saturating_sub(1) as f64;
        let max_y = rows.saturating_sub(1) as f64;
        let (x, y): (Vec<f64>, Vec<f64>) = self
            .points()
            .filter(|&(x, y)| x != 0.0 && y != 0.0 && x != max_x && y != max_y)
            .unzip();
        self.x = x;
        self.y = y;
        self
    }

    /// Keep at most `n` points, evenly spaced along the sequence.
    fn decimate(self, n: usize) -> Self {
        let len = self.len();
        if n >= len || n == 0 {
            return self;
        }
        if n == 1 {
            return Self {
                x: vec![self.x[0]],
                y: vec![self.y[0]],
            };
        }
        let mut out = Self::default();
        for k in 0..n {
            let i = ((k * (len - 1)) as f64 / (n - 1) as f64).round() as usize;
            out.push(self.x[i], self.y[i]);
        }
        out
    }
}

/// Options shared by every contour request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourOptions {
    /// Number of samples along the contour; a sensible default is chosen
    /// per contour type when `None`.
    pub n_points: Option<usize>,
    /// Drop points on the image boundary, where skymap geometry is
    /// extrapolated rather than measured.
    pub remove_edge_cases: bool,
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            n_points: None,
            remove_edge_cases: true,
        }
    }
}

impl ContourOptions {
    /// Defaults with the edge filter taken from `config`.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            remove_edge_cases: config.remove_edge_cases,
            ..Self::default()
        }
    }

    pub fn keep_edges(mut self) -> Self {
        self.remove_edge_cases = false;
        self
    }

    pub fn with_n_points(mut self, n_points: usize) -> Self {
        self.n_points = Some(n_points);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_points == Some(0) {
            return Err(AsiError::invalid_parameter("n_points", "must be > 0"));
        }
        Ok(())
    }

    fn finish(&self, result: ContourResult, rows: usize, cols: usize) -> ContourResult {
        if self.remove_edge_cases {
            result.remove_edges(rows, cols)
        } else {
            result
        }
    }
}

/// A lat/lon contour request: an explicit path or a constant line.
#[derive(Debug, Clone, PartialEq)]
pub enum LatLonRequest {
    Path { lats: Vec<f64>, lons: Vec<f64> },
    ConstantLat(f64),
    ConstantLon(f64),
}

impl LatLonRequest {
    /// An explicit path; both sequences must have the same length.
    pub fn path(lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        if lats.len() != lons.len() {
            return Err(AsiError::shape_mismatch(
                "contour path latitudes vs longitudes",
                lats.len(),
                lons.len(),
            ));
        }
        if lats.is_empty() {
            return Err(AsiError::invalid_parameter("lats", "path must contain at least one point"));
        }
        Ok(Self::Path { lats, lons })
    }

    /// Build a request from optional parts; exactly one form must be given.
    pub fn from_parts(
        lats: Option<Vec<f64>>,
        lons: Option<Vec<f64>>,
        constant_lat: Option<f64>,
        constant_lon: Option<f64>,
    ) -> Result<Self> {
        if lats.is_some() != lons.is_some() {
            return Err(AsiError::invalid_parameter(
                "lats/lons",
                "both latitudes and longitudes must be supplied for a custom path",
            ));
        }
        let given = lats.is_some() as usize + constant_lat.is_some() as usize + constant_lon.is_some() as usize;
        if given != 1 {
            return Err(AsiError::invalid_parameter(
                "contour",
                format!(
                    "exactly one of lats & lons, constant_lat, constant_lon must be supplied (got {})",
                    given
                ),
            ));
        }

        match (lats, lons, constant_lat, constant_lon) {
            (Some(lats), Some(lons), _, _) => Self::path(lats, lons),
            (_, _, Some(lat), _) => Ok(Self::ConstantLat(lat)),
            (_, _, _, Some(lon)) => Ok(Self::ConstantLon(lon)),
            _ => Err(AsiError::invalid_parameter("contour", "no contour defined")),
        }
    }
}

// ============================================================================
// Elevation
// ============================================================================

/// Contour of constant elevation.
///
/// Crossings are located by linear interpolation on every row and column
/// edge of the elevation grid and joined into polylines, longest first. A
/// constant equal to the image maximum returns the peak pixel alone. A
/// constant above the maximum returns an empty result.
pub fn elevation(skymap: &Skymap, constant: f64, opts: &ContourOptions) -> Result<ContourResult> {
    opts.validate()?;
    if !constant.is_finite() {
        return Err(AsiError::invalid_parameter("constant_elevation", "must be finite"));
    }
    let field = skymap.elevation().view();
    let (rows, cols) = field.dim();

    let Some((peak_row, peak_col, peak)) = argmax(field) else {
        return Ok(ContourResult::default());
    };
    if constant > peak + PEAK_TOLERANCE_DEG {
        debug!(constant, max = peak, "elevation contour above image maximum");
        return Ok(ContourResult::default());
    }
    if constant >= peak - PEAK_TOLERANCE_DEG {
        return Ok(ContourResult::from_pixels([(peak_row, peak_col)]));
    }

    let mut polylines = connect_segments(&march_squares(field, constant));
    polylines.sort_by(|a, b| b.points.len().cmp(&a.points.len()));

    let mut result = ContourResult::default();
    for line in &polylines {
        for p in &line.points {
            result.push(p.x, p.y);
        }
    }
    if let Some(n) = opts.n_points {
        result = result.decimate(n);
    }

    let result = opts.finish(result, rows, cols);
    debug!(constant, polylines = polylines.len(), points = result.len(), "elevation contour");
    Ok(result)
}

fn argmax(field: ArrayView2<'_, f64>) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for ((r, c), &v) in field.indexed_iter() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, _, b)| v > b) {
            best = Some((r, c, v));
        }
    }
    best
}

// ============================================================================
// Azimuth
// ============================================================================

/// Contour of constant azimuth.
///
/// Walks outward from zenith in elevation bands of `90 / n_points` degrees
/// (1° by default), from `max_elevation` (default 90) down to
/// `min_elevation` (default 5). In each band the pixel whose azimuth is
/// circularly closest to the target is taken; the first in row-major order
/// wins ties.
pub fn azimuth(
    skymap: &Skymap,
    constant: f64,
    min_elevation: Option<f64>,
    max_elevation: Option<f64>,
    opts: &ContourOptions,
) -> Result<ContourResult> {
    opts.validate()?;
    if !constant.is_finite() {
        return Err(AsiError::invalid_parameter("constant_azimuth", "must be finite"));
    }
    let min_el = min_elevation.unwrap_or(5.0);
    let max_el = max_elevation.unwrap_or(90.0);
    for (name, el) in [("min_elevation", min_el), ("max_elevation", max_el)] {
        if !(0.0..=90.0).contains(&el) {
            return Err(AsiError::invalid_bounds(format!("{} = {} must be within [0, 90]", name, el)));
        }
    }
    if min_el >= max_el {
        return Err(AsiError::invalid_bounds(format!(
            "min_elevation {} must be below max_elevation {}",
            min_el, max_el
        )));
    }
    if !(0.0..=360.0).contains(&constant) {
        return Ok(ContourResult::default());
    }
    let target = if constant == 360.0 { 0.0 } else { constant };

    let step = opts.n_points.map_or(1.0, |n| 90.0 / n as f64);
    let n_bands = ((max_el - min_el) / step + 1e-9).floor() as usize;

    let elevation = skymap.elevation();
    let azimuth = skymap.azimuth();
    let (rows, cols) = skymap.dim();

    let mut best: Vec<Option<(f64, usize, usize)>> = vec![None; n_bands];
    for ((r, c), &el) in elevation.indexed_iter() {
        let az = azimuth[[r, c]];
        if el.is_nan() || az.is_nan() || el < min_el || el > max_el {
            continue;
        }
        // Band 0 is the topmost and includes max_elevation itself
        let band = (((max_el - el) / step).floor() as usize).min(n_bands.saturating_sub(1));
        let band_low = max_el - (band as f64 + 1.0) * step;
        if n_bands == 0 || el < band_low - 1e-9 {
            continue;
        }
        let diff = circular_diff(az, target);
        if best[band].map_or(true, |(d, _, _)| diff < d) {
            best[band] = Some((diff, r, c));
        }
    }

    let mut pixels: Vec<(usize, usize)> = best.into_iter().flatten().map(|(_, r, c)| (r, c)).collect();
    pixels.dedup();

    let result = opts.finish(ContourResult::from_pixels(pixels), rows, cols);
    debug!(constant, bands = n_bands, points = result.len(), "azimuth contour");
    Ok(result)
}

fn circular_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

// ============================================================================
// Geographic / magnetic
// ============================================================================

/// Contour of a geographic path or constant-latitude/longitude line.
pub fn geo(
    skymap: &Skymap,
    altitude_km: f64,
    request: &LatLonRequest,
    opts: &ContourOptions,
) -> Result<ContourResult> {
    opts.validate()?;
    let grid = skymap.corner_grid(altitude_km)?;
    let (rows, cols) = skymap.dim();

    let pixels = match request {
        LatLonRequest::Path { lats, lons } => resolve_path(&grid, lats, lons).into_iter().flatten().collect(),
        LatLonRequest::ConstantLat(lat) => constant_line(&grid, *lat, LineAxis::Latitude, opts.n_points)?,
        LatLonRequest::ConstantLon(lon) => constant_line(&grid, *lon, LineAxis::Longitude, opts.n_points)?,
    };

    let result = opts.finish(ContourResult::from_pixels(pixels), rows, cols);
    debug!(altitude_km, points = result.len(), "geographic contour");
    Ok(result)
}

/// Contour of a magnetic path or constant-latitude/longitude line.
///
/// The request is converted to geographic coordinates with `transform` at
/// `timestamp` and then resolved like a geographic path.
pub fn mag(
    skymap: &Skymap,
    transform: &dyn MagneticTransform,
    timestamp: DateTime<Utc>,
    altitude_km: f64,
    request: &LatLonRequest,
    opts: &ContourOptions,
) -> Result<ContourResult> {
    opts.validate()?;
    let grid = skymap.corner_grid(altitude_km)?;
    let (rows, cols) = skymap.dim();

    let (lats, lons, dedupe) = magnetic_to_geographic(transform, timestamp, altitude_km, request);
    let mut pixels: Vec<(usize, usize)> = resolve_path(&grid, &lats, &lons).into_iter().flatten().collect();
    if dedupe {
        pixels.dedup();
    }

    let result = opts.finish(ContourResult::from_pixels(pixels), rows, cols);
    debug!(altitude_km, points = result.len(), "magnetic contour");
    Ok(result)
}

/// Convert a magnetic request to a geographic point sequence.
///
/// Constant lines are sampled densely in magnetic space. The returned flag
/// is true when consecutive duplicate pixels should be collapsed.
pub(crate) fn magnetic_to_geographic(
    transform: &dyn MagneticTransform,
    timestamp: DateTime<Utc>,
    altitude_km: f64,
    request: &LatLonRequest,
) -> (Vec<f64>, Vec<f64>, bool) {
    let (mag_points, dense): (Vec<(f64, f64)>, bool) = match request {
        LatLonRequest::Path { lats, lons } => (lats.iter().copied().zip(lons.iter().copied()).collect(), false),
        LatLonRequest::ConstantLat(lat) => (
            sample_range(-180.0, 180.0, CONSTANT_LAT_LON_STEP)
                .into_iter()
                .map(|lon| (*lat, lon))
                .collect(),
            true,
        ),
        LatLonRequest::ConstantLon(lon) => (
            sample_range(-90.0, 90.0, CONSTANT_LON_LAT_STEP)
                .into_iter()
                .map(|lat| (lat, *lon))
                .collect(),
            true,
        ),
    };

    let (lats, lons) = mag_points
        .into_iter()
        .filter_map(|(lat, lon)| transform.mag_to_geo(lat, lon, altitude_km, timestamp))
        .unzip();
    (lats, lons, dense)
}

/// Inclusive evenly spaced samples from `start` to `end`.
pub(crate) fn sample_range(start: f64, end: f64, step: f64) -> Vec<f64> {
    let n = ((end - start) / step).round() as usize;
    (0..=n).map(|k| start + k as f64 * step).collect()
}

/// Resolve each lat/lon point to the pixel owning its nearest corner.
///
/// Points outside the grid's lat/lon range resolve to `None`.
pub(crate) fn resolve_path(grid: &CornerGrid<'_>, lats: &[f64], lons: &[f64]) -> Vec<Option<(usize, usize)>> {
    let index = grid.index();
    lats.iter()
        .zip(lons)
        .map(|(&lat, &lon)| {
            let lon = asi_common::bbox::normalize_lon(lon);
            if !grid.covers(lat, lon) {
                return None;
            }
            index.nearest(lat, lon).map(|(i, j)| corner_to_pixel(i, j))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineAxis {
    Latitude,
    Longitude,
}

/// Trace a constant-latitude (or -longitude) line across the corner grid.
///
/// The other coordinate's range is split into `n_points - 1` half-open
/// slices; in each slice the corner closest to the constant is taken, the
/// first in row-major order on ties.
fn constant_line(
    grid: &CornerGrid<'_>,
    constant: f64,
    axis: LineAxis,
    n_points: Option<usize>,
) -> Result<Vec<(usize, usize)>> {
    let (nrows, ncols) = grid.dim();
    let n = n_points.unwrap_or_else(|| (((nrows as f64 - 1.0) / 5.12).round() as usize).max(2));
    if n < 2 {
        return Err(AsiError::invalid_parameter(
            "n_points",
            "a constant latitude/longitude line needs at least 2 points",
        ));
    }

    let (Some(lat_range), Some(lon_range)) = (grid.lat_range(), grid.lon_range()) else {
        return Ok(vec![]);
    };
    let (constant, (target_min, target_max), (slice_min, slice_max)) = match axis {
        LineAxis::Latitude => (constant, lat_range, lon_range),
        LineAxis::Longitude => (asi_common::bbox::normalize_lon(constant), lon_range, lat_range),
    };
    if constant < target_min || constant > target_max {
        return Ok(vec![]);
    }
    let width = (slice_max - slice_min) / (n - 1) as f64;
    if width <= 0.0 {
        return Ok(vec![]);
    }

    let mut best: Vec<Option<(f64, usize)>> = vec![None; n - 1];
    for i in 0..nrows {
        for j in 0..ncols {
            if !grid.is_valid(i, j) {
                continue;
            }
            let (target, along) = match axis {
                LineAxis::Latitude => (grid.lat(i, j), grid.lon(i, j)),
                LineAxis::Longitude => (grid.lon(i, j), grid.lat(i, j)),
            };
            let s = ((along - slice_min) / width).floor();
            if s < 0.0 || s >= (n - 1) as f64 {
                continue;
            }
            let s = s as usize;
            let diff = (target - constant).abs();
            if best[s].map_or(true, |(d, _)| diff < d) {
                best[s] = Some((diff, i * ncols + j));
            }
        }
    }

    Ok(best
        .into_iter()
        .flatten()
        .map(|(_, k)| corner_to_pixel(k / ncols, k % ncols))
        .collect())
}
