//! Aggregate statistics over a bounded image region.
//!
//! A [`RegionBounds`] is turned into a boolean pixel mask once, then the
//! chosen [`Metric`] is applied to every frame and channel of the stack.

use std::str::FromStr;

use asi_common::{AsiError, ImageStack, LonLatBounds, Pixel, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use skymap::{corner_to_pixel, CornerGrid, MagneticTransform, Skymap};
use tracing::debug;

/// Aggregation applied over the masked pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Median,
    Mean,
    Sum,
}

impl FromStr for Metric {
    type Err = AsiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "median" => Ok(Metric::Median),
            "mean" => Ok(Metric::Mean),
            "sum" => Ok(Metric::Sum),
            other => Err(AsiError::invalid_parameter(
                "metric",
                format!("unknown metric '{}', expected one of median, mean, sum", other),
            )),
        }
    }
}

impl Metric {
    /// Apply the metric to `values`, ignoring NaNs.
    ///
    /// Returns NaN when no finite-or-infinite value remains.
    pub fn apply(&self, values: &mut Vec<f64>) -> f64 {
        values.retain(|v| !v.is_nan());
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Metric::Sum => values.iter().sum(),
            Metric::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Metric::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let n = values.len();
                if n % 2 == 1 {
                    values[n / 2]
                } else {
                    (values[n / 2 - 1] + values[n / 2]) / 2.0
                }
            }
        }
    }
}

/// The region over which a metric is computed.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionBounds {
    /// Inclusive pixel rectangle.
    Ccd { y0: usize, y1: usize, x0: usize, x1: usize },
    /// Inclusive elevation band in degrees.
    Elevation { min: f64, max: f64 },
    /// Inclusive azimuth range in degrees. `start > end` crosses north
    /// (e.g. 350..10).
    Azimuth { start: f64, end: f64 },
    /// Pixels owning a corner strictly inside the box.
    Geographic { bounds: LonLatBounds, altitude_km: f64 },
    /// Pixels owning a corner that, converted to magnetic coordinates at
    /// `timestamp`, lies inside the box (edges included).
    Magnetic {
        bounds: LonLatBounds,
        altitude_km: f64,
        timestamp: DateTime<Utc>,
    },
}

impl RegionBounds {
    fn needs_skymap(&self) -> bool {
        !matches!(self, RegionBounds::Ccd { .. })
    }

    /// Build the pixel mask for an image of `dim = (rows, cols)`.
    pub fn mask(
        &self,
        dim: (usize, usize),
        skymap: Option<&Skymap>,
        transform: Option<&dyn MagneticTransform>,
    ) -> Result<Array2<bool>> {
        let (rows, cols) = dim;
        let skymap = match (self.needs_skymap(), skymap) {
            (false, _) => None,
            (true, Some(s)) => {
                if s.dim() != dim {
                    return Err(AsiError::shape_mismatch("skymap vs image", dim, s.dim()));
                }
                Some(s)
            }
            (true, None) => {
                return Err(AsiError::invalid_parameter(
                    "skymap",
                    "a skymap is required for non-CCD bounds",
                ))
            }
        };

        match (self, skymap) {
            (RegionBounds::Ccd { y0, y1, x0, x1 }, _) => {
                let (y0, y1, x0, x1) = (*y0, *y1, *x0, *x1);
                if y0 > y1 || x0 > x1 {
                    return Err(AsiError::invalid_bounds(format!(
                        "CCD bounds [{}, {}, {}, {}] are inverted",
                        y0, y1, x0, x1
                    )));
                }
                if y1 >= rows || x1 >= cols {
                    return Err(AsiError::invalid_bounds(format!(
                        "CCD bounds [{}, {}, {}, {}] exceed image of {}x{}",
                        y0, y1, x0, x1, rows, cols
                    )));
                }
                Ok(Array2::from_shape_fn(dim, |(r, c)| {
                    r >= y0 && r <= y1 && c >= x0 && c <= x1
                }))
            }
            (RegionBounds::Elevation { min, max }, Some(skymap)) => {
                let (min, max) = (*min, *max);
                check_range("elevation", min, max, 0.0, 90.0)?;
                Ok(skymap.elevation().mapv(|e| e >= min && e <= max))
            }
            (RegionBounds::Azimuth { start, end }, Some(skymap)) => {
                let (start, end) = (*start, *end);
                for v in [start, end] {
                    if !(0.0..=360.0).contains(&v) {
                        return Err(AsiError::invalid_bounds(format!(
                            "azimuth {} is outside [0, 360]",
                            v
                        )));
                    }
                }
                if start == end {
                    return Err(AsiError::invalid_bounds(format!(
                        "azimuth bounds [{}, {}] have zero width",
                        start, end
                    )));
                }
                let crosses_north = start > end;
                Ok(skymap.azimuth().mapv(|a| {
                    if crosses_north {
                        a >= start || a <= end
                    } else {
                        a >= start && a <= end
                    }
                }))
            }
            (RegionBounds::Geographic { bounds, altitude_km }, Some(skymap)) => {
                let grid = skymap.corner_grid(*altitude_km)?;
                Ok(corner_mask(&grid, dim, |lat, lon| bounds.contains_strict(lon, lat)))
            }
            (
                RegionBounds::Magnetic {
                    bounds,
                    altitude_km,
                    timestamp,
                },
                Some(skymap),
            ) => {
                let transform = transform.ok_or_else(|| {
                    AsiError::invalid_parameter(
                        "transform",
                        "a magnetic transform is required for magnetic bounds",
                    )
                })?;
                let grid = skymap.corner_grid(*altitude_km)?;
                Ok(corner_mask(&grid, dim, |lat, lon| {
                    transform
                        .geo_to_mag(lat, lon, *altitude_km, *timestamp)
                        .map_or(false, |(mlat, mlon)| bounds.contains_inclusive(mlon, mlat))
                }))
            }
            (_, None) => Err(AsiError::invalid_parameter("skymap", "a skymap is required")),
        }
    }
}

/// Select the pixel owning every corner for which `inside(lat, lon)` holds.
///
/// Corners map through [`corner_to_pixel`], so the first corner row and
/// column fold onto pixel row and column 0 along with the second.
fn corner_mask(grid: &CornerGrid<'_>, dim: (usize, usize), inside: impl Fn(f64, f64) -> bool) -> Array2<bool> {
    let mut mask = Array2::from_elem(dim, false);
    let (corner_rows, corner_cols) = grid.dim();
    for i in 0..corner_rows {
        for j in 0..corner_cols {
            let (lat, lon) = (grid.lat(i, j), grid.lon(i, j));
            if lat.is_nan() || lon.is_nan() {
                continue;
            }
            if inside(lat, lon) {
                mask[corner_to_pixel(i, j)] = true;
            }
        }
    }
    mask
}

fn check_range(name: &str, min: f64, max: f64, lo: f64, hi: f64) -> Result<()> {
    if !(lo..=hi).contains(&min) || !(lo..=hi).contains(&max) {
        return Err(AsiError::invalid_bounds(format!(
            "{} bounds [{}, {}] must lie within [{}, {}]",
            name, min, max, lo, hi
        )));
    }
    if min >= max {
        return Err(AsiError::invalid_bounds(format!(
            "{} bounds [{}, {}] must satisfy min < max",
            name, min, max
        )));
    }
    Ok(())
}

/// Compute `metric` over the region for every frame and channel.
///
/// Returns an array of shape `(frames, channels)`. Fails with
/// [`AsiError::EmptyRegion`] when the mask selects no pixel.
pub fn extract_metric<T: Pixel>(
    stack: &ImageStack<T>,
    skymap: Option<&Skymap>,
    bounds: &RegionBounds,
    metric: Metric,
    transform: Option<&dyn MagneticTransform>,
) -> Result<Array2<f64>> {
    let (rows, cols, channels, frames) = stack.dim();
    let mask = bounds.mask((rows, cols), skymap, transform)?;

    let pixels: Vec<(usize, usize)> = mask
        .indexed_iter()
        .filter_map(|(idx, &m)| m.then_some(idx))
        .collect();
    if pixels.is_empty() {
        return Err(AsiError::empty_region(format!("{:?} selects no pixels", bounds)));
    }

    let data = stack.data();
    let mut out = Array2::<f64>::zeros((frames, channels));
    let mut values = Vec::with_capacity(pixels.len());
    for f in 0..frames {
        let frame = data.index_axis(Axis(3), f);
        for ch in 0..channels {
            values.clear();
            values.extend(pixels.iter().map(|&(r, c)| frame[[r, c, ch]].to_f64()));
            out[[f, ch]] = metric.apply(&mut values);
        }
    }

    debug!(
        pixels = pixels.len(),
        frames,
        channels,
        metric = ?metric,
        "extracted region metric"
    );
    Ok(out)
}

/// [`extract_metric`] for single-channel stacks: one value per frame.
pub fn extract_metric_single<T: Pixel>(
    stack: &ImageStack<T>,
    skymap: Option<&Skymap>,
    bounds: &RegionBounds,
    metric: Metric,
    transform: Option<&dyn MagneticTransform>,
) -> Result<Vec<f64>> {
    if stack.n_channels() != 1 {
        return Err(AsiError::shape_mismatch(
            "single-channel metric",
            1usize,
            stack.n_channels(),
        ));
    }
    let out = extract_metric(stack, skymap, bounds, metric, transform)?;
    Ok(out.column(0).to_vec())
}
