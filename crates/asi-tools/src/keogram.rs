//! Keograms: one spatial slice per frame, stacked along time.
//!
//! Two construction modes:
//!
//! - [`Keogram::create`] copies a fixed row or column out of every frame.
//! - [`Keogram::create_custom`] walks an arbitrary path (CCD, geographic or
//!   magnetic) and aggregates a perpendicular strip of `width` pixels at
//!   every path point. The first path point becomes keogram row 0.

use asi_common::{determine_cadence, expected_timestamps, find_frame, AsiError, ImageStack, Pixel, Result};
use chrono::{DateTime, Utc};
use nalgebra::Vector2;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use skymap::{MagneticTransform, Skymap};
use tracing::{debug, warn};

use crate::contour::{self, ContourOptions, LatLonRequest};
use crate::metric::Metric;

/// Which image axis a fixed-slice keogram runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeogramAxis {
    /// Axis 0: a full column of `rows` pixels.
    #[default]
    NorthSouth,
    /// Axis 1: a full row of `cols` pixels.
    EastWest,
}

/// The path a custom keogram is sampled along.
pub enum KeogramPath<'a> {
    /// Explicit pixel coordinates.
    Ccd { x: Vec<f64>, y: Vec<f64> },
    /// Geographic points or a constant-latitude/longitude line.
    Geographic {
        skymap: &'a Skymap,
        altitude_km: f64,
        request: LatLonRequest,
    },
    /// Magnetic points or a constant-latitude/longitude line.
    Magnetic {
        skymap: &'a Skymap,
        altitude_km: f64,
        transform: &'a dyn MagneticTransform,
        timestamp: DateTime<Utc>,
        request: LatLonRequest,
    },
}

impl KeogramPath<'_> {
    /// Resolve to pixel coordinates inside an image of `dim = (rows, cols)`.
    fn resolve(&self, dim: (usize, usize)) -> Result<(Vec<f64>, Vec<f64>)> {
        let (rows, cols) = dim;
        let (x, y) = match self {
            KeogramPath::Ccd { x, y } => {
                if x.len() != y.len() {
                    return Err(AsiError::shape_mismatch("keogram path x vs y", x.len(), y.len()));
                }
                (x.clone(), y.clone())
            }
            KeogramPath::Geographic {
                skymap,
                altitude_km,
                request,
            } => {
                check_skymap_dim(skymap, dim)?;
                let c = contour::geo(skymap, *altitude_km, request, &ContourOptions::default().keep_edges())?;
                (c.x, c.y)
            }
            KeogramPath::Magnetic {
                skymap,
                altitude_km,
                transform,
                timestamp,
                request,
            } => {
                check_skymap_dim(skymap, dim)?;
                let c = contour::mag(
                    skymap,
                    *transform,
                    *timestamp,
                    *altitude_km,
                    request,
                    &ContourOptions::default().keep_edges(),
                )?;
                (c.x, c.y)
            }
        };

        let max_x = (cols - 1) as f64;
        let max_y = (rows - 1) as f64;
        Ok(x.into_iter()
            .zip(y)
            .filter(|&(x, y)| (0.0..=max_x).contains(&x) && (0.0..=max_y).contains(&y))
            .unzip())
    }
}

fn check_skymap_dim(skymap: &Skymap, dim: (usize, usize)) -> Result<()> {
    if skymap.dim() != dim {
        return Err(AsiError::shape_mismatch("skymap vs image", dim, skymap.dim()));
    }
    Ok(())
}

/// A keogram and its axis labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Keogram {
    /// Values of shape `(line_len, frames, channels)`.
    pub data: Array3<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
    /// Position along the slice (CCD pixel index or path point index).
    pub ccd_y: Vec<usize>,
    pub geo_y: Option<Vec<f64>>,
    pub mag_y: Option<Vec<f64>>,
    /// Fixed row/column for axis keograms.
    pub slice_idx: Option<usize>,
    pub axis: Option<KeogramAxis>,
    /// Pixel path `(x, y)` for custom keograms.
    pub ccd_path: Option<(Vec<f64>, Vec<f64>)>,
    /// Shape `(rows, cols)` of the source images.
    pub source_dim: (usize, usize),
}

impl Keogram {
    /// Build a fixed-slice keogram.
    ///
    /// `slice_idx` defaults to `floor(n / 2 - 1)` where `n` is the length of
    /// the axis being sliced across.
    pub fn create<T: Pixel>(stack: &ImageStack<T>, axis: KeogramAxis, slice_idx: Option<usize>) -> Result<Self> {
        let (rows, cols, channels, frames) = stack.dim();
        let (line_len, across) = match axis {
            KeogramAxis::NorthSouth => (rows, cols),
            KeogramAxis::EastWest => (cols, rows),
        };
        let idx = slice_idx.unwrap_or((across / 2).saturating_sub(1));
        if idx >= across {
            return Err(AsiError::invalid_bounds(format!(
                "slice index {} is outside [0, {})",
                idx, across
            )));
        }

        let src = stack.data();
        let data = Array3::from_shape_fn((line_len, frames, channels), |(p, f, ch)| match axis {
            KeogramAxis::NorthSouth => src[[p, idx, ch, f]].to_f64(),
            KeogramAxis::EastWest => src[[idx, p, ch, f]].to_f64(),
        });

        debug!(axis = ?axis, slice_idx = idx, line_len, frames, "built keogram");
        Ok(Self {
            data,
            timestamps: stack.timestamps().to_vec(),
            ccd_y: (0..line_len).collect(),
            geo_y: None,
            mag_y: None,
            slice_idx: Some(idx),
            axis: Some(axis),
            ccd_path: None,
            source_dim: (rows, cols),
        })
    }

    /// Build a keogram along a custom path.
    ///
    /// Fails before touching any frame when `width` is zero or when no path
    /// point lies inside the image.
    pub fn create_custom<T: Pixel>(
        stack: &ImageStack<T>,
        path: &KeogramPath<'_>,
        width: usize,
        metric: Metric,
    ) -> Result<Self> {
        if width == 0 {
            return Err(AsiError::invalid_bounds("keogram width must be at least 1 pixel"));
        }
        let (rows, cols, channels, frames) = stack.dim();
        let (xs, ys) = path.resolve((rows, cols))?;
        if xs.is_empty() {
            return Err(AsiError::empty_region("keogram path lies entirely outside the image"));
        }

        let strips: Vec<Vec<(usize, usize)>> = (0..xs.len())
            .map(|k| strip_pixels(&xs, &ys, k, width, rows, cols))
            .collect();

        let src = stack.data();
        let mut data = Array3::<f64>::zeros((strips.len(), frames, channels));
        let mut values = Vec::new();
        for (p, strip) in strips.iter().enumerate() {
            for f in 0..frames {
                for ch in 0..channels {
                    values.clear();
                    values.extend(strip.iter().map(|&(r, c)| src[[r, c, ch, f]].to_f64()));
                    data[[p, f, ch]] = metric.apply(&mut values);
                }
            }
        }

        debug!(points = strips.len(), width, frames, metric = ?metric, "built custom keogram");
        Ok(Self {
            data,
            timestamps: stack.timestamps().to_vec(),
            ccd_y: (0..strips.len()).collect(),
            geo_y: None,
            mag_y: None,
            slice_idx: None,
            axis: None,
            ccd_path: Some((xs, ys)),
            source_dim: (rows, cols),
        })
    }

    pub fn line_len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_frames(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Pixel `(row, col)` represented by each keogram row.
    fn slice_pixels(&self) -> Vec<(usize, usize)> {
        match (&self.ccd_path, self.axis, self.slice_idx) {
            (Some((xs, ys)), _, _) => xs
                .iter()
                .zip(ys)
                .map(|(&x, &y)| (y.round() as usize, x.round() as usize))
                .collect(),
            (None, Some(KeogramAxis::NorthSouth), Some(idx)) => self.ccd_y.iter().map(|&p| (p, idx)).collect(),
            (None, Some(KeogramAxis::EastWest), Some(idx)) => self.ccd_y.iter().map(|&p| (idx, p)).collect(),
            _ => vec![],
        }
    }

    /// Label each keogram row with the geographic latitude of its pixel.
    ///
    /// `altitude_km` defaults to the skymap's middle altitude.
    pub fn set_geographic_latitudes(&mut self, skymap: &Skymap, altitude_km: Option<f64>) -> Result<()> {
        check_skymap_dim(skymap, self.source_dim)?;
        let grid = skymap.corner_grid(altitude_km.unwrap_or_else(|| skymap.default_altitude_km()))?;
        self.geo_y = Some(
            self.slice_pixels()
                .into_iter()
                .map(|(r, c)| grid.representative_point(r, c).0)
                .collect(),
        );
        Ok(())
    }

    /// Label each keogram row with the magnetic latitude of its pixel at
    /// `timestamp`. Points the transform cannot convert are NaN.
    pub fn set_magnetic_latitudes(
        &mut self,
        skymap: &Skymap,
        transform: &dyn MagneticTransform,
        timestamp: DateTime<Utc>,
        altitude_km: Option<f64>,
    ) -> Result<()> {
        check_skymap_dim(skymap, self.source_dim)?;
        let altitude_km = altitude_km.unwrap_or_else(|| skymap.default_altitude_km());
        let grid = skymap.corner_grid(altitude_km)?;
        self.mag_y = Some(
            self.slice_pixels()
                .into_iter()
                .map(|(r, c)| {
                    let (lat, lon) = grid.representative_point(r, c);
                    transform
                        .geo_to_mag(lat, lon, altitude_km, timestamp)
                        .map_or(f64::NAN, |(mlat, _)| mlat)
                })
                .collect(),
        );
        Ok(())
    }

    /// Insert NaN columns wherever a frame is missing from the regular
    /// timestamp sequence.
    ///
    /// `cadence_s` defaults to the apparent cadence of the timestamps.
    pub fn inject_nans(&mut self, cadence_s: Option<i64>) -> Result<()> {
        let apparent = determine_cadence(&self.timestamps);
        let cadence = match (cadence_s, apparent) {
            (Some(c), _) if c <= 0 => {
                return Err(AsiError::invalid_parameter("cadence", "must be a positive number of seconds"))
            }
            (Some(c), Some(a)) => {
                if c != a {
                    warn!(
                        apparent = a,
                        requested = c,
                        "requested cadence differs from the keogram timestamps"
                    );
                }
                c
            }
            (Some(c), None) => c,
            (None, Some(a)) if a > 0 => a,
            (None, _) => return Ok(()),
        };

        let (Some(&first), Some(&last)) = (self.timestamps.first(), self.timestamps.last()) else {
            return Ok(());
        };
        let expected = expected_timestamps(first, last, cadence);
        let (line_len, _, channels) = self.data.dim();
        let mut data = Array3::<f64>::from_elem((line_len, expected.len(), channels), f64::NAN);
        let mut filled = 0usize;
        for (slot, &ts) in expected.iter().enumerate() {
            if let Some(src) = find_frame(&self.timestamps, ts) {
                data.index_axis_mut(Axis(1), slot)
                    .assign(&self.data.index_axis(Axis(1), src));
                filled += 1;
            }
        }

        debug!(
            cadence,
            slots = expected.len(),
            missing = expected.len() - filled,
            "injected NaN frames into keogram"
        );
        self.data = data;
        self.timestamps = expected;
        Ok(())
    }
}

/// In-image pixels `(row, col)` of the perpendicular strip at path point `k`.
fn strip_pixels(xs: &[f64], ys: &[f64], k: usize, width: usize, rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let n = xs.len();
    let prev = k.saturating_sub(1);
    let next = (k + 1).min(n - 1);
    let tangent = Vector2::new(xs[next] - xs[prev], ys[next] - ys[prev]);
    let tangent = if tangent.norm() > f64::EPSILON {
        tangent.normalize()
    } else {
        Vector2::new(0.0, 1.0)
    };
    let normal = Vector2::new(-tangent.y, tangent.x);
    let centre = Vector2::new(xs[k], ys[k]);
    let half = (width as f64 - 1.0) / 2.0;

    let mut out: Vec<(usize, usize)> = Vec::with_capacity(width);
    for i in 0..width {
        let p = centre + normal * (i as f64 - half);
        let (x, y) = (p.x.round(), p.y.round());
        if x < 0.0 || y < 0.0 || x > (cols - 1) as f64 || y > (rows - 1) as f64 {
            continue;
        }
        let px = (y as usize, x as usize);
        if !out.contains(&px) {
            out.push(px);
        }
    }
    // an even strip straddling the edge can miss the image entirely
    if out.is_empty() {
        let x = centre.x.round().clamp(0.0, (cols - 1) as f64);
        let y = centre.y.round().clamp(0.0, (rows - 1) as f64);
        out.push((y as usize, x as usize));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_perpendicular_to_vertical_path() {
        let xs = [2.0, 2.0, 2.0];
        let ys = [0.0, 1.0, 2.0];
        let strip = strip_pixels(&xs, &ys, 1, 3, 5, 5);
        assert_eq!(strip, vec![(1, 3), (1, 2), (1, 1)]);
    }

    #[test]
    fn test_strip_clipped_at_edge() {
        let xs = [0.0, 0.0];
        let ys = [0.0, 1.0];
        let strip = strip_pixels(&xs, &ys, 0, 3, 4, 4);
        assert_eq!(strip, vec![(0, 1), (0, 0)]);
    }

    #[test]
    fn test_even_strip_on_single_column_image_keeps_centre() {
        // offsets of +-0.5 round to columns -1 and 1, both outside a 1-wide image
        let xs = [0.0, 0.0, 0.0];
        let ys = [0.0, 1.0, 2.0];
        let strip = strip_pixels(&xs, &ys, 1, 2, 3, 1);
        assert_eq!(strip, vec![(1, 0)]);
    }

    #[test]
    fn test_strip_single_point_path() {
        let strip = strip_pixels(&[1.0], &[1.0], 0, 1, 3, 3);
        assert_eq!(strip, vec![(1, 1)]);
    }
}
