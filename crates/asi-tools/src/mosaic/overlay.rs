//! Geographic and magnetic contour overlays and field-of-view rings for
//! mosaics.

use std::fmt;
use std::str::FromStr;

use asi_common::{AsiError, Result};
use chrono::{DateTime, Utc};
use projection::MapProjection;
use serde::{Deserialize, Serialize};
use skymap::{MagneticTransform, SiteLocation};
use tracing::debug;

use super::Mosaic;
use crate::contour::{sample_range, CONSTANT_LAT_LON_STEP, CONSTANT_LON_LAT_STEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    DashDot,
    Dotted,
}

impl FromStr for LineStyle {
    type Err = AsiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "solid" | "-" => Ok(LineStyle::Solid),
            "dashed" | "--" => Ok(LineStyle::Dashed),
            "dashdot" | "-." => Ok(LineStyle::DashDot),
            "dotted" | ":" => Ok(LineStyle::Dotted),
            other => Err(AsiError::invalid_parameter(
                "linestyle",
                format!(
                    "unknown line style '{}', expected one of solid, dashed, dashdot, dotted, '-', '--', '-.', ':'",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineStyle::Solid => "solid",
            LineStyle::Dashed => "dashed",
            LineStyle::DashDot => "dashdot",
            LineStyle::Dotted => "dotted",
        };
        f.write_str(s)
    }
}

/// Vertex marker drawn along an overlay line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    #[default]
    None,
    Circle,
    Point,
    Pentagon,
    Star,
    Cross,
    Plus,
    FilledCross,
}

impl FromStr for Marker {
    type Err = AsiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Marker::None),
            "o" => Ok(Marker::Circle),
            "." => Ok(Marker::Point),
            "p" => Ok(Marker::Pentagon),
            "*" => Ok(Marker::Star),
            "x" => Ok(Marker::Cross),
            "+" => Ok(Marker::Plus),
            "X" => Ok(Marker::FilledCross),
            other => Err(AsiError::invalid_parameter(
                "marker",
                format!("unknown marker '{}', expected one of '', o, ., p, *, x, +, X", other),
            )),
        }
    }
}

/// Rendering hints carried with each overlay line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourStyle {
    pub color: String,
    pub linewidth: f64,
    pub linestyle: LineStyle,
    pub marker: Marker,
    /// Draw above the mosaic polygons rather than beneath later layers.
    pub bring_to_front: bool,
}

impl Default for ContourStyle {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            linewidth: 1.0,
            linestyle: LineStyle::Solid,
            marker: Marker::None,
            bring_to_front: false,
        }
    }
}

impl ContourStyle {
    pub fn new(color: impl Into<String>, linewidth: f64, linestyle: &str) -> Result<Self> {
        let style = Self {
            color: color.into(),
            linewidth,
            linestyle: linestyle.parse()?,
            ..Self::default()
        };
        style.validate()?;
        Ok(style)
    }

    pub fn with_marker(mut self, marker: &str) -> Result<Self> {
        self.marker = marker.parse()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.color.trim().is_empty() {
            return Err(AsiError::invalid_parameter("color", "must not be empty"));
        }
        if !(self.linewidth > 0.0) {
            return Err(AsiError::invalid_parameter(
                "linewidth",
                format!("must be > 0, got {}", self.linewidth),
            ));
        }
        Ok(())
    }
}

/// Lines to overlay: one explicit path, any number of constant latitudes
/// and constant longitudes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourRequest {
    pub lats: Option<Vec<f64>>,
    pub lons: Option<Vec<f64>>,
    pub constant_lats: Vec<f64>,
    pub constant_lons: Vec<f64>,
}

impl ContourRequest {
    pub fn path(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        Self {
            lats: Some(lats),
            lons: Some(lons),
            ..Self::default()
        }
    }

    pub fn constant_lats(lats: impl Into<Vec<f64>>) -> Self {
        Self {
            constant_lats: lats.into(),
            ..Self::default()
        }
    }

    pub fn constant_lons(lons: impl Into<Vec<f64>>) -> Self {
        Self {
            constant_lons: lons.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        match (&self.lats, &self.lons) {
            (Some(lats), Some(lons)) if lats.len() != lons.len() => {
                return Err(AsiError::shape_mismatch("contour lats vs lons", lats.len(), lons.len()));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AsiError::invalid_parameter(
                    "lats/lons",
                    "explicit contour points need both latitudes and longitudes",
                ));
            }
            (None, None) if self.constant_lats.is_empty() && self.constant_lons.is_empty() => {
                return Err(AsiError::invalid_parameter(
                    "contours",
                    "no latitudes or longitudes provided",
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Every requested line as `(lat, lon)` points in the request's own
    /// coordinate system, tagged with the axis that varies along it.
    fn lines(&self) -> Vec<(Varying, Vec<(f64, f64)>)> {
        let mut out = Vec::new();
        if let (Some(lats), Some(lons)) = (&self.lats, &self.lons) {
            out.push((Varying::Path, lats.iter().copied().zip(lons.iter().copied()).collect()));
        }
        for &lat in &self.constant_lats {
            let points = sample_range(-180.0, 180.0, CONSTANT_LAT_LON_STEP)
                .into_iter()
                .map(|lon| (lat, lon))
                .collect();
            out.push((Varying::Longitude, points));
        }
        for &lon in &self.constant_lons {
            let points = sample_range(-90.0, 90.0, CONSTANT_LON_LAT_STEP)
                .into_iter()
                .map(|lat| (lat, lon))
                .collect();
            out.push((Varying::Latitude, points));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Varying {
    Path,
    Latitude,
    Longitude,
}

/// A projected overlay line.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLine {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub style: ContourStyle,
}

impl ContourLine {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    fn project(points: Vec<(f64, f64)>, projection: &dyn MapProjection, style: &ContourStyle) -> Self {
        let mut line = Self {
            lats: Vec::with_capacity(points.len()),
            lons: Vec::with_capacity(points.len()),
            x: Vec::with_capacity(points.len()),
            y: Vec::with_capacity(points.len()),
            style: style.clone(),
        };
        for (lat, lon) in points {
            if let Some((x, y)) = projection.project(lat, lon) {
                line.lats.push(lat);
                line.lons.push(lon);
                line.x.push(x);
                line.y.push(y);
            }
        }
        line
    }
}

impl Mosaic<'_> {
    /// Add lines of geographic latitude/longitude, projected with the
    /// mosaic's projection. Returns the number of lines added.
    pub fn add_geo_contours(&mut self, request: &ContourRequest, style: &ContourStyle) -> Result<usize> {
        request.validate()?;
        style.validate()?;

        let lines: Vec<ContourLine> = request
            .lines()
            .into_iter()
            .map(|(_, points)| ContourLine::project(points, self.projection, style))
            .filter(|line| !line.is_empty())
            .collect();
        let added = lines.len();
        self.contours.extend(lines);
        debug!(added, "added geographic contours");
        Ok(added)
    }

    /// Add lines of magnetic latitude/longitude at the mosaic altitude.
    ///
    /// Points are converted to geographic coordinates at `timestamp`;
    /// points with no solution are dropped and constant lines are reordered
    /// along their varying axis after conversion.
    pub fn add_mag_contours(
        &mut self,
        request: &ContourRequest,
        style: &ContourStyle,
        transform: &dyn MagneticTransform,
        timestamp: DateTime<Utc>,
    ) -> Result<usize> {
        request.validate()?;
        style.validate()?;

        let altitude_km = self.altitude_km;
        let mut added = 0usize;
        for (varying, points) in request.lines() {
            let mut geo: Vec<(f64, f64)> = points
                .into_iter()
                .filter_map(|(lat, lon)| transform.mag_to_geo(lat, lon, altitude_km, timestamp))
                .collect();
            match varying {
                Varying::Latitude => geo.sort_by(|a, b| a.0.total_cmp(&b.0)),
                Varying::Longitude => geo.sort_by(|a, b| a.1.total_cmp(&b.1)),
                Varying::Path => {}
            }
            let line = ContourLine::project(geo, self.projection, style);
            if !line.is_empty() {
                self.contours.push(line);
                added += 1;
            }
        }
        debug!(added, altitude_km, %timestamp, "added magnetic contours");
        Ok(added)
    }

    /// Outline each site's field of view at the mosaic altitude, cut off at
    /// `min_elevation`. Returns the number of rings added.
    pub fn add_fov_rings(&mut self, sites: &[SiteLocation], min_elevation: f64, style: &ContourStyle) -> Result<usize> {
        style.validate()?;
        let rings = sites
            .iter()
            .map(|site| site.fov_ring(self.altitude_km, min_elevation))
            .collect::<Result<Vec<_>>>()?;

        let lines: Vec<ContourLine> = rings
            .into_iter()
            .map(|ring| ContourLine::project(ring, self.projection, style))
            .filter(|line| !line.is_empty())
            .collect();
        let added = lines.len();
        self.contours.extend(lines);
        debug!(added, min_elevation, altitude_km = self.altitude_km, "added field-of-view rings");
        Ok(added)
    }
}
