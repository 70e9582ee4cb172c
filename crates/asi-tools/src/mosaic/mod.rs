//! Multi-site geographic mosaics.
//!
//! ```text
//!   skymaps ──prep_skymaps──▶ MosaicSkymap ─┐
//!                                           ├──create(frame)──▶ Mosaic ──add_*_contours──▶ overlays
//!   stacks ───prep_images───▶ MosaicData ───┘
//! ```
//!
//! Each pixel at or above the minimum elevation becomes one quadrilateral
//! polygon valued by its scaled intensity. Polygons are ordered for drawing
//! by elevation band, so where two sites overlap the pixel seen closer to
//! zenith is drawn last and wins.

pub mod overlay;
pub mod prep;

use std::collections::HashMap;

use asi_common::{nearest_frame, AsiError, Result};
use chrono::{DateTime, Utc};
use ndarray::s;
use projection::MapProjection;
use tracing::{debug, info};

use crate::config::ToolsConfig;
use crate::scale::scale_value;

pub use overlay::{ContourLine, ContourRequest, ContourStyle, LineStyle, Marker};
pub use prep::{prep_images, prep_skymaps, GeoPolygon, MosaicData, MosaicSite, MosaicSiteData, MosaicSkymap};

/// Width of the elevation bands used to order polygons, degrees.
pub const ELEVATION_BAND_DEG: f64 = 0.1;

/// Frame to build a mosaic from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSelector {
    Index(usize),
    /// The nearest slot to this time; must lie within the prepared range.
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MinElevation {
    Uniform(f64),
    /// Per site UID. Sites not listed use [`ToolsConfig::min_elevation`].
    PerSite(HashMap<String, f64>),
}

/// Intensity range mapped onto `[0, display_top]` before valuing polygons.
#[derive(Debug, Clone, PartialEq)]
pub enum IntensityScaling {
    /// `[0, raw_scale_max]` or `[0, rayleighs_scale_max]` by data units.
    Default,
    Uniform(f64, f64),
    /// Per site UID. Sites not listed use the default range.
    PerSite(HashMap<String, (f64, f64)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataUnits {
    #[default]
    Raw,
    Rayleighs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MosaicOptions {
    pub min_elevation: MinElevation,
    pub scaling: IntensityScaling,
    pub units: DataUnits,
    pub config: ToolsConfig,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self::from_config(ToolsConfig::default())
    }
}

impl MosaicOptions {
    pub fn from_config(config: ToolsConfig) -> Self {
        Self {
            min_elevation: MinElevation::Uniform(config.min_elevation),
            scaling: IntensityScaling::Default,
            units: DataUnits::Raw,
            config,
        }
    }

    pub fn with_min_elevation(mut self, min_elevation: MinElevation) -> Self {
        self.min_elevation = min_elevation;
        self
    }

    pub fn with_scaling(mut self, scaling: IntensityScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_units(mut self, units: DataUnits) -> Self {
        self.units = units;
        self
    }

    fn min_elevation_for(&self, site_uid: &str) -> f64 {
        match &self.min_elevation {
            MinElevation::Uniform(v) => *v,
            MinElevation::PerSite(map) => map.get(site_uid).copied().unwrap_or(self.config.min_elevation),
        }
    }

    fn scale_range_for(&self, site_uid: &str) -> (f64, f64) {
        let default = (0.0, self.config.scale_max(self.units == DataUnits::Rayleighs));
        match &self.scaling {
            IntensityScaling::Default => default,
            IntensityScaling::Uniform(min, max) => (*min, *max),
            IntensityScaling::PerSite(map) => map.get(site_uid).copied().unwrap_or(default),
        }
    }

    fn validate(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| AsiError::invalid_parameter("config", e))?;
        let ranges: Vec<(f64, f64)> = match &self.scaling {
            IntensityScaling::Default => Vec::new(),
            IntensityScaling::Uniform(min, max) => vec![(*min, *max)],
            IntensityScaling::PerSite(map) => map.values().copied().collect(),
        };
        if ranges.iter().any(|(min, max)| !(min <= max)) {
            return Err(AsiError::invalid_bounds("intensity scaling requires min <= max"));
        }
        Ok(())
    }
}

/// Display value of one polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonValue {
    Mono(u8),
    Rgb([u8; 3]),
}

/// One pixel of one site, ready to fill.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicPolygon {
    /// Position of the site in [`Mosaic::site_uids`].
    pub site: usize,
    pub pixel: (usize, usize),
    pub elevation: f64,
    /// Closed ring of `(lat, lon)` vertices.
    pub geographic: GeoPolygon,
    /// The same ring in projection plane coordinates.
    pub projected: [(f64, f64); 5],
    pub value: PolygonValue,
}

/// A composited frame: polygons in drawing order plus any overlays.
pub struct Mosaic<'p> {
    pub timestamp: DateTime<Utc>,
    pub frame_index: usize,
    pub altitude_km: f64,
    /// Sites that contributed polygons, in input order.
    pub site_uids: Vec<String>,
    /// Polygons in drawing order; later entries are drawn over earlier ones.
    pub polygons: Vec<MosaicPolygon>,
    pub contours: Vec<ContourLine>,
    projection: &'p dyn MapProjection,
}

impl std::fmt::Debug for Mosaic<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mosaic")
            .field("timestamp", &self.timestamp)
            .field("frame_index", &self.frame_index)
            .field("altitude_km", &self.altitude_km)
            .field("site_uids", &self.site_uids)
            .field("polygons", &self.polygons.len())
            .field("contours", &self.contours.len())
            .field("projection", &self.projection.name())
            .finish()
    }
}

impl<'p> Mosaic<'p> {
    pub fn projection(&self) -> &'p dyn MapProjection {
        self.projection
    }

    /// Polygons contributed by the site with this UID.
    pub fn site_polygons<'a>(&'a self, site_uid: &str) -> impl Iterator<Item = &'a MosaicPolygon> + 'a {
        let site = self.site_uids.iter().position(|s| s == site_uid);
        self.polygons.iter().filter(move |p| Some(p.site) == site)
    }

    /// Build the mosaic for one frame.
    ///
    /// Every site in `data` must have prepared geometry of matching shape.
    /// Sites with no data in the frame (every value zero or NaN, as in a slot
    /// `prep_images` had nothing for) are left out. A NaN pixel inside an
    /// otherwise valid frame still gets its polygon, valued 0.
    pub fn create(
        data: &MosaicData,
        skymap: &MosaicSkymap,
        frame: FrameSelector,
        options: &MosaicOptions,
        projection: &'p dyn MapProjection,
    ) -> Result<Self> {
        options.validate()?;
        let frame_index = resolve_frame(&data.timestamps, frame)?;
        let top = options.config.display_top;

        struct Candidate {
            band: i64,
            site: usize,
            polygon: MosaicPolygon,
        }

        let mut site_uids = Vec::new();
        let mut candidates = Vec::new();
        let mut unprojectable = 0usize;
        for site_data in &data.sites {
            let uid = site_data.site_uid.as_str();
            let geometry = skymap.site(uid).ok_or_else(|| {
                AsiError::invalid_parameter(
                    "skymap",
                    format!("no prepared skymap for site '{}' (have {:?})", uid, skymap.site_uids()),
                )
            })?;
            if geometry.dim() != site_data.dim() {
                return Err(AsiError::shape_mismatch(
                    format!("site '{}' image vs skymap", uid),
                    geometry.dim(),
                    site_data.dim(),
                ));
            }

            let image = site_data.images.slice(s![.., .., .., frame_index]);
            if image.iter().all(|&v| v == 0.0 || v.is_nan()) {
                debug!(site = %uid, frame_index, "no usable data, skipping site");
                continue;
            }

            let channels = site_data.n_channels();
            if channels != 1 && channels != 3 {
                return Err(AsiError::shape_mismatch(
                    format!("site '{}' channels", uid),
                    "1 or 3",
                    channels,
                ));
            }

            let site_index = site_uids.len();
            site_uids.push(uid.to_string());
            let min_el = options.min_elevation_for(uid);
            let (lo, hi) = options.scale_range_for(uid);

            for ((r, c), &el) in geometry.elevation.indexed_iter() {
                if !(el >= min_el) {
                    continue;
                }
                let Some(geographic) = geometry.polygon(r, c).copied() else {
                    continue;
                };
                let Some(projected) = project_ring(projection, &geographic) else {
                    unprojectable += 1;
                    continue;
                };
                let pixel = image.slice(s![r, c, ..]);
                let scaled = |ch: usize| scale_value(pixel[ch], lo, hi, top) as u8;
                let value = if channels == 3 {
                    PolygonValue::Rgb([scaled(0), scaled(1), scaled(2)])
                } else {
                    PolygonValue::Mono(scaled(0))
                };
                candidates.push(Candidate {
                    band: ((el - min_el) / ELEVATION_BAND_DEG).floor() as i64,
                    site: site_index,
                    polygon: MosaicPolygon {
                        site: site_index,
                        pixel: (r, c),
                        elevation: el,
                        geographic,
                        projected,
                        value,
                    },
                });
            }
        }

        // stable: row-major order is kept within a (band, site) group
        candidates.sort_by_key(|c| (c.band, c.site));
        let polygons: Vec<MosaicPolygon> = candidates.into_iter().map(|c| c.polygon).collect();

        if unprojectable > 0 {
            debug!(unprojectable, projection = projection.name(), "dropped polygons outside projection");
        }
        info!(
            frame_index,
            sites = site_uids.len(),
            polygons = polygons.len(),
            altitude_km = skymap.altitude_km,
            "created mosaic"
        );

        Ok(Self {
            timestamp: data.timestamps[frame_index],
            frame_index,
            altitude_km: skymap.altitude_km,
            site_uids,
            polygons,
            contours: Vec::new(),
            projection,
        })
    }
}

fn resolve_frame(timestamps: &[DateTime<Utc>], frame: FrameSelector) -> Result<usize> {
    match frame {
        FrameSelector::Index(i) if i < timestamps.len() => Ok(i),
        FrameSelector::Index(i) => Err(AsiError::invalid_bounds(format!(
            "frame index {} is outside [0, {})",
            i,
            timestamps.len()
        ))),
        FrameSelector::Timestamp(ts) => {
            let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
                return Err(AsiError::invalid_bounds("mosaic data has no timestamps"));
            };
            if ts < first || ts > last {
                return Err(AsiError::invalid_bounds(format!(
                    "timestamp {} is outside the prepared range [{}, {}]",
                    ts, first, last
                )));
            }
            nearest_frame(timestamps, ts)
                .ok_or_else(|| AsiError::invalid_bounds(format!("no frame near {}", ts)))
        }
    }
}

fn project_ring(projection: &dyn MapProjection, ring: &GeoPolygon) -> Option<[(f64, f64); 5]> {
    let mut out = [(0.0, 0.0); 5];
    for (slot, &(lat, lon)) in out.iter_mut().zip(ring) {
        *slot = projection.project(lat, lon)?;
    }
    Some(out)
}

/// Count of pixels at or above `min_elevation` per prepared site.
pub fn eligible_pixels(skymap: &MosaicSkymap, min_elevation: f64) -> usize {
    skymap
        .sites
        .iter()
        .map(|s| s.elevation.iter().filter(|&&el| el >= min_elevation).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use asi_common::ImageStack;
    use projection::PlateCarree;
    use test_utils::{constant_stack, stack_from_fn, timestamps, SyntheticSkymap};

    fn two_sites() -> MosaicSkymap {
        let a = SyntheticSkymap::default().with_size(5, 5).with_site("aaaa", 56.0, -110.0);
        let b = SyntheticSkymap::default().with_size(5, 5).with_site("bbbb", 56.2, -109.8);
        prep_skymaps(&[a.build(), b.build()], 110.0).unwrap()
    }

    #[test]
    fn test_polygon_count_matches_eligible_pixels() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let s = constant_stack::<u16>(5, 5, 2, 1000);
        let data = prep_images(&[("aaaa", &s), ("bbbb", &s)]).unwrap();
        let options = MosaicOptions::default().with_min_elevation(MinElevation::Uniform(30.0));
        let mosaic = Mosaic::create(&data, &skymap, FrameSelector::Index(1), &options, &proj).unwrap();
        assert_eq!(mosaic.polygons.len(), eligible_pixels(&skymap, 30.0));
        assert!(mosaic.polygons.iter().all(|p| p.elevation >= 30.0));
        assert_eq!(mosaic.site_uids, vec!["aaaa", "bbbb"]);
    }

    #[test]
    fn test_draw_order_ascends_by_elevation_band() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let s = constant_stack::<u16>(5, 5, 1, 1000);
        let data = prep_images(&[("aaaa", &s), ("bbbb", &s)]).unwrap();
        let mosaic = Mosaic::create(
            &data,
            &skymap,
            FrameSelector::Index(0),
            &MosaicOptions::default(),
            &proj,
        )
        .unwrap();
        let bands: Vec<i64> = mosaic
            .polygons
            .iter()
            .map(|p| ((p.elevation - 5.0) / ELEVATION_BAND_DEG).floor() as i64)
            .collect();
        assert!(bands.windows(2).all(|w| w[0] <= w[1]));
        let last = mosaic.polygons.last().unwrap();
        assert_eq!(last.pixel, (2, 2));
        assert_eq!(last.site, 1);
    }

    #[test]
    fn test_blank_sites_are_skipped() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let lit = constant_stack::<u16>(5, 5, 1, 1000);
        let dark = constant_stack::<u16>(5, 5, 1, 0);
        let data = prep_images(&[("aaaa", &dark), ("bbbb", &lit)]).unwrap();
        let mosaic = Mosaic::create(
            &data,
            &skymap,
            FrameSelector::Index(0),
            &MosaicOptions::default(),
            &proj,
        )
        .unwrap();
        assert_eq!(mosaic.site_uids, vec!["bbbb"]);
        assert!(mosaic.polygons.iter().all(|p| p.site == 0));
    }

    #[test]
    fn test_nan_pixel_keeps_its_site() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let s = stack_from_fn::<f32>(5, 5, 1, 1, |r, c, _, _| if (r, c) == (0, 0) { f32::NAN } else { 1000.0 });
        let data = prep_images(&[("aaaa", &s)]).unwrap();
        let options = MosaicOptions::default().with_min_elevation(MinElevation::Uniform(0.0));
        let mosaic = Mosaic::create(&data, &skymap, FrameSelector::Index(0), &options, &proj).unwrap();

        assert_eq!(mosaic.site_uids, vec!["aaaa"]);
        assert_eq!(mosaic.polygons.len(), 25);
        let corner = mosaic.site_polygons("aaaa").find(|p| p.pixel == (0, 0)).unwrap();
        assert_eq!(corner.value, PolygonValue::Mono(0));
    }

    #[test]
    fn test_missing_slot_skips_site() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let full = constant_stack::<u16>(5, 5, 2, 1000);
        let ts = timestamps(2, 3);
        let partial = ImageStack::new(ndarray::Array4::from_elem((5, 5, 1, 1), 1000u16), vec![ts[0]]).unwrap();
        let data = prep_images(&[("aaaa", &full), ("bbbb", &partial)]).unwrap();
        let options = MosaicOptions::default().with_min_elevation(MinElevation::Uniform(30.0));

        let first = Mosaic::create(&data, &skymap, FrameSelector::Index(0), &options, &proj).unwrap();
        assert_eq!(first.site_uids, vec!["aaaa", "bbbb"]);
        let second = Mosaic::create(&data, &skymap, FrameSelector::Index(1), &options, &proj).unwrap();
        assert_eq!(second.site_uids, vec!["aaaa"]);
        assert_eq!(second.polygons.len() * 2, first.polygons.len());
    }

    #[test]
    fn test_values_use_scaling_mode() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let s = constant_stack::<u16>(5, 5, 1, 10_000);
        let data = prep_images(&[("aaaa", &s)]).unwrap();

        let raw = MosaicOptions::default();
        let m = Mosaic::create(&data, &skymap, FrameSelector::Index(0), &raw, &proj).unwrap();
        // 10000 / 20000 * 255 = 127.5 rounds half up
        assert_eq!(m.polygons[0].value, PolygonValue::Mono(128));

        let rayleighs = MosaicOptions::default().with_units(DataUnits::Rayleighs);
        let m = Mosaic::create(&data, &skymap, FrameSelector::Index(0), &rayleighs, &proj).unwrap();
        assert_eq!(m.polygons[0].value, PolygonValue::Mono(255));

        let mut per_site = HashMap::new();
        per_site.insert("aaaa".to_string(), (5_000.0, 15_000.0));
        let custom = MosaicOptions::default().with_scaling(IntensityScaling::PerSite(per_site));
        let m = Mosaic::create(&data, &skymap, FrameSelector::Index(0), &custom, &proj).unwrap();
        assert_eq!(m.polygons[0].value, PolygonValue::Mono(128));
    }

    #[test]
    fn test_rgb_values() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let s = stack_from_fn::<u8>(5, 5, 3, 1, |_, _, ch, _| [0u8, 100, 255][ch]);
        let data = prep_images(&[("aaaa", &s)]).unwrap();
        let options = MosaicOptions::default().with_scaling(IntensityScaling::Uniform(0.0, 255.0));
        let m = Mosaic::create(&data, &skymap, FrameSelector::Index(0), &options, &proj).unwrap();
        assert_eq!(m.polygons[0].value, PolygonValue::Rgb([0, 100, 255]));
    }

    #[test]
    fn test_frame_selection() {
        let skymap = two_sites();
        let s = constant_stack::<u16>(5, 5, 3, 1000);
        let data = prep_images(&[("aaaa", &s)]).unwrap();
        let ts = timestamps(3, 3);
        let options = MosaicOptions::default();
        let proj = PlateCarree::default();

        let m = Mosaic::create(&data, &skymap, FrameSelector::Timestamp(ts[2]), &options, &proj).unwrap();
        assert_eq!(m.frame_index, 2);

        let late = ts[2] + chrono::Duration::seconds(60);
        assert!(matches!(
            Mosaic::create(&data, &skymap, FrameSelector::Timestamp(late), &options, &proj),
            Err(AsiError::InvalidBounds(_))
        ));
        assert!(matches!(
            Mosaic::create(&data, &skymap, FrameSelector::Index(3), &options, &proj),
            Err(AsiError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_site_without_skymap_is_rejected() {
        let proj = PlateCarree::default();
        let skymap = two_sites();
        let s = constant_stack::<u16>(5, 5, 1, 1000);
        let data = prep_images(&[("zzzz", &s)]).unwrap();
        let err = Mosaic::create(
            &data,
            &skymap,
            FrameSelector::Index(0),
            &MosaicOptions::default(),
            &proj,
        )
        .unwrap_err();
        assert!(matches!(err, AsiError::InvalidParameter { .. }));
    }
}
