//! One-off preparation of mosaic geometry and image data.
//!
//! Skymap geometry is time-invariant, so polygons are built once per
//! altitude and reused for every frame. Image data from all sites is
//! aligned onto a single regular timestamp grid.

use std::collections::HashSet;

use asi_common::{determine_cadence, expected_timestamps, find_frame, AsiError, ImageStack, Pixel, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array2, Array4, Axis};
use rayon::prelude::*;
use skymap::Skymap;
use tracing::{debug, info, warn};

/// A closed pixel outline: four corners `(lat, lon)` plus the first again.
pub type GeoPolygon = [(f64, f64); 5];

/// Prepared geometry for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSite {
    pub site_uid: String,
    pub elevation: Array2<f64>,
    /// One polygon per pixel in row-major order; `None` where a corner is NaN.
    pub polygons: Vec<Option<GeoPolygon>>,
}

impl MosaicSite {
    pub fn dim(&self) -> (usize, usize) {
        self.elevation.dim()
    }

    pub fn polygon(&self, row: usize, col: usize) -> Option<&GeoPolygon> {
        let (_, cols) = self.dim();
        self.polygons.get(row * cols + col).and_then(Option::as_ref)
    }
}

/// Prepared geometry for every site at one altitude.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSkymap {
    pub altitude_km: f64,
    pub sites: Vec<MosaicSite>,
}

impl MosaicSkymap {
    pub fn site(&self, site_uid: &str) -> Option<&MosaicSite> {
        self.sites.iter().find(|s| s.site_uid == site_uid)
    }

    pub fn site_uids(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.site_uid.as_str()).collect()
    }
}

/// Build per-site pixel polygons at `altitude_km`.
///
/// Every skymap must carry the altitude. Sites are prepared in parallel and
/// returned in input order.
pub fn prep_skymaps(skymaps: &[Skymap], altitude_km: f64) -> Result<MosaicSkymap> {
    if skymaps.is_empty() {
        return Err(AsiError::invalid_parameter("skymaps", "at least one skymap is required"));
    }
    for skymap in skymaps {
        skymap.resolve_altitude(altitude_km)?;
    }

    let sites: Vec<MosaicSite> = skymaps
        .par_iter()
        .map(|skymap| prep_site(skymap, altitude_km))
        .collect::<Result<Vec<_>>>()?;

    for site in &sites {
        debug!(
            site = %site.site_uid,
            polygons = site.polygons.iter().flatten().count(),
            "prepared site geometry"
        );
    }
    info!(sites = sites.len(), altitude_km, "prepared mosaic skymaps");
    Ok(MosaicSkymap { altitude_km, sites })
}

fn prep_site(skymap: &Skymap, altitude_km: f64) -> Result<MosaicSite> {
    let grid = skymap.corner_grid(altitude_km)?;
    let (rows, cols) = skymap.dim();

    let mut polygons = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let corners = [(r, c), (r, c + 1), (r + 1, c + 1), (r + 1, c), (r, c)];
            let polygon = corners.map(|(i, j)| (grid.lat(i, j), grid.lon(i, j)));
            let valid = polygon.iter().all(|(lat, lon)| lat.is_finite() && lon.is_finite());
            polygons.push(valid.then_some(polygon));
        }
    }

    Ok(MosaicSite {
        site_uid: skymap.site_uid().to_string(),
        elevation: skymap.elevation().clone(),
        polygons,
    })
}

/// Image data for one site on the shared timestamp grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSiteData {
    pub site_uid: String,
    /// `[rows, cols, channels, slots]`; NaN where the site has no frame.
    pub images: Array4<f64>,
}

impl MosaicSiteData {
    pub fn dim(&self) -> (usize, usize) {
        (self.images.len_of(Axis(0)), self.images.len_of(Axis(1)))
    }

    pub fn n_channels(&self) -> usize {
        self.images.len_of(Axis(2))
    }
}

/// Image data for every site, aligned to one timestamp grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicData {
    pub timestamps: Vec<DateTime<Utc>>,
    pub sites: Vec<MosaicSiteData>,
}

impl MosaicData {
    pub fn site_uids(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.site_uid.as_str()).collect()
    }
}

/// Align each site's frames to a common regular timestamp grid.
///
/// The grid runs from the earliest to the latest timestamp over all sites,
/// at the cadence of the first site that has one. Frames are matched at
/// whole-second precision; slots with no matching frame are NaN. A site
/// UID seen twice keeps its first occurrence.
pub fn prep_images<T: Pixel>(sites: &[(&str, &ImageStack<T>)]) -> Result<MosaicData> {
    let (Some(start), Some(end)) = (
        sites.iter().filter_map(|(_, s)| s.timestamps().first().copied()).min(),
        sites.iter().filter_map(|(_, s)| s.timestamps().last().copied()).max(),
    ) else {
        return Err(AsiError::invalid_parameter("sites", "at least one image stack is required"));
    };
    let cadence = sites
        .iter()
        .find_map(|(_, s)| determine_cadence(s.timestamps()))
        .unwrap_or(0);
    let timestamps = expected_timestamps(start, end, cadence);

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(sites.len());
    for (uid, stack) in sites {
        if !seen.insert(*uid) {
            warn!(site = %uid, "duplicate site in mosaic image data, omitting later occurrence");
            continue;
        }

        let (rows, cols, channels, _) = stack.dim();
        let mut images = Array4::from_elem((rows, cols, channels, timestamps.len()), f64::NAN);
        let mut matched = 0usize;
        for (slot, &ts) in timestamps.iter().enumerate() {
            if let Some(idx) = find_frame(stack.timestamps(), ts) {
                images
                    .index_axis_mut(Axis(3), slot)
                    .assign(&stack.frame(idx).mapv(|v| v.to_f64()));
                matched += 1;
            }
        }
        debug!(site = %uid, matched, slots = timestamps.len(), "aligned site images");
        out.push(MosaicSiteData {
            site_uid: uid.to_string(),
            images,
        });
    }

    info!(sites = out.len(), slots = timestamps.len(), cadence, "prepared mosaic images");
    Ok(MosaicData { timestamps, sites: out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_coords_approx_eq, constant_stack, timestamps, SyntheticSkymap};

    #[test]
    fn test_polygons_are_closed_and_ordered() {
        let gen = SyntheticSkymap::default().with_size(3, 4);
        let prepped = prep_skymaps(&[gen.build()], 110.0).unwrap();
        let site = &prepped.sites[0];
        assert_eq!(site.polygons.len(), 12);

        let poly = site.polygon(1, 2).unwrap();
        assert_eq!(poly[0], poly[4]);
        assert_eq!(poly[0], (gen.corner_lat(110.0, 1), gen.corner_lon(110.0, 2)));
        assert_coords_approx_eq!(poly[2], (gen.corner_lat(110.0, 2), gen.corner_lon(110.0, 3)), 1e-12);
    }

    #[test]
    fn test_prep_skymaps_requires_altitude_everywhere() {
        let a = SyntheticSkymap::default().build();
        let mut b = SyntheticSkymap::default().with_site("other", 60.0, -100.0);
        b.altitudes_km = vec![90.0, 150.0];
        let err = prep_skymaps(&[a, b.build()], 110.0).unwrap_err();
        assert!(matches!(err, AsiError::UnsupportedAltitude { .. }));
    }

    #[test]
    fn test_prep_images_drops_duplicate_sites() {
        let s1 = constant_stack::<u16>(2, 2, 3, 10);
        let s2 = constant_stack::<u16>(2, 2, 3, 20);
        let data = prep_images(&[("gill", &s1), ("gill", &s2)]).unwrap();
        assert_eq!(data.site_uids(), vec!["gill"]);
        assert_eq!(data.sites[0].images[[0, 0, 0, 0]], 10.0);
    }

    #[test]
    fn test_prep_images_fills_missing_with_nan() {
        let full = constant_stack::<u16>(2, 2, 4, 7);
        let ts = timestamps(4, 3);
        let gappy = ImageStack::new(
            Array4::from_elem((2, 2, 1, 2), 9u16),
            vec![ts[0], ts[3]],
        )
        .unwrap();
        let data = prep_images(&[("a", &full), ("b", &gappy)]).unwrap();
        assert_eq!(data.timestamps, ts);
        let b = &data.sites[1].images;
        assert_eq!(b[[0, 0, 0, 0]], 9.0);
        assert!(b[[0, 0, 0, 1]].is_nan());
        assert!(b[[0, 0, 0, 2]].is_nan());
        assert_eq!(b[[0, 0, 0, 3]], 9.0);
    }
}
