//! Skymap geometry for all-sky imagers.
//!
//! A skymap is the per-site optical calibration table: elevation and azimuth
//! for every CCD pixel, plus the geographic position of every pixel corner at
//! a small set of precomputed emission altitudes.
//!
//! # Architecture
//!
//! ```text
//! Skymap (immutable, one per site + epoch)
//!      │
//!      ├─► elevation / azimuth        [rows, cols]
//!      │
//!      └─► resolve_altitude(km) ──► CornerGrid (borrowed lat/lon slice)
//!                                        │
//!                                        ├─► representative_point(row, col)
//!                                        │
//!                                        └─► CornerIndex (grid buckets)
//!                                                 │
//!                                                 ▼
//!                                        nearest corner ──► corner_to_pixel
//! ```
//!
//! [`SiteLocation::fov_ring`] traces the edge of a site's field of view at a
//! given emission height.
//!
//! Magnetic coordinates are never computed here. Callers inject a
//! [`MagneticTransform`] wherever a conversion is needed.

pub mod calibration;
pub mod corners;
pub mod fov;
pub mod geometry;
pub mod index;
pub mod magnetic;

pub use calibration::{Calibration, CalibrationData};
pub use corners::{corner_to_pixel, haversine_m, CornerGrid, EARTH_RADIUS_M};
pub use fov::{FOV_HEIGHT_RANGE_KM, FOV_RING_POINTS};
pub use geometry::{SiteLocation, Skymap, ALTITUDE_TOLERANCE_KM};
pub use index::CornerIndex;
pub use magnetic::MagneticTransform;
