//! Derived data products for all-sky imager (ASI) data.
//!
//! # Architecture
//!
//! ```text
//!  raw ImageStack ──calibrate──▶ calibrated ImageStack
//!                                      │
//!          ┌───────────────┬───────────┼───────────────┬──────────────┐
//!          ▼               ▼           ▼               ▼              ▼
//!       Keogram         Montage   extract_metric   prep_images   scale_intensity
//!          │                           │               │
//!          │   Skymap ──┬──────────────┘               ▼
//!          │            │                        Mosaic::create ◀── prep_skymaps
//!          └────────────┴──▶ contour::{elevation, azimuth, geo, mag}
//! ```
//!
//! Everything here is synchronous and in-memory. Work that splits cleanly
//! across sites or frames runs on rayon and is reassembled by index.

pub mod calibration;
pub mod config;
pub mod contour;
pub mod keogram;
pub mod metric;
pub mod montage;
pub mod mosaic;
pub mod scale;

pub use calibration::{calibrate, Calibrated, CalibrationOptions};
pub use config::ToolsConfig;
pub use contour::{ContourOptions, ContourResult, LatLonRequest};
pub use keogram::{Keogram, KeogramAxis, KeogramPath};
pub use metric::{extract_metric, extract_metric_single, Metric, RegionBounds};
pub use montage::{Montage, MontageGrid};
pub use mosaic::{
    prep_images, prep_skymaps, ContourRequest, ContourStyle, DataUnits, FrameSelector, IntensityScaling, MinElevation,
    Mosaic, MosaicData, MosaicOptions, MosaicPolygon, MosaicSkymap, PolygonValue,
};
pub use scale::{scale_intensity, scale_value};
