//! Common types and utilities shared across the all-sky imager (ASI) crates.
//!
//! Everything in here is geometry-agnostic: the error taxonomy, image stacks
//! with their timestamps, lon/lat bounding boxes, instrument identifiers and
//! cadence helpers used when aligning frames from several sites.

pub mod bbox;
pub mod error;
pub mod instrument;
pub mod stack;
pub mod time;

pub use bbox::LonLatBounds;
pub use error::{AsiError, Result};
pub use instrument::Instrument;
pub use stack::{ImageStack, Pixel};
pub use time::{determine_cadence, expected_timestamps, find_frame, nearest_frame};
