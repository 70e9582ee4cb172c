//! Configuration for the ASI tools.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use asi_common::Instrument;
use serde::{Deserialize, Serialize};

/// Tunables shared by the mosaic, contour and calibration operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Minimum elevation (degrees) for a pixel to appear in a mosaic.
    pub min_elevation: f64,

    /// Drop contour points on the image boundary.
    pub remove_edge_cases: bool,

    /// Side length of the dark-frame corner block, in pixels.
    pub dark_box_size: usize,

    /// Upper scaling bound for raw digital-number mosaics.
    pub raw_scale_max: f64,

    /// Upper scaling bound for Rayleighs-calibrated mosaics.
    pub rayleighs_scale_max: f64,

    /// Top of the display range intensities are scaled into.
    pub display_top: f64,

    /// Exposure length overrides in seconds, per instrument.
    pub exposure_overrides: HashMap<Instrument, f64>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            min_elevation: 5.0,
            remove_edge_cases: true,
            dark_box_size: 5,
            raw_scale_max: 20000.0,
            rayleighs_scale_max: 5000.0,
            display_top: 255.0,
            exposure_overrides: HashMap::new(),
        }
    }
}

impl ToolsConfig {
    /// Load configuration from `ASI_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ASI_MIN_ELEVATION") {
            if let Ok(v) = val.parse() {
                config.min_elevation = v;
            }
        }

        if let Ok(val) = std::env::var("ASI_REMOVE_EDGE_CASES") {
            config.remove_edge_cases = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("ASI_DARK_BOX_SIZE") {
            if let Ok(v) = val.parse() {
                config.dark_box_size = v;
            }
        }

        if let Ok(val) = std::env::var("ASI_RAW_SCALE_MAX") {
            if let Ok(v) = val.parse() {
                config.raw_scale_max = v;
            }
        }

        if let Ok(val) = std::env::var("ASI_RAYLEIGHS_SCALE_MAX") {
            if let Ok(v) = val.parse() {
                config.rayleighs_scale_max = v;
            }
        }

        if let Ok(val) = std::env::var("ASI_DISPLAY_TOP") {
            if let Ok(v) = val.parse() {
                config.display_top = v;
            }
        }

        config
    }

    /// Parse a YAML document; missing fields take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse ASI tools config YAML")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read ASI tools config from {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid ASI tools config in {:?}", path.as_ref()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=90.0).contains(&self.min_elevation) {
            return Err("min_elevation must be within [0, 90]".to_string());
        }

        if self.dark_box_size == 0 {
            return Err("dark_box_size must be > 0".to_string());
        }

        if self.raw_scale_max <= 0.0 || self.rayleighs_scale_max <= 0.0 {
            return Err("scale maxima must be > 0".to_string());
        }

        if self.display_top <= 0.0 || self.display_top > 255.0 {
            return Err("display_top must be within (0, 255]".to_string());
        }

        if let Some((instrument, _)) = self.exposure_overrides.iter().find(|&(_, &s)| !(s > 0.0)) {
            return Err(format!("exposure override for {} must be > 0", instrument));
        }

        Ok(())
    }

    /// Exposure length for `instrument`: the override if set, otherwise the
    /// instrument's nominal exposure.
    pub fn exposure_seconds(&self, instrument: Instrument) -> Option<f64> {
        self.exposure_overrides
            .get(&instrument)
            .copied()
            .or_else(|| instrument.default_exposure_seconds())
    }

    /// Scaling upper bound for mosaics of the given units.
    pub fn scale_max(&self, rayleighs: bool) -> f64 {
        if rayleighs {
            self.rayleighs_scale_max
        } else {
            self.raw_scale_max
        }
    }
}
