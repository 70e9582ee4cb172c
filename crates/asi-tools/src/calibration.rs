//! Per-pixel calibration chain: dark frame, flatfield, Rayleighs.
//!
//! Frames are independent, so the chain runs frame-parallel on rayon and
//! reassembles results by frame index.

use asi_common::{AsiError, ImageStack, Instrument, Pixel, Result};
use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use rayon::prelude::*;
use skymap::Calibration;
use tracing::debug;

use crate::config::ToolsConfig;

/// Default side of the dark-frame corner block.
pub const DEFAULT_DARK_BOX_SIZE: usize = 5;

/// Which calibration steps to apply, and with what inputs.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationOptions<'a> {
    pub instrument: Instrument,
    pub dark_frame: bool,
    pub dark_box_size: usize,
    pub flatfield: bool,
    pub cal_flatfield: Option<&'a Calibration>,
    pub rayleighs: bool,
    pub cal_rayleighs: Option<&'a Calibration>,
    /// Exposure length in seconds; defaults to the instrument's nominal one.
    pub exposure_s: Option<f64>,
}

impl<'a> CalibrationOptions<'a> {
    /// All steps enabled, as for a fully calibrated product.
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            dark_frame: true,
            dark_box_size: DEFAULT_DARK_BOX_SIZE,
            flatfield: true,
            cal_flatfield: None,
            rayleighs: true,
            cal_rayleighs: None,
            exposure_s: None,
        }
    }

    /// All steps enabled, with the dark block size and exposure taken from
    /// `config`.
    pub fn from_config(instrument: Instrument, config: &ToolsConfig) -> Self {
        Self {
            dark_box_size: config.dark_box_size,
            exposure_s: config.exposure_seconds(instrument),
            ..Self::new(instrument)
        }
    }

    /// No steps enabled.
    pub fn none(instrument: Instrument) -> Self {
        Self {
            dark_frame: false,
            flatfield: false,
            rayleighs: false,
            ..Self::new(instrument)
        }
    }

    pub fn with_flatfield(mut self, cal: &'a Calibration) -> Self {
        self.flatfield = true;
        self.cal_flatfield = Some(cal);
        self
    }

    pub fn with_rayleighs(mut self, cal: &'a Calibration) -> Self {
        self.rayleighs = true;
        self.cal_rayleighs = Some(cal);
        self
    }

    pub fn with_exposure(mut self, seconds: f64) -> Self {
        self.exposure_s = Some(seconds);
        self
    }
}

/// Output of the calibration chain.
///
/// Integer storage is kept unless Rayleighs scaling ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Calibrated<T> {
    Counts(ImageStack<T>),
    Rayleighs(ImageStack<f64>),
}

impl<T: Pixel> Calibrated<T> {
    pub fn is_rayleighs(&self) -> bool {
        matches!(self, Calibrated::Rayleighs(_))
    }

    /// Values as f64 regardless of storage.
    pub fn to_f64(&self) -> ImageStack<f64> {
        match self {
            Calibrated::Counts(s) => s.to_f64(),
            Calibrated::Rayleighs(s) => s.clone(),
        }
    }
}

/// Resolved inputs for one run of the chain.
struct Plan<'a> {
    dark_box: Option<usize>,
    flatfield: Option<&'a Array2<f64>>,
    rayleighs_scale: Option<f64>,
}

fn plan<'a>(opts: &CalibrationOptions<'a>, dim: (usize, usize)) -> Result<Plan<'a>> {
    let dark_box = if opts.dark_frame {
        if opts.dark_box_size == 0 {
            return Err(AsiError::invalid_parameter("dark_box_size", "must be > 0"));
        }
        Some(opts.dark_box_size.min(dim.0).min(dim.1))
    } else {
        None
    };

    let flatfield = if opts.flatfield {
        let multiplier = opts
            .cal_flatfield
            .and_then(Calibration::flatfield_multiplier)
            .ok_or_else(|| AsiError::missing_calibration("flatfield", "flatfield_multiplier"))?;
        if multiplier.dim() != dim {
            return Err(AsiError::shape_mismatch("flatfield multiplier vs image", dim, multiplier.dim()));
        }
        Some(multiplier)
    } else {
        None
    };

    let rayleighs_scale = if opts.rayleighs {
        let per_dn = opts
            .cal_rayleighs
            .and_then(Calibration::rayleighs_per_dn_per_second)
            .ok_or_else(|| AsiError::missing_calibration("rayleighs", "rayleighs_per_dn_per_second"))?;
        let exposure = opts
            .exposure_s
            .or_else(|| opts.instrument.default_exposure_seconds())
            .ok_or_else(|| AsiError::missing_calibration("rayleighs", "exposure_length_seconds"))?;
        if !(exposure > 0.0) {
            return Err(AsiError::invalid_parameter("exposure_s", "must be > 0"));
        }
        Some(per_dn / exposure)
    } else {
        None
    };

    Ok(Plan {
        dark_box,
        flatfield,
        rayleighs_scale,
    })
}

/// Run the enabled steps over every frame of `stack`.
///
/// All inputs are validated before any frame is touched.
pub fn calibrate<T: Pixel>(stack: &ImageStack<T>, opts: &CalibrationOptions<'_>) -> Result<Calibrated<T>> {
    let (rows, cols, _, frames) = stack.dim();
    let plan = plan(opts, (rows, cols))?;

    let calibrated: Vec<Array3<f64>> = (0..frames)
        .into_par_iter()
        .map(|f| calibrate_frame::<T>(stack.frame(f), &plan))
        .collect();
    let views: Vec<ArrayView3<'_, f64>> = calibrated.iter().map(|a| a.view()).collect();
    let data = ndarray::stack(Axis(3), &views)
        .map_err(|e| AsiError::shape_mismatch("calibrated frames", (rows, cols), e.to_string()))?;

    debug!(
        instrument = %opts.instrument,
        frames,
        dark = plan.dark_box.is_some(),
        flatfield = plan.flatfield.is_some(),
        rayleighs = plan.rayleighs_scale.is_some(),
        "calibrated image stack"
    );

    let timestamps = stack.timestamps().to_vec();
    if plan.rayleighs_scale.is_some() {
        Ok(Calibrated::Rayleighs(ImageStack::new(data, timestamps)?))
    } else {
        Ok(Calibrated::Counts(ImageStack::new(data.mapv(T::from_f64), timestamps)?))
    }
}

/// One frame through the chain. Until Rayleighs scaling, each step rounds
/// back through the storage type so integer data truncates as it would
/// in place.
fn calibrate_frame<T: Pixel>(frame: ArrayView3<'_, T>, plan: &Plan<'_>) -> Array3<f64> {
    let mut out = frame.mapv(|v| v.to_f64());
    let channels = out.len_of(Axis(2));

    if let Some(size) = plan.dark_box {
        for ch in 0..channels {
            let block = out.slice(s![..size, ..size, ch]);
            let mean = block.sum() / block.len() as f64;
            let dark = mean.trunc();
            out.slice_mut(s![.., .., ch])
                .mapv_inplace(|v| T::from_f64((v - dark).max(0.0)).to_f64());
        }
    }

    if let Some(multiplier) = plan.flatfield {
        for ch in 0..channels {
            let mut plane = out.slice_mut(s![.., .., ch]);
            plane.zip_mut_with(multiplier, |v, &m| *v = T::from_f64(*v * m).to_f64());
        }
    }

    if let Some(scale) = plan.rayleighs_scale {
        out.mapv_inplace(|v| v * scale);
    }
    out
}
