//! Detector calibration records.

use asi_common::Instrument;
use ndarray::Array2;

/// The payload of a calibration file: either a flatfield or a radiometric
/// scale, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationData {
    /// Per-pixel dimensionless multiplier.
    Flatfield(Array2<f64>),
    /// Rayleighs per digital number per second of exposure.
    Rayleighs(f64),
}

/// A calibration record for one detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub detector_uid: String,
    pub instrument: Instrument,
    pub data: CalibrationData,
}

impl Calibration {
    pub fn flatfield(detector_uid: impl Into<String>, instrument: Instrument, multiplier: Array2<f64>) -> Self {
        Self {
            detector_uid: detector_uid.into(),
            instrument,
            data: CalibrationData::Flatfield(multiplier),
        }
    }

    pub fn rayleighs(detector_uid: impl Into<String>, instrument: Instrument, per_dn_per_second: f64) -> Self {
        Self {
            detector_uid: detector_uid.into(),
            instrument,
            data: CalibrationData::Rayleighs(per_dn_per_second),
        }
    }

    pub fn flatfield_multiplier(&self) -> Option<&Array2<f64>> {
        match &self.data {
            CalibrationData::Flatfield(m) => Some(m),
            CalibrationData::Rayleighs(_) => None,
        }
    }

    pub fn rayleighs_per_dn_per_second(&self) -> Option<f64> {
        match self.data {
            CalibrationData::Rayleighs(r) => Some(r),
            CalibrationData::Flatfield(_) => None,
        }
    }
}
