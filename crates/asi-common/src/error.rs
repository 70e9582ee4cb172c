//! Error types for skymap geometry and derived products.

use thiserror::Error;

/// Result type alias using AsiError.
pub type Result<T> = std::result::Result<T, AsiError>;

/// Errors raised by the geometry engine.
///
/// Every variant is raised at the point of detection, before any output is
/// produced. Nothing here is transient, so callers should not retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AsiError {
    /// The requested altitude is not one of the skymap's precomputed altitudes.
    #[error("altitude {requested_km} km is not supported by this skymap, valid altitudes (km): {valid_km:?}")]
    UnsupportedAltitude { requested_km: f64, valid_km: Vec<f64> },

    /// A mask, contour or path selected zero pixels.
    #[error("empty region: {0}")]
    EmptyRegion(String),

    /// Malformed or inverted numeric range.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// A calibration step was requested without the data it needs.
    #[error("missing calibration input for {step}: {field} is required")]
    MissingCalibrationInput { step: String, field: String },

    /// Array, stack or timestamp dimensions disagree.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

impl AsiError {
    /// Create an UnsupportedAltitude error.
    pub fn unsupported_altitude(requested_km: f64, valid_km: &[f64]) -> Self {
        Self::UnsupportedAltitude {
            requested_km,
            valid_km: valid_km.to_vec(),
        }
    }

    /// Create an EmptyRegion error.
    pub fn empty_region(msg: impl Into<String>) -> Self {
        Self::EmptyRegion(msg.into())
    }

    /// Create an InvalidBounds error.
    pub fn invalid_bounds(msg: impl Into<String>) -> Self {
        Self::InvalidBounds(msg.into())
    }

    /// Create a MissingCalibrationInput error.
    pub fn missing_calibration(step: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingCalibrationInput {
            step: step.into(),
            field: field.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(
        context: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedAltitude { .. } => "UnsupportedAltitude",
            Self::EmptyRegion(_) => "EmptyRegion",
            Self::InvalidBounds(_) => "InvalidBounds",
            Self::MissingCalibrationInput { .. } => "MissingCalibrationInput",
            Self::ShapeMismatch { .. } => "ShapeMismatch",
            Self::InvalidParameter { .. } => "InvalidParameter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_altitude_lists_valid_options() {
        let err = AsiError::unsupported_altitude(100.0, &[90.0, 110.0, 150.0]);
        let msg = err.to_string();
        assert!(msg.contains("100"), "message should name the request: {}", msg);
        assert!(msg.contains("[90.0, 110.0, 150.0]"), "message should list options: {}", msg);
        assert_eq!(err.code(), "UnsupportedAltitude");
    }

    #[test]
    fn test_shape_mismatch_formats_both_sides() {
        let err = AsiError::shape_mismatch("image stack", (3, 3, 1, 2), (3, 3, 1, 4));
        assert_eq!(
            err.to_string(),
            "shape mismatch in image stack: expected (3, 3, 1, 2), got (3, 3, 1, 4)"
        );
    }

    #[test]
    fn test_missing_calibration_message() {
        let err = AsiError::missing_calibration("rayleighs", "rayleighs_per_dn_per_second");
        assert!(err.to_string().contains("rayleighs_per_dn_per_second"));
        assert_eq!(err.code(), "MissingCalibrationInput");
    }
}
