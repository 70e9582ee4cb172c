//! Linear intensity scaling into a fixed display range.

use asi_common::{AsiError, ImageStack, Pixel, Result};
use ndarray::Axis;

/// Map `value` from `[min, max]` onto `[0, top]`, clipping and rounding.
///
/// An empty range (`min == max`) is treated as a width of one.
#[inline]
pub fn scale_value(value: f64, min: f64, max: f64, top: f64) -> f64 {
    let width = if max == min { 1.0 } else { max - min };
    (((value - min) * top / width).clamp(0.0, top) + 0.5).floor()
}

/// Rescale every frame of `stack` into `[0, top]`.
///
/// `min` and `max` default to each frame's own extremes. `top` defaults to
/// the largest value of the pixel type and is required for float stacks.
pub fn scale_intensity<T: Pixel>(
    stack: &ImageStack<T>,
    min: Option<f64>,
    max: Option<f64>,
    top: Option<f64>,
) -> Result<ImageStack<T>> {
    let top = match (top, T::IS_FLOAT) {
        (Some(t), false) if t > T::max_value() => {
            return Err(AsiError::invalid_parameter(
                "top",
                format!("{} exceeds the pixel type maximum {}", t, T::max_value()),
            ))
        }
        (Some(t), _) => t,
        (None, false) => T::max_value(),
        (None, true) => {
            return Err(AsiError::invalid_parameter(
                "top",
                "must be specified when scaling floating-point data",
            ))
        }
    };
    if let (Some(lo), Some(hi)) = (min, max) {
        if hi < lo {
            return Err(AsiError::invalid_bounds(format!(
                "scale max {} is smaller than min {}",
                hi, lo
            )));
        }
    }

    let mut data = stack.data().clone();
    for mut frame in data.axis_iter_mut(Axis(3)) {
        let lo = min.unwrap_or_else(|| frame.iter().map(|v| v.to_f64()).fold(f64::INFINITY, f64::min));
        let hi = max.unwrap_or_else(|| frame.iter().map(|v| v.to_f64()).fold(f64::NEG_INFINITY, f64::max));
        if hi < lo {
            return Err(AsiError::invalid_bounds(format!(
                "scale max {} is smaller than min {}",
                hi, lo
            )));
        }
        frame.mapv_inplace(|v| T::from_f64(scale_value(v.to_f64(), lo, hi, top)));
    }

    ImageStack::new(data, stack.timestamps().to_vec())
}
