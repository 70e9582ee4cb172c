//! Image stacks: a block of frames plus one timestamp per frame.

use chrono::{DateTime, Utc};
use ndarray::{Array3, Array4, ArrayView3, Axis};
use num_traits::{AsPrimitive, Bounded};

use crate::error::{AsiError, Result};

/// Numeric pixel types accepted in an image stack.
///
/// Conversions go through `as`, so float to integer truncates toward zero
/// and saturates at the type bounds (NaN becomes 0).
pub trait Pixel: Copy + Default + Send + Sync + std::fmt::Debug + 'static {
    /// True for floating-point storage.
    const IS_FLOAT: bool;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;

    /// Largest representable value, as f64.
    fn max_value() -> f64;
}

macro_rules! impl_pixel {
    ($($t:ty => $float:expr),* $(,)?) => {
        $(
            impl Pixel for $t {
                const IS_FLOAT: bool = $float;

                #[inline]
                fn to_f64(self) -> f64 {
                    self.as_()
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value.as_()
                }

                #[inline]
                fn max_value() -> f64 {
                    <$t as Bounded>::max_value().as_()
                }
            }
        )*
    };
}

impl_pixel!(
    u8 => false,
    u16 => false,
    u32 => false,
    i16 => false,
    i32 => false,
    f32 => true,
    f64 => true,
);

/// An ordered stack of frames with a parallel sequence of timestamps.
///
/// Data is laid out as `[rows, cols, channels, frames]`. Single-channel
/// imagers use `channels == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack<T> {
    data: Array4<T>,
    timestamps: Vec<DateTime<Utc>>,
}

impl<T: Pixel> ImageStack<T> {
    /// Create a stack, checking that there is one timestamp per frame.
    pub fn new(data: Array4<T>, timestamps: Vec<DateTime<Utc>>) -> Result<Self> {
        let (rows, cols, channels, frames) = data.dim();
        if rows == 0 || cols == 0 || channels == 0 {
            return Err(AsiError::shape_mismatch(
                "image stack",
                "non-empty [rows, cols, channels]",
                (rows, cols, channels),
            ));
        }
        if frames != timestamps.len() {
            return Err(AsiError::shape_mismatch(
                "image stack frames vs timestamps",
                timestamps.len(),
                frames,
            ));
        }
        Ok(Self { data, timestamps })
    }

    /// Create a stack from single-channel `[rows, cols, frames]` data.
    pub fn from_mono(data: Array3<T>, timestamps: Vec<DateTime<Utc>>) -> Result<Self> {
        Self::new(data.insert_axis(Axis(2)), timestamps)
    }

    pub fn rows(&self) -> usize {
        self.data.dim().0
    }

    pub fn cols(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn n_frames(&self) -> usize {
        self.data.dim().3
    }

    /// Shape as `(rows, cols, channels, frames)`.
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array4<T> {
        &self.data
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// View of one frame as `[rows, cols, channels]`.
    ///
    /// Panics if `idx >= n_frames()`.
    pub fn frame(&self, idx: usize) -> ArrayView3<'_, T> {
        self.data.index_axis(Axis(3), idx)
    }

    /// A single sample widened to f64.
    #[inline]
    pub fn value(&self, row: usize, col: usize, channel: usize, frame: usize) -> f64 {
        self.data[[row, col, channel, frame]].to_f64()
    }

    /// Convert every sample to f64.
    pub fn to_f64(&self) -> ImageStack<f64> {
        ImageStack {
            data: self.data.mapv(Pixel::to_f64),
            timestamps: self.timestamps.clone(),
        }
    }

    pub fn into_parts(self) -> (Array4<T>, Vec<DateTime<Utc>>) {
        (self.data, self.timestamps)
    }
}
