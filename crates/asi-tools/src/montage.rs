//! Montages: frames laid out as a grid of thumbnails.

use asi_common::{AsiError, ImageStack, Pixel, Result};
use chrono::{DateTime, Utc};
use ndarray::{s, Array3, ArrayView3};

/// A sequence of frames destined for a thumbnail grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Montage<T> {
    stack: ImageStack<T>,
}

/// Grid layout of a montage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MontageGrid {
    pub n_rows: usize,
    pub n_cols: usize,
}

impl<T: Pixel> Montage<T> {
    pub fn create(stack: &ImageStack<T>) -> Self {
        Self { stack: stack.clone() }
    }

    pub fn len(&self) -> usize {
        self.stack.n_frames()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        self.stack.timestamps()
    }

    /// Layout for `n_cols` columns, `ceil(sqrt(n))` when not given.
    pub fn grid(&self, n_cols: Option<usize>) -> Result<MontageGrid> {
        let n = self.len();
        let n_cols = match n_cols {
            Some(0) => return Err(AsiError::invalid_parameter("n_cols", "must be > 0")),
            Some(c) => c,
            None => ((n as f64).sqrt().ceil() as usize).max(1),
        };
        Ok(MontageGrid {
            n_rows: n.div_ceil(n_cols),
            n_cols,
        })
    }

    /// Frame `i` as `(rows, cols, channels)`.
    pub fn tile(&self, i: usize) -> Result<ArrayView3<'_, T>> {
        if i >= self.len() {
            return Err(AsiError::invalid_bounds(format!(
                "tile {} is outside [0, {})",
                i,
                self.len()
            )));
        }
        Ok(self.stack.frame(i))
    }

    /// Tile every frame into one image of shape
    /// `(grid_rows * rows, grid_cols * cols, channels)`, row-major from the
    /// top left. Unused cells are NaN.
    pub fn assemble(&self, n_cols: Option<usize>) -> Result<Array3<f64>> {
        let grid = self.grid(n_cols)?;
        let (rows, cols, channels, frames) = self.stack.dim();
        let mut out = Array3::from_elem((grid.n_rows * rows, grid.n_cols * cols, channels), f64::NAN);
        for i in 0..frames {
            let (gr, gc) = (i / grid.n_cols, i % grid.n_cols);
            let frame = self.stack.frame(i);
            out.slice_mut(s![gr * rows..(gr + 1) * rows, gc * cols..(gc + 1) * cols, ..])
                .assign(&frame.mapv(|v| v.to_f64()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::indexed_stack;

    #[test]
    fn test_default_grid_is_square_ish() {
        let montage = Montage::create(&indexed_stack(2, 2, 1, 5));
        assert_eq!(montage.grid(None).unwrap(), MontageGrid { n_rows: 2, n_cols: 3 });
        assert_eq!(montage.grid(Some(5)).unwrap(), MontageGrid { n_rows: 1, n_cols: 5 });
        assert!(montage.grid(Some(0)).is_err());
    }

    #[test]
    fn test_assemble_pads_with_nan() {
        let montage = Montage::create(&indexed_stack(2, 3, 1, 3));
        let out = montage.assemble(Some(2)).unwrap();
        assert_eq!(out.dim(), (4, 6, 1));
        assert_eq!(out[[0, 0, 0]], 0.0);
        assert_eq!(out[[1, 5, 0]], 1_001_002.0);
        assert_eq!(out[[2, 0, 0]], 2_000_000.0);
        assert!(out[[3, 5, 0]].is_nan());
    }

    #[test]
    fn test_tile_out_of_range() {
        let montage = Montage::create(&indexed_stack(2, 2, 1, 2));
        assert!(matches!(montage.tile(2), Err(AsiError::InvalidBounds(_))));
        assert_eq!(montage.tile(1).unwrap()[[1, 1, 0]], 1_001_001.0);
    }
}
