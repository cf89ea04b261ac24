use crate::error::{LayoutError, Result};
use crate::layout::{padded_stride, BankConfig};

/// A row-major 2-D matrix backed by a flat buffer.
///
/// The buffer holds `rows * stride` elements, where `stride >= cols` is the
/// padded row length. Elements beyond the logical width are padding and are
/// never read by tile views. Element `(r, c)` lives at `r * stride + c`.
#[derive(Debug, Clone)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<T: Copy + Default> Matrix<T> {
    /// Create a zero-filled matrix with no padding (`stride == cols`).
    pub fn new(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![T::default(); rows * cols],
            rows,
            cols,
            stride: cols,
        }
    }

    /// Create a zero-filled matrix with an explicit padded stride.
    ///
    /// # Errors
    /// Returns `LayoutError::StrideTooSmall` if `stride < cols`.
    pub fn with_stride(rows: usize, cols: usize, stride: usize) -> Result<Self> {
        if stride < cols {
            return Err(LayoutError::StrideTooSmall { stride, cols });
        }
        Ok(Matrix {
            data: vec![T::default(); rows * stride],
            rows,
            cols,
            stride,
        })
    }

    /// Create a zero-filled matrix whose stride is chosen by the padding
    /// planner for the given bank configuration.
    pub fn banked(rows: usize, cols: usize, banks: &BankConfig) -> Result<Self> {
        let stride = padded_stride(cols, std::mem::size_of::<T>(), banks)?;
        Matrix::with_stride(rows, cols, stride)
    }

    /// Create an unpadded matrix with each element produced by `f(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Matrix::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, f(r, c));
            }
        }
        m
    }
}

impl<T: Copy> Matrix<T> {
    /// Number of logical rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Logical row width, excluding padding.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Padded row length in elements.
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    fn idx(&self, r: usize, c: usize) -> usize {
        r * self.stride + c
    }

    /// Returns element `(r, c)`.
    ///
    /// # Panics
    /// Panics if `r >= rows()` or `c >= cols()`.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> T {
        assert!(r < self.rows && c < self.cols);
        self.data[self.idx(r, c)]
    }

    /// Sets element `(r, c)`.
    ///
    /// # Panics
    /// Panics if `r >= rows()` or `c >= cols()`.
    #[inline]
    pub fn set(&mut self, r: usize, c: usize, v: T) {
        assert!(r < self.rows && c < self.cols);
        let i = self.idx(r, c);
        self.data[i] = v;
    }

    /// Returns the logical part of row `r` (padding excluded).
    pub fn row(&self, r: usize) -> &[T] {
        let start = r * self.stride;
        &self.data[start..start + self.cols]
    }

    /// Borrow a `rows x cols` window with its top-left corner at `(row, col)`.
    ///
    /// # Errors
    /// Returns `LayoutError::WindowOutOfBounds` if the window does not fit
    /// inside the logical bounds of the matrix.
    pub fn view(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<TileView<'_, T>> {
        self.check_window(row, col, rows, cols)?;
        let start = row * self.stride + col;
        // The last row of the view stops at its logical width, so the slice
        // end never reaches past the buffer even when the window touches the
        // bottom-right corner.
        let end = start + (rows - 1) * self.stride + cols;
        Ok(TileView {
            data: &self.data[start..end],
            rows,
            cols,
            stride: self.stride,
        })
    }

    fn check_window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 || row + rows > self.rows || col + cols > self.cols {
            return Err(LayoutError::WindowOutOfBounds {
                row,
                col,
                rows,
                cols,
                mat_rows: self.rows,
                mat_cols: self.cols,
            });
        }
        Ok(())
    }
}

/// A borrowed rectangular window into a [`Matrix`].
///
/// Carries the parent stride, so a view row `r` starts at `r * stride` in
/// the borrowed slice. This is the operand handed to a tile backend.
#[derive(Debug, Clone, Copy)]
pub struct TileView<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a, T: Copy> TileView<'a, T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn at(&self, r: usize, c: usize) -> T {
        self.data[r * self.stride + c]
    }

    /// Returns row `r` of the view (logical width).
    #[inline]
    pub fn row(&self, r: usize) -> &'a [T] {
        let start = r * self.stride;
        &self.data[start..start + self.cols]
    }
}

/// A contiguous block of running i32 sums for one register tile.
///
/// Owned by the scheduler for the duration of one cache-segment pass: loaded
/// from the output matrix at segment entry, updated in place by the backend,
/// stored back at segment exit. The buffer is reused across tiles, so the
/// hot loop does not allocate after the first tile.
#[derive(Debug, Default)]
pub struct AccumulatorTile {
    data: Vec<i32>,
    rows: usize,
    cols: usize,
}

impl AccumulatorTile {
    pub fn new() -> Self {
        AccumulatorTile::default()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn at(&self, r: usize, c: usize) -> i32 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, v: i32) {
        let i = r * self.cols + c;
        self.data[i] = v;
    }

    /// Returns row `r` as a mutable slice, for backends that update whole
    /// lanes at a time.
    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [i32] {
        let start = r * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Reshape to `rows x cols` and fill from the window of `src` at
    /// `(row, col)`.
    ///
    /// # Errors
    /// Returns `LayoutError::WindowOutOfBounds` if the window does not fit.
    pub fn load(
        &mut self,
        src: &Matrix<i32>,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        let window = src.view(row, col, rows, cols)?;
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        for r in 0..rows {
            self.data.extend_from_slice(window.row(r));
        }
        Ok(())
    }

    /// Write the tile back into `dst` at `(row, col)`.
    ///
    /// # Errors
    /// Returns `LayoutError::WindowOutOfBounds` if the tile does not fit.
    pub fn store(&self, dst: &mut Matrix<i32>, row: usize, col: usize) -> Result<()> {
        dst.check_window(row, col, self.rows, self.cols)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                dst.set(row + r, col + c, self.at(r, c));
            }
        }
        Ok(())
    }
}
