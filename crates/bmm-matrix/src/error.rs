use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("logical row width must be positive")]
    ZeroWidth,
    #[error("element size must be positive")]
    ZeroElemSize,
    #[error("bank count must be positive")]
    ZeroBankCount,
    #[error("bank line size must be positive")]
    ZeroLineSize,
    #[error("bank line of {line_bytes} bytes is not a whole number of {elem_size}-byte elements")]
    LineNotElementAligned { line_bytes: usize, elem_size: usize },
    #[error("stride {stride} is smaller than logical width {cols}")]
    StrideTooSmall { stride: usize, cols: usize },
    #[error("window {rows}x{cols} at ({row},{col}) exceeds matrix bounds {mat_rows}x{mat_cols}")]
    WindowOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        mat_rows: usize,
        mat_cols: usize,
    },
}

pub type Result<T> = std::result::Result<T, LayoutError>;
