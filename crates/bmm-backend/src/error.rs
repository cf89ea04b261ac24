use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("tile extent {size} along {axis} exceeds backend cap {max}")]
    TileTooLarge {
        axis: &'static str,
        size: usize,
        max: usize,
    },
    #[error(
        "operand shapes [{a_rows}x{a_cols}] @ [{b_rows}x{b_cols}] do not fit accumulator [{acc_rows}x{acc_cols}]"
    )]
    ShapeMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
        acc_rows: usize,
        acc_cols: usize,
    },
}

pub type Result<T> = std::result::Result<T, BackendError>;
