use thiserror::Error;

use bmm_backend::BackendError;
use bmm_matrix::LayoutError;

/// Configuration mistakes, detected before any backend call. Always fatal,
/// never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be positive")]
    ZeroDim { name: &'static str },
    #[error("{name}={value} is not divisible by {divisor_name}={divisor}")]
    NotDivisible {
        name: &'static str,
        value: usize,
        divisor_name: &'static str,
        divisor: usize,
    },
    #[error("matrix {matrix} is {rows}x{cols}, plan expects {want_rows}x{want_cols}")]
    ShapeMismatch {
        matrix: &'static str,
        rows: usize,
        cols: usize,
        want_rows: usize,
        want_cols: usize,
    },
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("layout: {0}")]
    Layout(#[from] LayoutError),
    /// The backend rejected a tile mid-computation. The output matrix is
    /// undefined beyond core tiles that had already completed.
    #[error(
        "backend rejected tile at core ({m_outer},{n_outer}), k partition {k_outer}, segment {k_inner}: {source}"
    )]
    Backend {
        m_outer: usize,
        n_outer: usize,
        k_outer: usize,
        k_inner: usize,
        #[source]
        source: BackendError,
    },
    #[error("multiply cancelled before core tile ({m_outer},{n_outer})")]
    Cancelled { m_outer: usize, n_outer: usize },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
