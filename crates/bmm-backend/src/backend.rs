use std::fmt::Debug;

use bmm_matrix::{AccumulatorTile, BankConfig, TileView};

use crate::error::{BackendError, Result};

/// Capability record of a tile execution backend.
///
/// The register-tile caps bound the micro-tile extents a single
/// `multiply_accumulate` call may carry; the scheduler requests
/// `min(remaining, cap)` along each axis. The bank description feeds the
/// padding planner when callers allocate operand matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCaps {
    /// Maximum accumulator rows per call.
    pub max_tile_m: usize,
    /// Maximum K extent per call.
    pub max_tile_k: usize,
    /// Maximum accumulator columns per call.
    pub max_tile_n: usize,
    /// Banked memory the backend loads operand rows through.
    pub banks: BankConfig,
}

impl TileCaps {
    pub fn new(max_tile_m: usize, max_tile_k: usize, max_tile_n: usize) -> Self {
        TileCaps {
            max_tile_m,
            max_tile_k,
            max_tile_n,
            banks: BankConfig::default(),
        }
    }

    /// Replace the bank description. Builder-style.
    pub fn with_banks(mut self, banks: BankConfig) -> Self {
        self.banks = banks;
        self
    }
}

impl Default for TileCaps {
    /// The register-file limits of the matrix unit the engine was written
    /// against: 64 accumulator rows, 256-deep K, 64 accumulator columns.
    fn default() -> Self {
        TileCaps::new(64, 256, 64)
    }
}

/// Trait for pluggable tile execution backends (scalar, SIMD, etc.).
///
/// A backend performs the multiply-accumulate for one register-sized micro
/// tile. The mathematical contract is the scalar sum of products: for every
/// `(i, j)` of the accumulator,
///
/// ```text
/// acc[i][j] += sum over p of a[i][p] * b[p][j]
/// ```
///
/// with `i8` operands widened exactly and the sum wrapping at `i32`
/// (two's-complement, not saturating). How the backend evaluates this is its
/// own business; callers rely only on `caps()` and the contract above.
pub trait TileBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "scalar", "simd").
    fn name(&self) -> &str;

    /// Returns the capability record callers must respect.
    fn caps(&self) -> TileCaps;

    /// Accumulate `a @ b` into `acc` in place.
    ///
    /// - `acc`: running sums, shape [tile_m, tile_n]
    /// - `a`: operand window of shape [tile_m, tile_k]
    /// - `b`: operand window of shape [tile_k, tile_n]
    ///
    /// # Errors
    /// Returns a `BackendError` if the shapes are inconsistent or exceed the
    /// caps. A backend must reject before touching `acc`; an error never
    /// leaves a partial update behind.
    fn multiply_accumulate(
        &self,
        acc: &mut AccumulatorTile,
        a: TileView<'_, i8>,
        b: TileView<'_, i8>,
    ) -> Result<()>;
}

/// Entry validation shared by backend implementations: operand shapes must
/// chain `[m,k] @ [k,n] -> [m,n]` and every extent must fit the caps.
pub fn validate_tile(
    caps: &TileCaps,
    acc: &AccumulatorTile,
    a: &TileView<'_, i8>,
    b: &TileView<'_, i8>,
) -> Result<()> {
    if a.rows() != acc.rows() || b.cols() != acc.cols() || a.cols() != b.rows() {
        return Err(BackendError::ShapeMismatch {
            a_rows: a.rows(),
            a_cols: a.cols(),
            b_rows: b.rows(),
            b_cols: b.cols(),
            acc_rows: acc.rows(),
            acc_cols: acc.cols(),
        });
    }
    if acc.rows() > caps.max_tile_m {
        return Err(BackendError::TileTooLarge {
            axis: "m",
            size: acc.rows(),
            max: caps.max_tile_m,
        });
    }
    if a.cols() > caps.max_tile_k {
        return Err(BackendError::TileTooLarge {
            axis: "k",
            size: a.cols(),
            max: caps.max_tile_k,
        });
    }
    if acc.cols() > caps.max_tile_n {
        return Err(BackendError::TileTooLarge {
            axis: "n",
            size: acc.cols(),
            max: caps.max_tile_n,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmm_matrix::Matrix;

    #[test]
    fn test_caps_builder() {
        let caps = TileCaps::new(4, 8, 4).with_banks(BankConfig::new(16, 32));
        assert_eq!(caps.max_tile_k, 8);
        assert_eq!(caps.banks.bank_count, 16);
    }

    #[test]
    fn test_validate_rejects_shape_chain() {
        let caps = TileCaps::new(8, 8, 8);
        let a: Matrix<i8> = Matrix::new(2, 3);
        let b: Matrix<i8> = Matrix::new(4, 2);
        let c: Matrix<i32> = Matrix::new(2, 2);
        let mut acc = AccumulatorTile::new();
        acc.load(&c, 0, 0, 2, 2).unwrap();
        let err = validate_tile(
            &caps,
            &acc,
            &a.view(0, 0, 2, 3).unwrap(),
            &b.view(0, 0, 4, 2).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_oversized_tile() {
        let caps = TileCaps::new(1, 8, 8);
        let a: Matrix<i8> = Matrix::new(2, 2);
        let b: Matrix<i8> = Matrix::new(2, 2);
        let c: Matrix<i32> = Matrix::new(2, 2);
        let mut acc = AccumulatorTile::new();
        acc.load(&c, 0, 0, 2, 2).unwrap();
        let err = validate_tile(
            &caps,
            &acc,
            &a.view(0, 0, 2, 2).unwrap(),
            &b.view(0, 0, 2, 2).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BackendError::TileTooLarge { axis: "m", size: 2, max: 1 }
        ));
    }
}
