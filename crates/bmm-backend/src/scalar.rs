use bmm_matrix::{AccumulatorTile, TileView};

use crate::backend::{validate_tile, TileBackend, TileCaps};
use crate::error::Result;

/// Reference backend: a plain triple loop over one micro tile.
///
/// Optimized for correctness rather than peak performance. This is the
/// implementation other backends are checked against.
#[derive(Debug, Clone)]
pub struct ScalarBackend {
    caps: TileCaps,
}

impl ScalarBackend {
    pub fn new() -> Self {
        ScalarBackend {
            caps: TileCaps::default(),
        }
    }

    pub fn with_caps(caps: TileCaps) -> Self {
        ScalarBackend { caps }
    }
}

impl Default for ScalarBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// The scalar micro-kernel, shared with SIMD fallback paths. Shapes must
/// already be validated.
pub(crate) fn accumulate_reference(
    acc: &mut AccumulatorTile,
    a: &TileView<'_, i8>,
    b: &TileView<'_, i8>,
) {
    let m = acc.rows();
    let k = a.cols();
    let n = acc.cols();
    for i in 0..m {
        let a_row = a.row(i);
        for j in 0..n {
            let mut sum = acc.at(i, j);
            for p in 0..k {
                // i8 * i8 cannot overflow i32; only the running sum wraps.
                sum = sum.wrapping_add(a_row[p] as i32 * b.at(p, j) as i32);
            }
            acc.set(i, j, sum);
        }
    }
}

impl TileBackend for ScalarBackend {
    fn name(&self) -> &str {
        "scalar"
    }

    fn caps(&self) -> TileCaps {
        self.caps
    }

    fn multiply_accumulate(
        &self,
        acc: &mut AccumulatorTile,
        a: TileView<'_, i8>,
        b: TileView<'_, i8>,
    ) -> Result<()> {
        validate_tile(&self.caps, acc, &a, &b)?;
        accumulate_reference(acc, &a, &b);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmm_matrix::Matrix;

    fn acc_from(c: &Matrix<i32>, rows: usize, cols: usize) -> AccumulatorTile {
        let mut acc = AccumulatorTile::new();
        acc.load(c, 0, 0, rows, cols).unwrap();
        acc
    }

    #[test]
    fn test_identity() {
        let b = ScalarBackend::new();
        let a = Matrix::from_fn(2, 2, |r, c| (r == c) as i8);
        let x = Matrix::from_fn(2, 2, |r, c| (r * 2 + c) as i8 + 1);
        let c: Matrix<i32> = Matrix::new(2, 2);
        let mut acc = acc_from(&c, 2, 2);
        b.multiply_accumulate(&mut acc, a.view(0, 0, 2, 2).unwrap(), x.view(0, 0, 2, 2).unwrap())
            .unwrap();
        assert_eq!(
            [acc.at(0, 0), acc.at(0, 1), acc.at(1, 0), acc.at(1, 1)],
            [1, 2, 3, 4]
        );
    }

    #[test]
    fn test_known_product() {
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let b = ScalarBackend::new();
        let a = Matrix::from_fn(2, 2, |r, c| (r * 2 + c) as i8 + 1);
        let x = Matrix::from_fn(2, 2, |r, c| (r * 2 + c) as i8 + 5);
        let c: Matrix<i32> = Matrix::new(2, 2);
        let mut acc = acc_from(&c, 2, 2);
        b.multiply_accumulate(&mut acc, a.view(0, 0, 2, 2).unwrap(), x.view(0, 0, 2, 2).unwrap())
            .unwrap();
        assert_eq!(
            [acc.at(0, 0), acc.at(0, 1), acc.at(1, 0), acc.at(1, 1)],
            [19, 22, 43, 50]
        );
    }

    #[test]
    fn test_accumulates_onto_preload() {
        let b = ScalarBackend::new();
        let a = Matrix::from_fn(1, 1, |_, _| 1i8);
        let x = Matrix::from_fn(1, 1, |_, _| 1i8);
        let c = Matrix::from_fn(1, 1, |_, _| 100i32);
        let mut acc = acc_from(&c, 1, 1);
        b.multiply_accumulate(&mut acc, a.view(0, 0, 1, 1).unwrap(), x.view(0, 0, 1, 1).unwrap())
            .unwrap();
        assert_eq!(acc.at(0, 0), 101);
    }

    #[test]
    fn test_wrapping_at_i32_max() {
        let b = ScalarBackend::new();
        let a = Matrix::from_fn(1, 1, |_, _| 1i8);
        let x = Matrix::from_fn(1, 1, |_, _| 1i8);
        let c = Matrix::from_fn(1, 1, |_, _| i32::MAX);
        let mut acc = acc_from(&c, 1, 1);
        b.multiply_accumulate(&mut acc, a.view(0, 0, 1, 1).unwrap(), x.view(0, 0, 1, 1).unwrap())
            .unwrap();
        assert_eq!(acc.at(0, 0), i32::MIN);
    }

    #[test]
    fn test_rejects_oversized_tile() {
        let b = ScalarBackend::with_caps(TileCaps::new(1, 1, 1));
        let a: Matrix<i8> = Matrix::new(2, 2);
        let x: Matrix<i8> = Matrix::new(2, 2);
        let c: Matrix<i32> = Matrix::new(2, 2);
        let mut acc = acc_from(&c, 2, 2);
        assert!(b
            .multiply_accumulate(
                &mut acc,
                a.view(0, 0, 2, 2).unwrap(),
                x.view(0, 0, 2, 2).unwrap()
            )
            .is_err());
    }

    #[test]
    fn test_negative_operands() {
        let b = ScalarBackend::new();
        let a = Matrix::from_fn(1, 2, |_, c| if c == 0 { -128i8 } else { 127 });
        let x = Matrix::from_fn(2, 1, |r, _| if r == 0 { 127i8 } else { -128 });
        let c: Matrix<i32> = Matrix::new(1, 1);
        let mut acc = acc_from(&c, 1, 1);
        b.multiply_accumulate(&mut acc, a.view(0, 0, 1, 2).unwrap(), x.view(0, 0, 2, 1).unwrap())
            .unwrap();
        assert_eq!(acc.at(0, 0), -128 * 127 + 127 * -128);
    }
}
