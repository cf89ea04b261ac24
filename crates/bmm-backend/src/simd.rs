use std::arch::x86_64::*;

use bmm_matrix::{AccumulatorTile, TileView};

use crate::backend::{validate_tile, TileBackend, TileCaps};
use crate::error::Result;
use crate::scalar::accumulate_reference;

/// AVX2-accelerated backend.
///
/// Detects AVX2 at construction time and falls back to the scalar
/// micro-kernel when the host lacks it, so results are bit-identical to
/// [`crate::ScalarBackend`] either way.
///
/// The kernel widens `i8` operands to `i16`, multiplies with
/// `_mm256_mullo_epi16` (an i8 x i8 product always fits in i16, so the
/// low half is exact), widens the products to `i32`, and accumulates with
/// wrapping lane adds, 16 accumulator columns at a time.
#[derive(Debug, Clone)]
pub struct SimdBackend {
    caps: TileCaps,
    avx2: bool,
}

impl SimdBackend {
    pub fn new() -> Self {
        Self::with_caps(TileCaps::default())
    }

    pub fn with_caps(caps: TileCaps) -> Self {
        SimdBackend {
            caps,
            avx2: is_x86_feature_detected!("avx2"),
        }
    }

    /// Whether the AVX2 kernel is active on this host.
    pub fn is_accelerated(&self) -> bool {
        self.avx2
    }
}

impl Default for SimdBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TileBackend for SimdBackend {
    fn name(&self) -> &str {
        "simd"
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
        if self.avx2 {
            // Safety: AVX2 support was verified at construction.
            unsafe { accumulate_avx2(acc, &a, &b) };
        } else {
            accumulate_reference(acc, &a, &b);
        }
        Ok(())
    }
}

#[target_feature(enable = "avx2")]
unsafe fn accumulate_avx2(acc: &mut AccumulatorTile, a: &TileView<'_, i8>, b: &TileView<'_, i8>) {
    let m = acc.rows();
    let k = a.cols();
    let n = acc.cols();
    let full = n - n % 16;

    for i in 0..m {
        let a_row = a.row(i);
        let acc_row = acc.row_mut(i).as_mut_ptr();

        let mut j = 0;
        while j < full {
            // Keep two 8-lane i32 accumulators in registers across the whole
            // k sweep for this 16-column block.
            let mut sum_lo = _mm256_loadu_si256(acc_row.add(j) as *const __m256i);
            let mut sum_hi = _mm256_loadu_si256(acc_row.add(j + 8) as *const __m256i);

            for p in 0..k {
                let b_row = b.row(p);
                let bv =
                    _mm256_cvtepi8_epi16(_mm_loadu_si128(b_row.as_ptr().add(j) as *const __m128i));
                let av = _mm256_set1_epi16(a_row[p] as i16);
                let prod = _mm256_mullo_epi16(av, bv);
                sum_lo = _mm256_add_epi32(
                    sum_lo,
                    _mm256_cvtepi16_epi32(_mm256_castsi256_si128(prod)),
                );
                sum_hi = _mm256_add_epi32(
                    sum_hi,
                    _mm256_cvtepi16_epi32(_mm256_extracti128_si256::<1>(prod)),
                );
            }

            _mm256_storeu_si256(acc_row.add(j) as *mut __m256i, sum_lo);
            _mm256_storeu_si256(acc_row.add(j + 8) as *mut __m256i, sum_hi);
            j += 16;
        }

        // Trailing columns narrower than one vector block.
        for j in full..n {
            let mut sum = acc.at(i, j);
            for p in 0..k {
                sum = sum.wrapping_add(a_row[p] as i32 * b.at(p, j) as i32);
            }
            acc.set(i, j, sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarBackend;
    use bmm_matrix::Matrix;
    use rand::{Rng, SeedableRng};

    fn random_operands(
        rng: &mut rand::rngs::StdRng,
        m: usize,
        k: usize,
        n: usize,
    ) -> (Matrix<i8>, Matrix<i8>) {
        let a = Matrix::from_fn(m, k, |_, _| rng.gen::<i8>());
        let b = Matrix::from_fn(k, n, |_, _| rng.gen::<i8>());
        (a, b)
    }

    #[test]
    fn test_matches_scalar_backend() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let scalar = ScalarBackend::new();
        let simd = SimdBackend::new();

        // Widths straddling the 16-lane block size, including remainders.
        for (m, k, n) in [(1, 1, 1), (3, 5, 16), (4, 7, 19), (8, 16, 32), (5, 3, 33)] {
            let (a, b) = random_operands(&mut rng, m, k, n);
            let seed = Matrix::from_fn(m, n, |r, c| (r as i32 - c as i32) * 1000);

            let mut want = AccumulatorTile::new();
            want.load(&seed, 0, 0, m, n).unwrap();
            scalar
                .multiply_accumulate(
                    &mut want,
                    a.view(0, 0, m, k).unwrap(),
                    b.view(0, 0, k, n).unwrap(),
                )
                .unwrap();

            let mut got = AccumulatorTile::new();
            got.load(&seed, 0, 0, m, n).unwrap();
            simd.multiply_accumulate(
                &mut got,
                a.view(0, 0, m, k).unwrap(),
                b.view(0, 0, k, n).unwrap(),
            )
            .unwrap();

            for r in 0..m {
                for c in 0..n {
                    assert_eq!(got.at(r, c), want.at(r, c), "({m},{k},{n}) at ({r},{c})");
                }
            }
        }
    }

    #[test]
    fn test_padded_operand_strides() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let scalar = ScalarBackend::new();
        let simd = SimdBackend::new();

        let (m, k, n) = (4, 6, 18);
        let mut a: Matrix<i8> = Matrix::with_stride(m, k, 13).unwrap();
        let mut b: Matrix<i8> = Matrix::with_stride(k, n, 29).unwrap();
        for r in 0..m {
            for c in 0..k {
                a.set(r, c, rng.gen());
            }
        }
        for r in 0..k {
            for c in 0..n {
                b.set(r, c, rng.gen());
            }
        }

        let zero: Matrix<i32> = Matrix::new(m, n);
        let mut want = AccumulatorTile::new();
        want.load(&zero, 0, 0, m, n).unwrap();
        let mut got = AccumulatorTile::new();
        got.load(&zero, 0, 0, m, n).unwrap();

        scalar
            .multiply_accumulate(
                &mut want,
                a.view(0, 0, m, k).unwrap(),
                b.view(0, 0, k, n).unwrap(),
            )
            .unwrap();
        simd.multiply_accumulate(
            &mut got,
            a.view(0, 0, m, k).unwrap(),
            b.view(0, 0, k, n).unwrap(),
        )
        .unwrap();

        for r in 0..m {
            for c in 0..n {
                assert_eq!(got.at(r, c), want.at(r, c));
            }
        }
    }

    #[test]
    fn test_wrapping_matches_scalar() {
        let scalar = ScalarBackend::new();
        let simd = SimdBackend::new();
        let a = Matrix::from_fn(1, 1, |_, _| 127i8);
        let b = Matrix::from_fn(1, 16, |_, _| 127i8);
        let seed = Matrix::from_fn(1, 16, |_, _| i32::MAX - 100);

        let mut want = AccumulatorTile::new();
        want.load(&seed, 0, 0, 1, 16).unwrap();
        scalar
            .multiply_accumulate(
                &mut want,
                a.view(0, 0, 1, 1).unwrap(),
                b.view(0, 0, 1, 16).unwrap(),
            )
            .unwrap();

        let mut got = AccumulatorTile::new();
        got.load(&seed, 0, 0, 1, 16).unwrap();
        simd.multiply_accumulate(
            &mut got,
            a.view(0, 0, 1, 1).unwrap(),
            b.view(0, 0, 1, 16).unwrap(),
        )
        .unwrap();

        for c in 0..16 {
            assert_eq!(got.at(0, c), want.at(0, c));
            assert!(got.at(0, c) < 0); // wrapped past i32::MAX
        }
    }
}
