use rayon::prelude::*;

use bmm_backend::TileBackend;
use bmm_matrix::{AccumulatorTile, Matrix};

use crate::cancel::CancelToken;
use crate::error::{ConfigError, Result, ScheduleError};
use crate::plan::TilingPlan;
use crate::trace::{CoreTileTrace, SegmentTrace, TraceSink};

/// Drives a blocked matrix multiply over a validated [`TilingPlan`].
///
/// The decomposition is three-level: core tiles over (m_outer, n_outer),
/// cache segments over (k_outer, k_inner) within each core tile, and
/// register-sized micro tiles handed to the backend. Different core tiles
/// touch disjoint regions of C and disjoint row/column ranges of A and B,
/// which is what [`GemmScheduler::multiply_parallel`] exploits; within one
/// core tile the K sweep is strictly sequential because every step
/// read-modify-writes the same accumulator region.
pub struct GemmScheduler<'a> {
    plan: TilingPlan,
    sink: Option<&'a dyn TraceSink>,
    cancel: Option<CancelToken>,
}

impl<'a> GemmScheduler<'a> {
    pub fn new(plan: TilingPlan) -> Self {
        GemmScheduler {
            plan,
            sink: None,
            cancel: None,
        }
    }

    /// Attach a progress sink. Builder-style.
    pub fn with_sink(mut self, sink: &'a dyn TraceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a cancellation token, checked at core-tile boundaries.
    /// Builder-style.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn plan(&self) -> &TilingPlan {
        &self.plan
    }

    /// Compute `C += A @ B` sequentially.
    ///
    /// C carries the initial accumulator state: callers zero it for a plain
    /// product, or leave partial sums in place to continue accumulating.
    /// On success every element of C equals the exact wrapping-i32 dot
    /// product of its row of A and column of B plus its initial value,
    /// regardless of the tiling plan or backend caps.
    ///
    /// # Errors
    /// Configuration errors (shape mismatch against the plan, degenerate
    /// backend caps) are detected before any backend call. A backend
    /// rejection aborts immediately, wrapped with the failing tile
    /// coordinates; C is then undefined beyond core tiles that had already
    /// completed.
    pub fn multiply(
        &self,
        a: &Matrix<i8>,
        b: &Matrix<i8>,
        c: &mut Matrix<i32>,
        backend: &dyn TileBackend,
    ) -> Result<()> {
        let result = self
            .check_inputs(a, b, c, backend)
            .and_then(|()| self.run_sequential(a, b, c, backend));
        self.finish(result)
    }

    /// Compute `C += A @ B` with core tiles fanned out across rayon workers.
    ///
    /// Each worker computes its core tile into a private scratch seeded from
    /// C's region; the scratches are scattered back only when every tile
    /// succeeded, so a failed parallel call leaves C untouched. Results are
    /// bit-identical to [`GemmScheduler::multiply`].
    pub fn multiply_parallel(
        &self,
        a: &Matrix<i8>,
        b: &Matrix<i8>,
        c: &mut Matrix<i32>,
        backend: &dyn TileBackend,
    ) -> Result<()> {
        if let Err(error) = self.check_inputs(a, b, c, backend) {
            return self.finish(Err(error));
        }

        let part = self.plan.partition();
        let coords: Vec<(usize, usize)> = (0..self.plan.m_tiles())
            .flat_map(|m_outer| (0..self.plan.n_tiles()).map(move |n_outer| (m_outer, n_outer)))
            .collect();

        let c_ref: &Matrix<i32> = c;
        let result: Result<Vec<((usize, usize), Matrix<i32>)>> = coords
            .into_par_iter()
            .map(|(m_outer, n_outer)| {
                self.check_cancel(m_outer, n_outer)?;
                let row_base = m_outer * part.m_percore;
                let col_base = n_outer * part.n_percore;
                let mut scratch = Matrix::<i32>::from_fn(part.m_percore, part.n_percore, |r, col| {
                    c_ref.get(row_base + r, col_base + col)
                });
                let mut acc = AccumulatorTile::new();
                self.run_core_tile(a, b, &mut scratch, m_outer, n_outer, 0, 0, backend, &mut acc)?;
                Ok(((m_outer, n_outer), scratch))
            })
            .collect();

        let result = result.map(|tiles| {
            for ((m_outer, n_outer), scratch) in tiles {
                let row_base = m_outer * part.m_percore;
                let col_base = n_outer * part.n_percore;
                for r in 0..part.m_percore {
                    for col in 0..part.n_percore {
                        c.set(row_base + r, col_base + col, scratch.get(r, col));
                    }
                }
            }
        });
        self.finish(result)
    }

    fn run_sequential(
        &self,
        a: &Matrix<i8>,
        b: &Matrix<i8>,
        c: &mut Matrix<i32>,
        backend: &dyn TileBackend,
    ) -> Result<()> {
        let part = self.plan.partition();
        let mut acc = AccumulatorTile::new();
        for m_outer in 0..self.plan.m_tiles() {
            for n_outer in 0..self.plan.n_tiles() {
                self.check_cancel(m_outer, n_outer)?;
                let row_base = m_outer * part.m_percore;
                let col_base = n_outer * part.n_percore;
                self.run_core_tile(
                    a, b, c, m_outer, n_outer, row_base, col_base, backend, &mut acc,
                )?;
            }
        }
        Ok(())
    }

    /// One core tile: the (k_outer, k_inner) segment sweep with register-tile
    /// accumulation into `c`. `c_row_base`/`c_col_base` locate the core
    /// tile's region inside `c`: the real bases for the in-place driver,
    /// zero for a parallel scratch.
    #[allow(clippy::too_many_arguments)]
    fn run_core_tile(
        &self,
        a: &Matrix<i8>,
        b: &Matrix<i8>,
        c: &mut Matrix<i32>,
        m_outer: usize,
        n_outer: usize,
        c_row_base: usize,
        c_col_base: usize,
        backend: &dyn TileBackend,
        acc: &mut AccumulatorTile,
    ) -> Result<()> {
        let part = self.plan.partition();
        let caps = backend.caps();
        let m_base = m_outer * part.m_percore;
        let n_base = n_outer * part.n_percore;

        for k_outer in 0..self.plan.k_partitions() {
            let k_base = k_outer * part.k_percore;
            for k_inner in 0..self.plan.segments_per_partition() {
                let seg_base = k_base + k_inner * part.k_once;

                let mut m = 0;
                while m < part.m_percore {
                    let tile_m = caps.max_tile_m.min(part.m_percore - m);
                    let mut n = 0;
                    while n < part.n_percore {
                        let tile_n = caps.max_tile_n.min(part.n_percore - n);
                        // Running sums for this register tile: C's current
                        // value is the segment's starting state.
                        acc.load(c, c_row_base + m, c_col_base + n, tile_m, tile_n)?;

                        let mut k = 0;
                        while k < part.k_once {
                            let tile_k = caps.max_tile_k.min(part.k_once - k);
                            let a_tile = a.view(m_base + m, seg_base + k, tile_m, tile_k)?;
                            let b_tile = b.view(seg_base + k, n_base + n, tile_k, tile_n)?;
                            backend
                                .multiply_accumulate(acc, a_tile, b_tile)
                                .map_err(|source| ScheduleError::Backend {
                                    m_outer,
                                    n_outer,
                                    k_outer,
                                    k_inner,
                                    source,
                                })?;
                            k += tile_k;
                        }

                        acc.store(c, c_row_base + m, c_col_base + n)?;
                        n += tile_n;
                    }
                    m += tile_m;
                }

                if let Some(sink) = self.sink {
                    let core_index = m_outer * self.plan.n_tiles() * self.plan.k_partitions()
                        + n_outer * self.plan.k_partitions()
                        + k_outer;
                    sink.segment_complete(&SegmentTrace {
                        m_outer,
                        n_outer,
                        k_outer,
                        k_inner,
                        core_index,
                    });
                }
            }
        }

        if let Some(sink) = self.sink {
            sink.core_tile_complete(&CoreTileTrace { m_outer, n_outer });
        }
        Ok(())
    }

    fn check_inputs(
        &self,
        a: &Matrix<i8>,
        b: &Matrix<i8>,
        c: &Matrix<i32>,
        backend: &dyn TileBackend,
    ) -> Result<()> {
        let dims = self.plan.dims();
        check_shape("A", a.rows(), a.cols(), dims.m, dims.k)?;
        check_shape("B", b.rows(), b.cols(), dims.k, dims.n)?;
        check_shape("C", c.rows(), c.cols(), dims.m, dims.n)?;

        let caps = backend.caps();
        for (cap, name) in [
            (caps.max_tile_m, "max_tile_m"),
            (caps.max_tile_k, "max_tile_k"),
            (caps.max_tile_n, "max_tile_n"),
        ] {
            if cap == 0 {
                return Err(ConfigError::ZeroDim { name }.into());
            }
        }
        Ok(())
    }

    fn check_cancel(&self, m_outer: usize, n_outer: usize) -> Result<()> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(ScheduleError::Cancelled { m_outer, n_outer });
            }
        }
        Ok(())
    }

    fn finish(&self, result: Result<()>) -> Result<()> {
        if let Some(sink) = self.sink {
            match &result {
                Ok(()) => sink.call_complete(),
                Err(error) => sink.call_failed(error),
            }
        }
        result
    }
}

fn check_shape(
    matrix: &'static str,
    rows: usize,
    cols: usize,
    want_rows: usize,
    want_cols: usize,
) -> Result<()> {
    if rows != want_rows || cols != want_cols {
        return Err(ConfigError::ShapeMismatch {
            matrix,
            rows,
            cols,
            want_rows,
            want_cols,
        }
        .into());
    }
    Ok(())
}
