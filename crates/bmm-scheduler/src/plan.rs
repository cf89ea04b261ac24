use crate::error::{ConfigError, Result};

/// Full multiply shape: A is [m, k], B is [k, n], C is [m, n].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmDims {
    pub m: usize,
    pub k: usize,
    pub n: usize,
}

impl GemmDims {
    pub fn new(m: usize, k: usize, n: usize) -> Self {
        GemmDims { m, k, n }
    }
}

/// Core-level partition of a multiply.
///
/// Each core tile owns an `m_percore x n_percore` region of C. K is split
/// into `k_percore` partitions, each processed as `k_once`-deep cache
/// segments so the corresponding A/B slices stay resident in fast memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorePartition {
    /// Rows of C per core tile; must divide `m`.
    pub m_percore: usize,
    /// K extent per partition; must divide `k`.
    pub k_percore: usize,
    /// Columns of C per core tile; must divide `n`.
    pub n_percore: usize,
    /// K extent per cache segment; must divide `k_percore`.
    pub k_once: usize,
}

impl CorePartition {
    /// A single core tile covering the whole problem in one cache segment.
    pub fn whole(dims: GemmDims) -> Self {
        CorePartition {
            m_percore: dims.m,
            k_percore: dims.k,
            n_percore: dims.n,
            k_once: dims.k,
        }
    }
}

/// A validated tiling plan: dimensions plus core partition, with every
/// divisibility invariant checked up front.
///
/// The plan is a performance knob only: any valid plan yields bit-identical
/// results for the same operands.
#[derive(Debug, Clone, Copy)]
pub struct TilingPlan {
    dims: GemmDims,
    part: CorePartition,
}

impl TilingPlan {
    /// Validate `part` against `dims` and build a plan.
    ///
    /// # Errors
    /// Returns `ConfigError` if any dimension or partition extent is zero,
    /// or any required divisibility does not hold. Detection happens here,
    /// before any computation can start.
    pub fn new(dims: GemmDims, part: CorePartition) -> Result<Self> {
        require_positive(dims.m, "m")?;
        require_positive(dims.k, "k")?;
        require_positive(dims.n, "n")?;
        require_positive(part.m_percore, "m_percore")?;
        require_positive(part.k_percore, "k_percore")?;
        require_positive(part.n_percore, "n_percore")?;
        require_positive(part.k_once, "k_once")?;
        require_divides(dims.m, "m", part.m_percore, "m_percore")?;
        require_divides(dims.n, "n", part.n_percore, "n_percore")?;
        require_divides(dims.k, "k", part.k_percore, "k_percore")?;
        require_divides(part.k_percore, "k_percore", part.k_once, "k_once")?;
        Ok(TilingPlan { dims, part })
    }

    /// A plan with one core tile and one cache segment.
    pub fn single_tile(dims: GemmDims) -> Result<Self> {
        TilingPlan::new(dims, CorePartition::whole(dims))
    }

    pub fn dims(&self) -> GemmDims {
        self.dims
    }

    pub fn partition(&self) -> CorePartition {
        self.part
    }

    /// Core tiles along M.
    pub fn m_tiles(&self) -> usize {
        self.dims.m / self.part.m_percore
    }

    /// Core tiles along N.
    pub fn n_tiles(&self) -> usize {
        self.dims.n / self.part.n_percore
    }

    /// K partitions per core tile.
    pub fn k_partitions(&self) -> usize {
        self.dims.k / self.part.k_percore
    }

    /// Cache segments per K partition.
    pub fn segments_per_partition(&self) -> usize {
        self.part.k_percore / self.part.k_once
    }

    /// Total number of core tiles in the (m_outer, n_outer) sweep.
    pub fn core_tiles(&self) -> usize {
        self.m_tiles() * self.n_tiles()
    }
}

fn require_positive(value: usize, name: &'static str) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::ZeroDim { name }.into());
    }
    Ok(())
}

fn require_divides(
    value: usize,
    name: &'static str,
    divisor: usize,
    divisor_name: &'static str,
) -> Result<()> {
    if value % divisor != 0 {
        return Err(ConfigError::NotDivisible {
            name,
            value,
            divisor_name,
            divisor,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;

    #[test]
    fn test_whole_partition() {
        let dims = GemmDims::new(8, 16, 4);
        let plan = TilingPlan::single_tile(dims).unwrap();
        assert_eq!(plan.m_tiles(), 1);
        assert_eq!(plan.n_tiles(), 1);
        assert_eq!(plan.k_partitions(), 1);
        assert_eq!(plan.segments_per_partition(), 1);
        assert_eq!(plan.core_tiles(), 1);
    }

    #[test]
    fn test_tile_counts() {
        let dims = GemmDims::new(8, 12, 6);
        let part = CorePartition {
            m_percore: 4,
            k_percore: 6,
            n_percore: 3,
            k_once: 3,
        };
        let plan = TilingPlan::new(dims, part).unwrap();
        assert_eq!(plan.m_tiles(), 2);
        assert_eq!(plan.n_tiles(), 2);
        assert_eq!(plan.k_partitions(), 2);
        assert_eq!(plan.segments_per_partition(), 2);
        assert_eq!(plan.core_tiles(), 4);
    }

    #[test]
    fn test_rejects_non_dividing_partition() {
        // The canonical misconfiguration: M=5 with M_PERCORE=2.
        let dims = GemmDims::new(5, 4, 4);
        let part = CorePartition {
            m_percore: 2,
            k_percore: 4,
            n_percore: 4,
            k_once: 4,
        };
        let err = TilingPlan::new(dims, part).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Config(ConfigError::NotDivisible {
                name: "m",
                value: 5,
                divisor: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_non_dividing_segment() {
        let dims = GemmDims::new(4, 12, 4);
        let part = CorePartition {
            m_percore: 4,
            k_percore: 12,
            n_percore: 4,
            k_once: 5,
        };
        assert!(TilingPlan::new(dims, part).is_err());
    }

    #[test]
    fn test_rejects_zero_dims() {
        let part = CorePartition {
            m_percore: 1,
            k_percore: 1,
            n_percore: 1,
            k_once: 1,
        };
        assert!(TilingPlan::new(GemmDims::new(0, 1, 1), part).is_err());
        assert!(TilingPlan::new(GemmDims::new(1, 0, 1), part).is_err());
        assert!(TilingPlan::new(GemmDims::new(1, 1, 0), part).is_err());
    }

    #[test]
    fn test_rejects_zero_partition_extent() {
        let dims = GemmDims::new(4, 4, 4);
        let mut part = CorePartition::whole(dims);
        part.k_once = 0;
        assert!(TilingPlan::new(dims, part).is_err());
    }
}
