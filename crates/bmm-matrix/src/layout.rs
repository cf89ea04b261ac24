use crate::error::{LayoutError, Result};

/// Description of the banked memory that tile loads are served from.
///
/// Rows of a padded matrix should start in different banks, otherwise
/// back-to-back row loads pile onto one bank. Bank interleaving happens at
/// line granularity, so the planner works in units of whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankConfig {
    /// Number of interleaved banks row loads are spread across.
    pub bank_count: usize,
    /// Bytes served by one bank line (the interleave granularity).
    pub line_bytes: usize,
}

impl BankConfig {
    pub fn new(bank_count: usize, line_bytes: usize) -> Self {
        BankConfig {
            bank_count,
            line_bytes,
        }
    }
}

impl Default for BankConfig {
    /// 8 banks of 64-byte lines, the shape of the L2 the engine was tuned on.
    fn default() -> Self {
        BankConfig::new(8, 64)
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Computes the padded row stride, in elements, for a row of `logical`
/// elements of `elem_size` bytes each.
///
/// The row is rounded up to a whole number of bank lines, then extended one
/// line at a time until the stride measured in lines is coprime with the
/// bank count. Consecutive row starts then walk every bank before repeating,
/// so no bank becomes a hotspot. The result is the smallest such stride and
/// is a pure function of its inputs.
///
/// With `bank_count == 1` every line count is coprime, so the planner
/// degrades to plain line rounding.
///
/// # Errors
/// Returns a `LayoutError` if `logical`, `elem_size`, the bank count, or the
/// line size is zero, or if a line does not hold a whole number of elements.
pub fn padded_stride(logical: usize, elem_size: usize, banks: &BankConfig) -> Result<usize> {
    if logical == 0 {
        return Err(LayoutError::ZeroWidth);
    }
    if elem_size == 0 {
        return Err(LayoutError::ZeroElemSize);
    }
    if banks.bank_count == 0 {
        return Err(LayoutError::ZeroBankCount);
    }
    if banks.line_bytes == 0 {
        return Err(LayoutError::ZeroLineSize);
    }
    if banks.line_bytes % elem_size != 0 {
        return Err(LayoutError::LineNotElementAligned {
            line_bytes: banks.line_bytes,
            elem_size,
        });
    }

    let line_elems = banks.line_bytes / elem_size;
    let row_bytes = logical * elem_size;
    let mut lines = row_bytes.div_ceil(banks.line_bytes);
    while gcd(lines, banks.bank_count) != 1 {
        lines += 1;
    }
    Ok(lines * line_elems)
}
