use crate::error::ScheduleError;

/// Coordinates of one completed (core tile, k partition, cache segment)
/// triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentTrace {
    pub m_outer: usize,
    pub n_outer: usize,
    pub k_outer: usize,
    pub k_inner: usize,
    /// Linear index of the (m_outer, n_outer, k_outer) pass, matching the
    /// core numbering emitted by the hardware verification traces.
    pub core_index: usize,
}

/// Coordinates of one completed core tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreTileTrace {
    pub m_outer: usize,
    pub n_outer: usize,
}

/// Progress sink notified at well-defined points of a multiply call.
///
/// Events are informational only and never drive control flow. With the
/// parallel driver, events from different core tiles may interleave; events
/// within one core tile stay ordered. All methods default to no-ops, so a
/// sink implements only what it cares about.
pub trait TraceSink: Send + Sync {
    /// One cache segment of one core tile finished.
    fn segment_complete(&self, trace: &SegmentTrace) {
        let _ = trace;
    }

    /// A whole core tile finished and its C region is final.
    fn core_tile_complete(&self, trace: &CoreTileTrace) {
        let _ = trace;
    }

    /// The multiply call finished and C holds the exact result.
    fn call_complete(&self) {}

    /// The multiply call aborted; the error carries the failing coordinates.
    fn call_failed(&self, error: &ScheduleError) {
        let _ = error;
    }
}

/// Sink that forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn segment_complete(&self, trace: &SegmentTrace) {
        tracing::debug!(
            core = trace.core_index,
            m_outer = trace.m_outer,
            n_outer = trace.n_outer,
            k_outer = trace.k_outer,
            k_inner = trace.k_inner,
            "segment complete"
        );
    }

    fn core_tile_complete(&self, trace: &CoreTileTrace) {
        tracing::debug!(
            m_outer = trace.m_outer,
            n_outer = trace.n_outer,
            "core tile complete"
        );
    }

    fn call_complete(&self) {
        tracing::info!("multiply complete");
    }

    fn call_failed(&self, error: &ScheduleError) {
        tracing::error!(error = %error, "multiply failed");
    }
}
