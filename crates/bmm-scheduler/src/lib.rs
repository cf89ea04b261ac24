//! `bmm-scheduler` - Tiled GEMM scheduling over pluggable tile backends.
//!
//! This crate provides:
//! - `GemmDims` / `CorePartition` / `TilingPlan` configuration with up-front
//!   validation of every divisibility invariant
//! - A `GemmScheduler` driving the core-tile, cache-segment, register-tile
//!   loop nest, sequentially or fanned out over rayon workers
//! - `TraceSink` progress events and a `tracing`-backed `LogSink`
//! - Core-tile-granular cancellation via `CancelToken`
//!
//! The tiling plan is a performance knob only: for the same operands and
//! initial C, every valid plan and backend produces bit-identical results.

pub mod cancel;
pub mod error;
pub mod plan;
pub mod scheduler;
pub mod trace;

// Re-export primary types at the crate root for convenience.
pub use cancel::CancelToken;
pub use error::{ConfigError, Result, ScheduleError};
pub use plan::{CorePartition, GemmDims, TilingPlan};
pub use scheduler::GemmScheduler;
pub use trace::{CoreTileTrace, LogSink, SegmentTrace, TraceSink};
