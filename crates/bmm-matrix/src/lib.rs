//! `bmm-matrix` - Strided matrix storage and bank-aware layout planning.
//!
//! This crate provides:
//! - A flat, row-major `Matrix<T>` with an explicit padded stride
//! - Borrowed `TileView` windows handed to compute backends
//! - An `AccumulatorTile` of running i32 sums for one register tile
//! - A padding planner that keeps row starts spread across memory banks

pub mod error;
pub mod layout;
pub mod matrix;

// Re-export primary types at the crate root for convenience.
pub use error::{LayoutError, Result};
pub use layout::{padded_stride, BankConfig};
pub use matrix::{AccumulatorTile, Matrix, TileView};
