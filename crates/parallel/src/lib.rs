//! # Watertrace Parallel
//!
//! Execution strategies for per-cell raster passes.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, all cores, or a fixed worker count
//! - `RowBands`: contiguous row ranges used as independent units of work
//!
//! Without the `parallel` feature every mode runs on the calling thread.

pub mod bands;
pub mod strategy;

pub use bands::{RowBand, RowBands};
pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
