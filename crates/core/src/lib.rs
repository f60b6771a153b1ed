//! # Watertrace Core
//!
//! Core types, traits and I/O shared by the watertrace crates.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid used for every input and output layer
//! - `GeoTransform`: affine transformation carried from inputs to outputs
//! - Algorithm traits for a consistent API
//! - GeoTIFF reading and writing (the grid provider / grid writer boundary)

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::{Algorithm, ParallelAlgorithm};
}

/// Core trait for all algorithms in watertrace.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

/// Algorithms whose work splits into independent partitions that can run
/// on several threads and be merged afterwards.
pub trait ParallelAlgorithm: Algorithm {
    /// Execute with the work split across `threads` workers
    fn execute_parallel(
        &self,
        input: Self::Input,
        params: Self::Params,
        threads: usize,
    ) -> std::result::Result<Self::Output, Self::Error>;
}
