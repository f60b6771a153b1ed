//! Error types for watertrace
//!
//! Only structural failures live here: a run that hits one of these is
//! aborted. Per-cell flow outcomes (off-grid, cyclic, ...) are encoded in the
//! output grids and never surface as errors.

use thiserror::Error;

/// Main error type for watertrace operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch for {layer}: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch {
        layer: &'static str,
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for watertrace operations
pub type Result<T> = std::result::Result<T, Error>;
