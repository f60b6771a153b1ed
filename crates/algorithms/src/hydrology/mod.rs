//! Flow-path traversability over D8 grids
//!
//! - D8: direction codes and neighbour offsets
//! - Land cover: class sets and membership tests
//! - Tracer: follows one flow path until it stops
//! - Termination: status codes and per-cell outcomes
//! - Scoring: hydrologic distance, buffer width and decayed buildup
//! - Buildup: per-entry-cell accumulation, mergeable across bands
//! - Assemble: the six output grids
//! - Traversability: the full run, row-band parallel

pub mod assemble;
pub mod buildup;
pub mod d8;
pub mod landcover;
pub mod scoring;
pub mod termination;
pub mod tracer;
mod traversability;

pub use assemble::{assemble, TraversabilityOutputs, MAX_WIDTH_NODATA};
pub use buildup::{Buildup, BuildupAggregator};
pub use d8::{Cell, D8_CODES};
pub use landcover::{LandCoverClasses, Membership};
pub use scoring::{score, PathScore};
pub use termination::{CellOutcome, CellValue, StatusCode, Termination};
pub use tracer::{is_excluded, trace, Path};
pub use traversability::{
    evaluate_origin, trace_rows, traversability, PartialRun, RunSummary, Traversability,
    TraversabilityInputs, TraversabilityParams, TraversabilityRun,
};
