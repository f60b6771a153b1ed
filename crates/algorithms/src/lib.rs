//! # Watertrace Algorithms
//!
//! Hydrologic traversability of watershed rasters: every land cell's D8
//! flow path is traced to water and scored for distance, natural buffer
//! width and agricultural/urban buildup.
//!
//! ```ignore
//! use watertrace_algorithms::prelude::*;
//!
//! let inputs = TraversabilityInputs::new(land_cover, flow_direction, corridor)?;
//! let run = traversability(&inputs, &TraversabilityParams::default())?;
//! for (name, grid) in run.outputs.layers() {
//!     println!("{name}: {:?}", grid.shape());
//! }
//! ```

pub mod hydrology;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        traversability, LandCoverClasses, RunSummary, StatusCode, Traversability,
        TraversabilityInputs, TraversabilityOutputs, TraversabilityParams, TraversabilityRun,
    };
    pub use watertrace_core::prelude::*;
}
