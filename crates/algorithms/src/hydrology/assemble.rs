//! Grid assembly: per-cell outcomes and the buildup aggregator to six rasters

use super::buildup::BuildupAggregator;
use super::termination::CellOutcome;
use ndarray::Array2;
use watertrace_core::{Error, Raster, Result};

/// Fill and nodata value of the max buffer width grid
pub const MAX_WIDTH_NODATA: i32 = -999;

/// The six output grids of a traversability run, all shaped and
/// georeferenced like the land cover input.
///
/// `hydrologic_distance` and `buffer_width` hold either a measurement or a
/// status code (see [`crate::hydrology::termination`]).
#[derive(Debug, Clone)]
pub struct TraversabilityOutputs {
    pub hydrologic_distance: Raster<i32>,
    pub buffer_width: Raster<i32>,
    pub max_buffer_width: Raster<i32>,
    pub buildup_ag: Raster<i32>,
    pub buildup_urban: Raster<i32>,
    pub buildup_combined: Raster<i32>,
}

impl TraversabilityOutputs {
    /// Layers with the file stem each is written under
    pub fn layers(&self) -> [(&'static str, &Raster<i32>); 6] {
        [
            ("hydist", &self.hydrologic_distance),
            ("buffwid", &self.buffer_width),
            ("buffwidmax", &self.max_buffer_width),
            ("buildup_ag", &self.buildup_ag),
            ("buildup_urban", &self.buildup_urban),
            ("buildup_ag_and_urban", &self.buildup_combined),
        ]
    }
}

/// Build the output grids.
///
/// `outcomes` holds one entry per cell in row-major order. Buildup values are
/// truncated toward zero when stored in the integer grids.
pub fn assemble(
    template: &Raster<i32>,
    outcomes: &[CellOutcome],
    aggregator: &BuildupAggregator,
    nodata: i32,
) -> Result<TraversabilityOutputs> {
    let (rows, cols) = template.shape();
    if outcomes.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let channel = |pick: &dyn Fn(&CellOutcome) -> i32| -> Result<Raster<i32>> {
        let data: Vec<i32> = outcomes.iter().map(pick).collect();
        let mut raster = template.like_filled(nodata, Some(nodata));
        *raster.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(raster)
    };

    let hydrologic_distance = channel(&|o: &CellOutcome| o.hydrologic_distance.flatten(nodata))?;
    let buffer_width = channel(&|o: &CellOutcome| o.buffer_width.flatten(nodata))?;

    let mut max_buffer_width = template.like_filled(MAX_WIDTH_NODATA, Some(MAX_WIDTH_NODATA));
    for (cell, width) in aggregator.max_widths() {
        if let Some(index) = cell.resolve(rows, cols, true) {
            max_buffer_width.data_mut()[index] = width;
        }
    }

    let mut buildup_ag = template.like_filled(nodata, Some(nodata));
    let mut buildup_urban = template.like_filled(nodata, Some(nodata));
    let mut buildup_combined = template.like_filled(nodata, Some(nodata));
    for (cell, b) in aggregator.buildup() {
        let Some(index) = cell.resolve(rows, cols, true) else {
            continue;
        };
        if b.agriculture >= 0.0 {
            buildup_ag.data_mut()[index] = b.agriculture as i32;
        }
        if b.urban >= 0.0 {
            buildup_urban.data_mut()[index] = b.urban as i32;
        }
        buildup_combined.data_mut()[index] = b.combined() as i32;
    }

    Ok(TraversabilityOutputs {
        hydrologic_distance,
        buffer_width,
        max_buffer_width,
        buildup_ag,
        buildup_urban,
        buildup_combined,
    })
}
