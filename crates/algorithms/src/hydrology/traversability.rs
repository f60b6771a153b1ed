//! Hydrologic traversability of a watershed raster
//!
//! For every cell inside the analysis corridor, follows the D8 flow path
//! downstream and derives:
//! - hydrologic distance: land cells crossed before reaching water
//! - buffer width: natural cells between the last agricultural/urban cell
//!   and the water
//! - buildup: agricultural and urban load left after natural filtering,
//!   summed at the land cell where each path enters the water network
//!
//! The grid is cut into row bands that are traced independently, each
//! with its own [`BuildupAggregator`]; the band aggregators are merged and
//! the six output grids assembled once at the end.

use super::assemble::{assemble, TraversabilityOutputs};
use super::buildup::BuildupAggregator;
use super::landcover::LandCoverClasses;
use super::scoring::score;
use super::termination::{CellOutcome, StatusCode, Termination};
use super::tracer::{is_excluded, trace};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Instant;
use watertrace_core::raster::Raster;
use watertrace_core::{Algorithm, Error, ParallelAlgorithm, Result};
use watertrace_parallel::{ParallelStrategy, ProcessingMode, RowBand, RowBands};

/// Bands per worker; more than one keeps workers busy when some bands
/// hold mostly excluded cells.
const BANDS_PER_WORKER: usize = 4;

/// Parameters for a traversability run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversabilityParams {
    /// Land-cover class sets
    pub classes: LandCoverClasses,
    /// Longest path, in cells, before a cell counts as hydrologically
    /// inactive. Default: 10 (about 100 m at 10 m cells)
    pub max_flow_length: usize,
    /// Fraction of buildup removed by each forest cell. Default: 0.0
    pub removal_rate_forest: f64,
    /// Fraction of buildup removed by each other natural cell. Default: 0.0
    pub removal_rate_nonforest: f64,
    /// Land cover nodata code and output nodata value. Default: 999
    pub nodata: i32,
    /// Keep reading wrapped rows when a path steps above the first row,
    /// instead of reporting off-grid. Default: true
    pub wrap_north_edge: bool,
    /// Execution mode
    #[serde(skip)]
    pub mode: ProcessingMode,
}

impl Default for TraversabilityParams {
    fn default() -> Self {
        Self {
            classes: LandCoverClasses::default(),
            max_flow_length: 10,
            removal_rate_forest: 0.0,
            removal_rate_nonforest: 0.0,
            nodata: 999,
            wrap_north_edge: true,
            mode: ProcessingMode::default(),
        }
    }
}

impl TraversabilityParams {
    /// Reject parameters that would break the non-negative buildup invariant
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("removal_rate_forest", self.removal_rate_forest),
            ("removal_rate_nonforest", self.removal_rate_nonforest),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::InvalidParameter {
                    name,
                    value: rate.to_string(),
                    reason: "must be within [0, 1]".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The three aligned input grids
#[derive(Debug, Clone)]
pub struct TraversabilityInputs {
    /// Land-cover class codes
    pub land_cover: Raster<i32>,
    /// D8 codes; `0` and the raster's nodata value mean no flow
    pub flow_direction: Raster<i32>,
    /// Non-zero inside the analysis corridor
    pub corridor_mask: Raster<i32>,
}

impl TraversabilityInputs {
    /// Bundle the input grids, failing if their shapes differ or are empty
    pub fn new(
        land_cover: Raster<i32>,
        flow_direction: Raster<i32>,
        corridor_mask: Raster<i32>,
    ) -> Result<Self> {
        if land_cover.is_empty() {
            return Err(Error::InvalidDimensions {
                width: land_cover.cols(),
                height: land_cover.rows(),
            });
        }
        land_cover.ensure_same_shape(&flow_direction, "flow direction")?;
        land_cover.ensure_same_shape(&corridor_mask, "corridor mask")?;

        Ok(Self {
            land_cover,
            flow_direction,
            corridor_mask,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.land_cover.shape()
    }

    /// Whether a flow direction value is the no-flow / nodata sentinel
    pub fn is_no_flow(&self, direction: i32) -> bool {
        direction == 0 || self.flow_direction.nodata() == Some(direction)
    }
}

/// Count of origin cells per outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Origins skipped before tracing
    pub excluded: usize,
    pub water_reached: usize,
    pub hydrologically_inactive: usize,
    pub invalid_direction: usize,
    pub cyclic: usize,
    pub off_grid: usize,
    pub non_water_stop: usize,
}

impl RunSummary {
    pub fn record(&mut self, termination: Option<Termination>) {
        match termination {
            None => self.excluded += 1,
            Some(Termination::WaterReached) => self.water_reached += 1,
            Some(Termination::Status(status)) => *self.status_mut(status) += 1,
        }
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.excluded += other.excluded;
        self.water_reached += other.water_reached;
        for status in StatusCode::ALL {
            *self.status_mut(status) += other.status(status);
        }
    }

    pub fn status(&self, status: StatusCode) -> usize {
        match status {
            StatusCode::HydrologicallyInactive => self.hydrologically_inactive,
            StatusCode::InvalidDirection => self.invalid_direction,
            StatusCode::Cyclic => self.cyclic,
            StatusCode::OffGrid => self.off_grid,
            StatusCode::NonWaterStop => self.non_water_stop,
        }
    }

    fn status_mut(&mut self, status: StatusCode) -> &mut usize {
        match status {
            StatusCode::HydrologicallyInactive => &mut self.hydrologically_inactive,
            StatusCode::InvalidDirection => &mut self.invalid_direction,
            StatusCode::Cyclic => &mut self.cyclic,
            StatusCode::OffGrid => &mut self.off_grid,
            StatusCode::NonWaterStop => &mut self.non_water_stop,
        }
    }

    /// Origins that were traced
    pub fn traced(&self) -> usize {
        self.water_reached + StatusCode::ALL.iter().map(|&s| self.status(s)).sum::<usize>()
    }

    /// Every origin seen
    pub fn total(&self) -> usize {
        self.excluded + self.traced()
    }
}

/// Results for a contiguous range of rows, before assembly
#[derive(Debug, Clone, Default)]
pub struct PartialRun {
    /// One outcome per cell, row-major over the range
    pub outcomes: Vec<CellOutcome>,
    pub aggregator: BuildupAggregator,
    pub summary: RunSummary,
}

impl PartialRun {
    /// Append a later range of rows
    pub fn append(&mut self, other: PartialRun) {
        self.outcomes.extend(other.outcomes);
        self.aggregator.merge_from(other.aggregator);
        self.summary.merge(&other.summary);
    }
}

/// A finished run: the output grids and what happened to each origin
#[derive(Debug, Clone)]
pub struct TraversabilityRun {
    pub outputs: TraversabilityOutputs,
    pub summary: RunSummary,
    /// Distinct land cells through which paths entered water
    pub entry_cells: usize,
}

/// Trace and score one origin, folding a water-terminated path into
/// `aggregator`. Returns `None` as termination for excluded origins.
pub fn evaluate_origin(
    row: usize,
    col: usize,
    inputs: &TraversabilityInputs,
    params: &TraversabilityParams,
    aggregator: &mut BuildupAggregator,
) -> (CellOutcome, Option<Termination>) {
    if is_excluded(row, col, inputs, params) {
        return (CellOutcome::NOT_TRACED, None);
    }

    let (termination, path) = trace(row, col, inputs, params);
    let outcome = match termination {
        Termination::WaterReached => {
            let scored = score(&path, params);
            aggregator.record(&scored);
            CellOutcome::water(scored.hydrologic_distance, scored.buffer_width)
        }
        Termination::Status(status) => CellOutcome::for_status(status, &path),
    };
    (outcome, Some(termination))
}

/// Trace every origin in `rows` with a fresh aggregator
pub fn trace_rows(
    inputs: &TraversabilityInputs,
    params: &TraversabilityParams,
    rows: Range<usize>,
) -> PartialRun {
    let (_, cols) = inputs.shape();
    let mut partial = PartialRun {
        outcomes: Vec::with_capacity(rows.len() * cols),
        ..PartialRun::default()
    };

    for row in rows {
        for col in 0..cols {
            let (outcome, termination) =
                evaluate_origin(row, col, inputs, params, &mut partial.aggregator);
            partial.outcomes.push(outcome);
            partial.summary.record(termination);
        }
    }
    partial
}

fn trace_band(band: RowBand, inputs: &TraversabilityInputs, params: &TraversabilityParams) -> PartialRun {
    let partial = trace_rows(inputs, params, band.rows());
    tracing::debug!(
        band = band.index,
        start_row = band.start,
        end_row = band.end,
        water_reached = partial.summary.water_reached,
        "row band traced"
    );
    partial
}

/// Run the traversability analysis over the whole grid.
///
/// # Arguments
/// * `inputs` - Aligned land cover, flow direction and corridor grids
/// * `params` - Class sets, limits, removal rates and execution mode
///
/// # Returns
/// The six output grids and a per-outcome summary. Fails only on invalid
/// parameters; per-cell outcomes are encoded in the grids.
pub fn traversability(
    inputs: &TraversabilityInputs,
    params: &TraversabilityParams,
) -> Result<TraversabilityRun> {
    params.validate()?;
    params.classes.warn_on_inconsistencies();

    let (rows, cols) = inputs.shape();
    let start = Instant::now();

    let bands: Vec<RowBand> = RowBands::split(rows, params.mode.workers() * BANDS_PER_WORKER)
        .iter()
        .collect();
    let partials = params
        .mode
        .par_map(0..bands.len(), |i| trace_band(bands[i], inputs, params));

    let mut run = PartialRun {
        outcomes: Vec::with_capacity(rows * cols),
        ..PartialRun::default()
    };
    for partial in partials {
        run.append(partial);
    }

    let outputs = assemble(&inputs.land_cover, &run.outcomes, &run.aggregator, params.nodata)?;
    let summary = run.summary;

    tracing::info!(
        rows,
        cols,
        bands = bands.len(),
        traced = summary.traced(),
        water_reached = summary.water_reached,
        entry_cells = run.aggregator.entry_count(),
        elapsed = ?start.elapsed(),
        "traversability finished"
    );

    Ok(TraversabilityRun {
        outputs,
        summary,
        entry_cells: run.aggregator.entry_count(),
    })
}

/// Traversability algorithm
#[derive(Debug, Clone, Default)]
pub struct Traversability;

impl Algorithm for Traversability {
    type Input = TraversabilityInputs;
    type Output = TraversabilityRun;
    type Params = TraversabilityParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Traversability"
    }

    fn description(&self) -> &'static str {
        "Trace D8 flow paths to water and score distance, buffer width and buildup"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        traversability(&input, &params)
    }
}

impl ParallelAlgorithm for Traversability {
    fn execute_parallel(
        &self,
        input: Self::Input,
        params: Self::Params,
        threads: usize,
    ) -> Result<Self::Output> {
        let params = TraversabilityParams {
            mode: ProcessingMode::from_threads(threads),
            ..params
        };
        traversability(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_inputs(land_cover: &[i32], flow_direction: &[i32]) -> TraversabilityInputs {
        let n = land_cover.len();
        TraversabilityInputs::new(
            Raster::from_vec(land_cover.to_vec(), 1, n).unwrap(),
            Raster::from_vec(flow_direction.to_vec(), 1, n).unwrap(),
            Raster::filled(1, n, 1),
        )
        .unwrap()
    }

    #[test]
    fn test_inputs_reject_mismatched_shapes() {
        let err = TraversabilityInputs::new(
            Raster::filled(3, 3, 8),
            Raster::filled(3, 4, 1),
            Raster::filled(3, 3, 1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { layer: "flow direction", .. }));

        let err = TraversabilityInputs::new(
            Raster::filled(3, 3, 8),
            Raster::filled(3, 3, 1),
            Raster::filled(2, 3, 1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { layer: "corridor mask", .. }));

        assert!(TraversabilityInputs::new(Raster::new(0, 0), Raster::new(0, 0), Raster::new(0, 0)).is_err());
    }

    #[test]
    fn test_validate_removal_rates() {
        assert!(TraversabilityParams::default().validate().is_ok());
        let bad = TraversabilityParams {
            removal_rate_forest: 1.5,
            ..TraversabilityParams::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidParameter { name: "removal_rate_forest", .. })
        ));
        let nan = TraversabilityParams {
            removal_rate_nonforest: f64::NAN,
            ..TraversabilityParams::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_params_from_json() {
        let params: TraversabilityParams = serde_json::from_str(
            r#"{ "max_flow_length": 30, "removal_rate_forest": 0.9,
                 "classes": { "water": [25] } }"#,
        )
        .unwrap();
        assert_eq!(params.max_flow_length, 30);
        assert_eq!(params.removal_rate_forest, 0.9);
        assert_eq!(params.removal_rate_nonforest, 0.0);
        assert_eq!(params.nodata, 999);
        assert!(params.classes.water.contains(&25));
        assert_eq!(params.mode, ProcessingMode::Parallel);
    }

    #[test]
    fn test_summary_counts_every_cell() {
        // default classes: 8 natural, 21 water, 6 agriculture
        let inputs = row_inputs(&[8, 6, 21, 8, 8, 999], &[1, 1, 1, 16, 1, 1]);
        let run = traversability(&inputs, &TraversabilityParams::default()).unwrap();

        // (0,0),(0,1) reach water; (0,2) water, (0,5) nodata excluded;
        // (0,3)->(0,2) water; (0,4)->(0,5) nodata stop.
        assert_eq!(run.summary.total(), 6);
        assert_eq!(run.summary.excluded, 2);
        assert_eq!(run.summary.water_reached, 3);
        assert_eq!(run.summary.non_water_stop, 1);
        assert_eq!(run.entry_cells, 2);
    }

    #[test]
    fn test_algorithm_trait() {
        let inputs = row_inputs(&[8, 8, 21], &[1, 1, 1]);
        let algo = Traversability;
        assert_eq!(algo.name(), "Traversability");

        let sequential = algo.execute_parallel(inputs.clone(), TraversabilityParams::default(), 1).unwrap();
        let parallel = algo.execute_default(inputs).unwrap();
        assert_eq!(
            sequential.outputs.hydrologic_distance.data(),
            parallel.outputs.hydrologic_distance.data()
        );
        assert_eq!(sequential.outputs.hydrologic_distance.get(0, 0).unwrap(), 2);
    }
}
