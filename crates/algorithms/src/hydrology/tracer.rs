//! Flow path tracer
//!
//! Walks the D8 chain from one origin cell until a stop condition fires.
//! The walk is an explicit loop bounded by `max_flow_length`, so a path holds
//! at most `max_flow_length + 1` cells.

use super::d8::{self, Cell};
use super::termination::{StatusCode, Termination};
use super::traversability::{TraversabilityInputs, TraversabilityParams};

/// The cells visited from one origin, origin first.
///
/// `sequence[i]` is the land cover of `history[i]`. The water cell that ends
/// a successful path is never appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    sequence: Vec<i32>,
    history: Vec<Cell>,
    direction: i32,
}

impl Path {
    pub fn new(origin: Cell, land_cover: i32, direction: i32) -> Self {
        Self {
            sequence: vec![land_cover],
            history: vec![origin],
            direction,
        }
    }

    pub fn origin(&self) -> Cell {
        self.history[0]
    }

    /// Last land cell entered; for a water-terminated path this is where the
    /// path enters the water network.
    pub fn terminal(&self) -> Cell {
        self.history[self.history.len() - 1]
    }

    /// Land-cover codes visited, origin first
    pub fn sequence(&self) -> &[i32] {
        &self.sequence
    }

    /// Coordinates visited, origin first
    pub fn history(&self) -> &[Cell] {
        &self.history
    }

    /// D8 code that drives the next step
    pub fn direction(&self) -> i32 {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn visited(&self, cell: Cell) -> bool {
        self.history.contains(&cell)
    }

    fn advance(&mut self, cell: Cell, land_cover: i32, direction: i32) {
        self.history.push(cell);
        self.sequence.push(land_cover);
        self.direction = direction;
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, cell: Cell, land_cover: i32) {
        self.advance(cell, land_cover, self.direction);
    }
}

/// Whether an origin is skipped without tracing: no-flow or nodata flow
/// direction, nodata or water land cover, or outside the corridor.
pub fn is_excluded(
    row: usize,
    col: usize,
    inputs: &TraversabilityInputs,
    params: &TraversabilityParams,
) -> bool {
    let direction = inputs.flow_direction.data()[(row, col)];
    let land_cover = inputs.land_cover.data()[(row, col)];
    let corridor = inputs.corridor_mask.data()[(row, col)];

    inputs.is_no_flow(direction)
        || land_cover == params.nodata
        || params.classes.is_water(land_cover)
        || corridor == 0
}

/// Trace the flow path starting at `(row, col)`.
///
/// Stop conditions, first match wins:
/// 1. the next cell is already in the path: cyclic
/// 2. the next cell is past the south, east or west edge: off grid
/// 3. the path already exceeds `max_flow_length`: hydrologically inactive
/// 4. the current direction is not a D8 code: invalid direction
/// 5. the next cell is water: water reached; nodata or another stop
///    class: non-water stop
///
/// An invalid direction has no next cell, so checks 1 and 2 do not apply to
/// it. Otherwise the path moves on and the next direction is read from the
/// cell just entered.
pub fn trace(
    row: usize,
    col: usize,
    inputs: &TraversabilityInputs,
    params: &TraversabilityParams,
) -> (Termination, Path) {
    let (rows, cols) = inputs.shape();
    let land_cover = inputs.land_cover.data();
    let flow_direction = inputs.flow_direction.data();

    let mut path = Path::new(
        Cell::new(row, col),
        land_cover[(row, col)],
        flow_direction[(row, col)],
    );

    loop {
        let step = match d8::downstream(path.terminal(), path.direction()) {
            Some(next) => {
                if path.visited(next) {
                    return (Termination::Status(StatusCode::Cyclic), path);
                }
                // No `row < 0` test here: above the first row the walk keeps
                // reading the wrapped row unless `wrap_north_edge` is off.
                match next.resolve(rows, cols, params.wrap_north_edge) {
                    Some(index) => Some((next, index)),
                    None => return (Termination::Status(StatusCode::OffGrid), path),
                }
            }
            None => None,
        };

        if path.len() > params.max_flow_length {
            return (
                Termination::Status(StatusCode::HydrologicallyInactive),
                path,
            );
        }

        let Some((next, index)) = step else {
            return (Termination::Status(StatusCode::InvalidDirection), path);
        };

        let code = land_cover[index];
        if params.classes.is_stop(code, params.nodata) {
            let termination = if params.classes.is_water(code) {
                Termination::WaterReached
            } else {
                Termination::Status(StatusCode::NonWaterStop)
            };
            return (termination, path);
        }

        path.advance(next, code, flow_direction[index]);
    }
}
