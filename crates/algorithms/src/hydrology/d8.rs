//! D8 flow direction stepping
//!
//! Flow direction encoding (ESRI power-of-two codes):
//! ```text
//!   32  64  128
//!   16   x    1
//!    8   4    2
//! ```

/// A grid position as (row, col), row increasing downward.
///
/// Signed so that a step above the first row keeps its negative row; see
/// [`Cell::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: isize,
    pub col: isize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            row: row as isize,
            col: col as isize,
        }
    }

    /// Array index of this cell in a `rows` x `cols` grid.
    ///
    /// Negative rows index from the bottom (`row + rows`) when `wrap_north`
    /// is set, which is how a path that steps over the north edge reads the
    /// grid. Anything else outside the grid resolves to `None`.
    pub fn resolve(&self, rows: usize, cols: usize, wrap_north: bool) -> Option<(usize, usize)> {
        if self.col < 0 || self.col >= cols as isize {
            return None;
        }
        let row = if self.row < 0 && wrap_north {
            self.row + rows as isize
        } else {
            self.row
        };
        if row < 0 || row >= rows as isize {
            return None;
        }
        Some((row as usize, self.col as usize))
    }
}

/// The eight valid D8 codes, clockwise from east
pub const D8_CODES: [i32; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// (row, col) offset for a D8 code, `None` for anything that is not one of
/// the eight codes (pits, flats, nodata, multi-direction sums).
pub fn offset(code: i32) -> Option<(isize, isize)> {
    match code {
        1 => Some((0, 1)),
        2 => Some((1, 1)),
        4 => Some((1, 0)),
        8 => Some((1, -1)),
        16 => Some((0, -1)),
        32 => Some((-1, -1)),
        64 => Some((-1, 0)),
        128 => Some((-1, 1)),
        _ => None,
    }
}

pub fn is_valid(code: i32) -> bool {
    offset(code).is_some()
}

/// Neighbour of `cell` in direction `code`. The result may lie outside the grid.
pub fn downstream(cell: Cell, code: i32) -> Option<Cell> {
    offset(code).map(|(dr, dc)| Cell {
        row: cell.row + dr,
        col: cell.col + dc,
    })
}
