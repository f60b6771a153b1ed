//! Termination classification and the status codes shared with the output grids
//!
//! The hydrologic distance and buffer width grids are overloaded channels:
//! a cell holds either a measurement or one of the codes below. Consumers
//! must treat every value listed here as a status, not a distance or width.
//!
//! | code | meaning |
//! |------|---------|
//! | nodata (999) | not traced: nodata, water, no-flow or outside the corridor |
//! | 2000 | hydrologically inactive, path longer than the length limit |
//! | 3000 | invalid flow direction met along the path |
//! | 4000 | cyclic flow, the path revisited a cell |
//! | 5000 | the path flowed off the grid |
//! | 6000 | stopped on nodata or a non-water stop class |

use super::tracer::Path;

/// Status codes written in place of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    HydrologicallyInactive,
    InvalidDirection,
    Cyclic,
    OffGrid,
    NonWaterStop,
}

impl StatusCode {
    pub const ALL: [StatusCode; 5] = [
        StatusCode::HydrologicallyInactive,
        StatusCode::InvalidDirection,
        StatusCode::Cyclic,
        StatusCode::OffGrid,
        StatusCode::NonWaterStop,
    ];

    pub fn code(self) -> i32 {
        match self {
            StatusCode::HydrologicallyInactive => 2000,
            StatusCode::InvalidDirection => 3000,
            StatusCode::Cyclic => 4000,
            StatusCode::OffGrid => 5000,
            StatusCode::NonWaterStop => 6000,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCode::HydrologicallyInactive => "hydrologically inactive",
            StatusCode::InvalidDirection => "invalid flow direction",
            StatusCode::Cyclic => "cyclic flow",
            StatusCode::OffGrid => "off grid",
            StatusCode::NonWaterStop => "non-water stop",
        }
    }
}

/// Why the tracer stopped walking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Entered a water cell; the path goes on to scoring
    WaterReached,
    Status(StatusCode),
}

/// One cell of an overloaded output channel, flattened only at assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    Nodata,
    Metric(i32),
    Status(StatusCode),
}

impl CellValue {
    pub fn flatten(self, nodata: i32) -> i32 {
        match self {
            CellValue::Nodata => nodata,
            CellValue::Metric(v) => v,
            CellValue::Status(s) => s.code(),
        }
    }
}

/// Per-origin result for the two cell-local output grids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellOutcome {
    pub hydrologic_distance: CellValue,
    pub buffer_width: CellValue,
}

impl CellOutcome {
    /// Origin excluded before tracing
    pub const NOT_TRACED: CellOutcome = CellOutcome {
        hydrologic_distance: CellValue::Nodata,
        buffer_width: CellValue::Nodata,
    };

    /// Outcome of a path that stopped without reaching water.
    ///
    /// Cyclic and invalid-direction stops still report how far the path got
    /// in the distance channel; the other statuses fill both channels.
    pub fn for_status(status: StatusCode, path: &Path) -> CellOutcome {
        let distance = match status {
            StatusCode::Cyclic | StatusCode::InvalidDirection => {
                CellValue::Metric(path.len() as i32)
            }
            _ => CellValue::Status(status),
        };
        CellOutcome {
            hydrologic_distance: distance,
            buffer_width: CellValue::Status(status),
        }
    }

    pub fn water(hydrologic_distance: i32, buffer_width: i32) -> CellOutcome {
        CellOutcome {
            hydrologic_distance: CellValue::Metric(hydrologic_distance),
            buffer_width: CellValue::Metric(buffer_width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::d8::Cell;

    #[test]
    fn test_codes_roundtrip() {
        for status in StatusCode::ALL {
            assert_eq!(StatusCode::from_code(status.code()), Some(status));
        }
        assert_eq!(StatusCode::from_code(999), None);
        assert_eq!(StatusCode::from_code(1000), None);
    }

    #[test]
    fn test_flatten() {
        assert_eq!(CellValue::Nodata.flatten(999), 999);
        assert_eq!(CellValue::Metric(7).flatten(999), 7);
        assert_eq!(CellValue::Status(StatusCode::OffGrid).flatten(999), 5000);
    }

    #[test]
    fn test_status_outcomes() {
        let path = Path::new(Cell::new(0, 0), 8, 1);

        let cyclic = CellOutcome::for_status(StatusCode::Cyclic, &path);
        assert_eq!(cyclic.hydrologic_distance, CellValue::Metric(1));
        assert_eq!(cyclic.buffer_width.flatten(999), 4000);

        let invalid = CellOutcome::for_status(StatusCode::InvalidDirection, &path);
        assert_eq!(invalid.hydrologic_distance, CellValue::Metric(1));
        assert_eq!(invalid.buffer_width.flatten(999), 3000);

        for status in [
            StatusCode::OffGrid,
            StatusCode::HydrologicallyInactive,
            StatusCode::NonWaterStop,
        ] {
            let outcome = CellOutcome::for_status(status, &path);
            assert_eq!(outcome.hydrologic_distance.flatten(999), status.code());
            assert_eq!(outcome.buffer_width.flatten(999), status.code());
        }
    }
}
