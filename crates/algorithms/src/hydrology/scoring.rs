//! Buffer width and buildup scoring of water-terminated paths

use super::d8::Cell;
use super::tracer::Path;
use super::traversability::TraversabilityParams;

/// Metrics derived from one path that reached water
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathScore {
    /// Land cells crossed, origin included, water excluded
    pub hydrologic_distance: i32,
    /// Natural cells since the last agricultural or urban cell
    pub buffer_width: i32,
    /// Cell the path started from
    pub origin: Cell,
    /// Last land cell before water; the buildup attribution key
    pub terminal: Cell,
    /// Agricultural buildup left after natural filtering
    pub agriculture: f64,
    /// Urban buildup left after natural filtering
    pub urban: f64,
}

impl PathScore {
    /// Whether the path carries any buildup into the water network
    pub fn has_buildup(&self) -> bool {
        self.agriculture + self.urban > 0.0
    }
}

/// Score a path that ended by entering water.
///
/// Each code is tested against the agriculture, urban and natural sets in
/// that order, independently. Agriculture and urban reset the width and add
/// one unit of their buildup; natural widens the buffer by one and removes a
/// fraction of both buildups (forest rate for forest codes, the non-forest
/// rate otherwise).
pub fn score(path: &Path, params: &TraversabilityParams) -> PathScore {
    let classes = &params.classes;
    let forest_keep = 1.0 - params.removal_rate_forest;
    let other_keep = 1.0 - params.removal_rate_nonforest;

    let mut width = 0_i32;
    let mut agriculture = 0.0_f64;
    let mut urban = 0.0_f64;

    for &code in path.sequence() {
        let member = classes.membership(code);

        if member.agriculture {
            width = 0;
            agriculture += 1.0;
        }

        if member.urban {
            width = 0;
            urban += 1.0;
        }

        if member.natural {
            width += 1;
            let keep = if member.forest { forest_keep } else { other_keep };
            agriculture *= keep;
            urban *= keep;
        }
    }

    PathScore {
        hydrologic_distance: path.len() as i32,
        buffer_width: width,
        origin: path.origin(),
        terminal: path.terminal(),
        agriculture,
        urban,
    }
}
