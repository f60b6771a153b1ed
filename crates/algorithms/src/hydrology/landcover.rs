//! Land-cover class membership
//!
//! Membership tests are independent: a code listed in two sets answers
//! `true` for both and gets both effects during scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Land-cover codes grouped by their role in a flow path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandCoverClasses {
    /// Codes that reset the buffer width and add agricultural buildup
    pub agriculture: BTreeSet<i32>,
    /// Codes that reset the buffer width and add urban buildup
    pub urban: BTreeSet<i32>,
    /// Natural cover that widens the buffer and filters buildup
    pub natural: BTreeSet<i32>,
    /// Subset of `natural` filtered at the forest removal rate
    pub forest: BTreeSet<i32>,
    /// Water bodies that end a path successfully
    pub water: BTreeSet<i32>,
    /// Other codes that end a path without reaching water
    pub stop: BTreeSet<i32>,
}

impl Default for LandCoverClasses {
    /// C-CAP regional scheme, with class 13 treated as natural rather than water.
    fn default() -> Self {
        Self {
            agriculture: [6, 7].into_iter().collect(),
            urban: [2, 3, 4, 5, 20].into_iter().collect(),
            natural: (8..=18).collect(),
            forest: [9, 10, 11].into_iter().collect(),
            water: [19, 21, 22, 23].into_iter().collect(),
            stop: BTreeSet::new(),
        }
    }
}

/// Set membership of a single code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Membership {
    pub agriculture: bool,
    pub urban: bool,
    pub natural: bool,
    pub forest: bool,
}

impl LandCoverClasses {
    pub fn membership(&self, code: i32) -> Membership {
        Membership {
            agriculture: self.agriculture.contains(&code),
            urban: self.urban.contains(&code),
            natural: self.natural.contains(&code),
            forest: self.forest.contains(&code),
        }
    }

    pub fn is_water(&self, code: i32) -> bool {
        self.water.contains(&code)
    }

    /// Whether `code` ends a path: water, an extra stop code, or `nodata`
    pub fn is_stop(&self, code: i32, nodata: i32) -> bool {
        code == nodata || self.water.contains(&code) || self.stop.contains(&code)
    }

    /// Codes listed in more than one of the agriculture, urban, natural and
    /// water sets, as `(first set, second set, code)`.
    pub fn overlaps(&self) -> Vec<(&'static str, &'static str, i32)> {
        let named = [
            ("agriculture", &self.agriculture),
            ("urban", &self.urban),
            ("natural", &self.natural),
            ("water", &self.water),
        ];

        let mut found = Vec::new();
        for (i, (name_a, set_a)) in named.iter().enumerate() {
            for (name_b, set_b) in &named[i + 1..] {
                for &code in set_a.intersection(set_b) {
                    found.push((*name_a, *name_b, code));
                }
            }
        }
        found
    }

    /// Forest codes that are not also natural; these never decay buildup
    /// because the forest rate only applies to natural cells.
    pub fn orphan_forest_codes(&self) -> Vec<i32> {
        self.forest.difference(&self.natural).copied().collect()
    }

    /// Log configuration smells. Scoring semantics are unchanged.
    pub fn warn_on_inconsistencies(&self) {
        for (a, b, code) in self.overlaps() {
            tracing::warn!(
                code,
                "land cover code is in both the {} and {} sets; both effects apply in scoring order",
                a,
                b
            );
        }
        let orphans = self.orphan_forest_codes();
        if !orphans.is_empty() {
            tracing::warn!(?orphans, "forest codes missing from the natural set are ignored");
        }
    }
}
