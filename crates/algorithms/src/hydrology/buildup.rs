//! Buildup aggregation keyed by the cell where a path enters water
//!
//! One aggregator is built per run (or per worker) and drained once by the
//! grid assembler. Worker aggregators combine with [`BuildupAggregator::merge`].
//!
//! Contributions are kept per origin cell and summed in origin order when
//! read, so totals are bit-identical however the grid was partitioned.

use super::d8::Cell;
use super::scoring::PathScore;
use std::collections::{BTreeMap, HashMap};

/// Buildup delivered through one water entry cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Buildup {
    pub agriculture: f64,
    pub urban: f64,
}

impl Buildup {
    pub fn combined(&self) -> f64 {
        self.agriculture + self.urban
    }

    fn add(&mut self, other: &Buildup) {
        self.agriculture += other.agriculture;
        self.urban += other.urban;
    }
}

/// Origin contributions to one entry cell, ordered by origin
type Contributions = BTreeMap<Cell, Buildup>;

fn total(contributions: &Contributions) -> Buildup {
    let mut sum = Buildup::default();
    contributions.values().for_each(|b| sum.add(b));
    sum
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildupAggregator {
    buildup: HashMap<Cell, Contributions>,
    max_width: HashMap<Cell, i32>,
}

impl BuildupAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one water-terminated path into the aggregator.
    ///
    /// The maximum buffer width is tracked for every path; buildup only for
    /// paths that carry some.
    pub fn record(&mut self, score: &PathScore) {
        self.max_width
            .entry(score.terminal)
            .and_modify(|w| *w = (*w).max(score.buffer_width))
            .or_insert(score.buffer_width);

        if score.has_buildup() {
            self.buildup
                .entry(score.terminal)
                .or_default()
                .entry(score.origin)
                .or_default()
                .add(&Buildup {
                    agriculture: score.agriculture,
                    urban: score.urban,
                });
        }
    }

    /// Combine two aggregators: buildup sums, widths take the maximum.
    pub fn merge(mut self, other: BuildupAggregator) -> BuildupAggregator {
        self.merge_from(other);
        self
    }

    pub fn merge_from(&mut self, other: BuildupAggregator) {
        for (cell, contributions) in other.buildup {
            let entry = self.buildup.entry(cell).or_default();
            for (origin, b) in contributions {
                entry.entry(origin).or_default().add(&b);
            }
        }
        for (cell, w) in other.max_width {
            self.max_width
                .entry(cell)
                .and_modify(|cur| *cur = (*cur).max(w))
                .or_insert(w);
        }
    }

    pub fn buildup_at(&self, cell: Cell) -> Option<Buildup> {
        self.buildup.get(&cell).map(total)
    }

    pub fn max_width_at(&self, cell: Cell) -> Option<i32> {
        self.max_width.get(&cell).copied()
    }

    /// Entry cells with buildup, in no particular order
    pub fn buildup(&self) -> impl Iterator<Item = (Cell, Buildup)> + '_ {
        self.buildup.iter().map(|(c, contributions)| (*c, total(contributions)))
    }

    /// Entry cells with their widest buffer, in no particular order
    pub fn max_widths(&self) -> impl Iterator<Item = (Cell, i32)> + '_ {
        self.max_width.iter().map(|(c, w)| (*c, *w))
    }

    /// Number of distinct water entry cells seen
    pub fn entry_count(&self) -> usize {
        self.max_width.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_width.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn score(origin: usize, row: usize, col: usize, width: i32, ag: f64, urban: f64) -> PathScore {
        PathScore {
            hydrologic_distance: 1,
            buffer_width: width,
            origin: Cell::new(10, origin),
            terminal: Cell::new(row, col),
            agriculture: ag,
            urban,
        }
    }

    #[test]
    fn test_record_sums_and_tracks_max_width() {
        let mut agg = BuildupAggregator::new();
        agg.record(&score(0, 0, 1, 3, 1.0, 0.0));
        agg.record(&score(1, 0, 1, 1, 0.5, 2.0));
        agg.record(&score(2, 0, 1, 5, 0.0, 0.0));

        let b = agg.buildup_at(Cell::new(0, 1)).unwrap();
        assert_relative_eq!(b.agriculture, 1.5);
        assert_relative_eq!(b.urban, 2.0);
        assert_relative_eq!(b.combined(), 3.5);
        assert_eq!(agg.max_width_at(Cell::new(0, 1)), Some(5));
    }

    #[test]
    fn test_zero_buildup_path_leaves_no_buildup_entry() {
        let mut agg = BuildupAggregator::new();
        agg.record(&score(0, 2, 2, 4, 0.0, 0.0));

        assert_eq!(agg.buildup_at(Cell::new(2, 2)), None);
        assert_eq!(agg.max_width_at(Cell::new(2, 2)), Some(4));
        assert_eq!(agg.entry_count(), 1);
        assert_eq!(agg.buildup().count(), 0);
    }

    #[test]
    fn test_merge_is_associative_and_commutative() {
        let scores = [
            score(0, 0, 0, 1, 1.0, 0.0),
            score(1, 0, 0, 3, 0.0, 1.0),
            score(2, 1, 0, 2, 2.0, 0.0),
            score(3, 1, 0, 0, 0.0, 0.0),
            score(4, 2, 2, 7, 1.0, 1.0),
        ];
        let single = |s: &PathScore| {
            let mut a = BuildupAggregator::new();
            a.record(s);
            a
        };
        let a = single(&scores[0]).merge(single(&scores[4]));
        let b = single(&scores[1]).merge(single(&scores[3]));
        let c = single(&scores[2]);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.clone().merge(b.clone().merge(c.clone()));
        let swapped = c.merge(b).merge(a);

        let mut all = BuildupAggregator::new();
        scores.iter().for_each(|s| all.record(s));

        assert_eq!(left, right);
        assert_eq!(left, swapped);
        assert_eq!(left, all);
    }

    #[test]
    fn test_totals_do_not_depend_on_merge_order() {
        // Values whose f64 sum changes with addition order.
        let values = [0.1, 0.2, 0.3, 1e16, 0.7, 0.05];
        let scores: Vec<PathScore> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| score(i, 4, 4, 0, v, 0.0))
            .collect();

        let mut forward = BuildupAggregator::new();
        scores.iter().for_each(|s| forward.record(s));

        let mut halves = BuildupAggregator::new();
        scores[3..].iter().for_each(|s| halves.record(s));
        let mut first = BuildupAggregator::new();
        scores[..3].iter().for_each(|s| first.record(s));
        let halves = halves.merge(first);

        assert_eq!(forward.buildup_at(Cell::new(4, 4)), halves.buildup_at(Cell::new(4, 4)));
    }
}
