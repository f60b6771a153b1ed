//! Row-band partitioning of a raster

use std::ops::Range;

/// A contiguous run of rows processed as one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    /// Position of the band in the partition
    pub index: usize,
    /// First row (inclusive)
    pub start: usize,
    /// Last row (exclusive)
    pub end: usize,
}

impl RowBand {
    /// Number of rows in the band
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the band covers no rows
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Rows covered by the band
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Disjoint row bands that together cover `0..total_rows` in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBands {
    bands: Vec<RowBand>,
}

impl RowBands {
    /// Split `total_rows` into at most `count` bands of near-equal height.
    ///
    /// Earlier bands take the remainder rows, so heights differ by at most one.
    pub fn split(total_rows: usize, count: usize) -> Self {
        let count = count.clamp(1, total_rows.max(1));
        let base = total_rows / count;
        let extra = total_rows % count;

        let mut bands = Vec::with_capacity(count);
        let mut start = 0;
        for index in 0..count {
            let height = base + usize::from(index < extra);
            bands.push(RowBand {
                index,
                start,
                end: start + height,
            });
            start += height;
        }
        Self { bands }
    }

    /// Bands of at most `band_height` rows
    pub fn with_height(total_rows: usize, band_height: usize) -> Self {
        let band_height = band_height.max(1);
        Self::split(total_rows, total_rows.div_ceil(band_height))
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Whether there are no bands
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Band at position `index`
    pub fn get(&self, index: usize) -> Option<RowBand> {
        self.bands.get(index).copied()
    }

    /// Iterate the bands in row order
    pub fn iter(&self) -> impl Iterator<Item = RowBand> + '_ {
        self.bands.iter().copied()
    }
}
