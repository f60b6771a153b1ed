//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// A georeferenced 2D raster grid.
///
/// Rows increase downward, so `(row, col)` addresses a cell the same way the
/// D8 offset table does.
///
/// # Example
///
/// ```ignore
/// use watertrace_core::Raster;
///
/// let mut land_cover: Raster<i32> = Raster::filled(3, 3, 8);
/// land_cover.set(1, 2, 21)?;
/// assert_eq!(land_cover.get(1, 2)?, 21);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from nested rows, convenient for small fixtures
    pub fn from_rows(rows: &[&[T]]) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(Error::InvalidDimensions {
                width: n_cols,
                height: n_rows,
            });
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_vec(data, n_rows, n_cols)
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a raster with the same georeference, a different cell type and
    /// every cell set to `fill_value`
    pub fn like_filled<U: RasterElement>(&self, fill_value: U, nodata: Option<U>) -> Raster<U> {
        Raster {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata,
        }
    }

    /// Fail with [`Error::SizeMismatch`] unless `other` has the same shape
    pub fn ensure_same_shape<U: RasterElement>(
        &self,
        other: &Raster<U>,
        layer: &'static str,
    ) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if er != ar || ec != ac {
            return Err(Error::SizeMismatch { layer, er, ec, ar, ac });
        }
        Ok(())
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.cast_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<i32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<i32> = Raster::new(10, 10);
        raster.set(5, 5, 42).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42);
        assert!(raster.set(10, 0, 1).is_err());
        assert!(raster.get(0, 10).is_err());
    }

    #[test]
    fn test_from_rows() {
        let raster = Raster::from_rows(&[&[1, 2, 3], &[4, 5, 6]]).unwrap();
        assert_eq!(raster.shape(), (2, 3));
        assert_eq!(raster.get(1, 0).unwrap(), 4);

        assert!(Raster::from_rows(&[&[1, 2], &[3]]).is_err());
    }

    #[test]
    fn test_like_filled_keeps_transform() {
        let mut source: Raster<i32> = Raster::new(4, 5);
        source.set_transform(GeoTransform::new(10.0, 20.0, 10.0, -10.0));

        let out = source.like_filled(-999_i32, Some(-999));
        assert_eq!(out.shape(), (4, 5));
        assert_eq!(out.transform(), source.transform());
        assert_eq!(out.nodata(), Some(-999));
        assert!(out.data().iter().all(|&v| v == -999));
    }

    #[test]
    fn test_ensure_same_shape() {
        let a: Raster<i32> = Raster::new(3, 3);
        let b: Raster<u8> = Raster::new(3, 3);
        let c: Raster<i32> = Raster::new(3, 4);
        assert!(a.ensure_same_shape(&b, "b").is_ok());
        match a.ensure_same_shape(&c, "c") {
            Err(Error::SizeMismatch { layer, ac, .. }) => {
                assert_eq!(layer, "c");
                assert_eq!(ac, 4);
            }
            other => panic!("expected size mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_raster_statistics_skips_nodata() {
        let mut raster = Raster::from_rows(&[&[1, 2, 999], &[4, 999, 6]]).unwrap();
        raster.set_nodata(Some(999));

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1));
        assert_eq!(stats.max, Some(6));
        assert_eq!(stats.valid_count, 4);
        assert_eq!(stats.nodata_count, 2);
    }
}
