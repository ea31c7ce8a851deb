use ndarray::Array2;
use thiserror::Error;

use crate::bbox::Bbox;
use crate::raster::GeoTransform;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("cannot grid a bounding box with zero width or height ({width} x {height})")]
    Degenerate { width: f64, height: f64 },
    #[error("target sample count must be at least 1")]
    NoSamples,
}

/// Regular sample grid over a bounding box. Columns run west to east and rows
/// run north to south, so row 0 lines up with raster row 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    bbox: Bbox,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

/// `n` evenly spaced values from `start` to `stop`, both included. A single
/// sample sits at `start`.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

impl SampleGrid {
    /// Gives the longer axis `n_samples` samples and scales the other by the
    /// aspect ratio, rounding to the nearest count of at least 1.
    pub fn new(bbox: Bbox, n_samples: usize) -> Result<Self, GridError> {
        if n_samples == 0 {
            return Err(GridError::NoSamples);
        }
        if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
            return Err(GridError::Degenerate {
                width: bbox.width(),
                height: bbox.height(),
            });
        }

        let ratio = bbox.aspect_ratio();
        let scaled = |n: f64| (n.round() as usize).max(1);
        let (nx, ny) = if ratio > 1.0 {
            (n_samples, scaled(n_samples as f64 / ratio))
        } else {
            (scaled(n_samples as f64 * ratio), n_samples)
        };

        Ok(Self {
            bbox,
            xs: linspace(bbox.xmin, bbox.xmax, nx),
            ys: linspace(bbox.ymax, bbox.ymin, ny),
        })
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    pub fn ncols(&self) -> usize {
        self.xs.len()
    }

    pub fn nrows(&self) -> usize {
        self.ys.len()
    }

    /// `(rows, cols)`, the shape of every array co-indexed with this grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn point(&self, row: usize, col: usize) -> (f64, f64) {
        (self.xs[col], self.ys[row])
    }

    /// Co-shaped X and Y coordinate arrays.
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let x = Array2::from_shape_fn(self.shape(), |(_, c)| self.xs[c]);
        let y = Array2::from_shape_fn(self.shape(), |(r, _)| self.ys[r]);
        (x, y)
    }

    /// Raster transform for this grid: bbox corners at pixel `(0, 0)` and
    /// `(ncols, nrows)`.
    pub fn transform(&self) -> GeoTransform {
        GeoTransform::from_bounds(&self.bbox, self.ncols(), self.nrows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_includes_both_ends() {
        assert_eq!(linspace(0.0, 10.0, 5), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
        assert_eq!(linspace(10.0, 0.0, 3), vec![10.0, 5.0, 0.0]);
    }

    #[test]
    fn test_wide_box_gets_full_count_on_x() {
        let bbox = Bbox::new(0.0, 400.0, 0.0, 100.0).unwrap();
        let grid = SampleGrid::new(bbox, 1000).unwrap();

        assert_eq!(grid.ncols(), 1000);
        assert_eq!(grid.nrows(), 250);
    }

    #[test]
    fn test_tall_box_gets_full_count_on_y() {
        let bbox = Bbox::new(0.0, 100.0, 0.0, 300.0).unwrap();
        let grid = SampleGrid::new(bbox, 90).unwrap();

        assert_eq!(grid.nrows(), 90);
        assert_eq!(grid.ncols(), 30);
    }

    #[test]
    fn test_grid_spans_bbox_exactly() {
        let bbox = Bbox::new(-123.4, 987.6, 55.5, 432.1).unwrap();
        let grid = SampleGrid::new(bbox, 77).unwrap();

        assert_eq!(grid.xs().first(), Some(&bbox.xmin));
        assert_eq!(grid.xs().last(), Some(&bbox.xmax));
        assert_eq!(grid.ys().first(), Some(&bbox.ymax));
        assert_eq!(grid.ys().last(), Some(&bbox.ymin));

        let ratio = grid.ncols() as f64 / grid.nrows() as f64;
        let expected = bbox.aspect_ratio();
        // Off by at most one sample on the short axis
        assert!((ratio - expected).abs() <= expected / grid.nrows() as f64 + 1e-9);
    }

    #[test]
    fn test_extreme_ratio_keeps_one_row() {
        let bbox = Bbox::new(0.0, 1_000_000.0, 0.0, 1.0).unwrap();
        let grid = SampleGrid::new(bbox, 10).unwrap();
        assert_eq!(grid.shape(), (1, 10));
    }

    #[test]
    fn test_meshgrid_shapes_match() {
        let bbox = Bbox::new(0.0, 10.0, 0.0, 10.0).unwrap();
        let grid = SampleGrid::new(bbox, 5).unwrap();
        let (x, y) = grid.meshgrid();

        assert_eq!(x.dim(), (5, 5));
        assert_eq!(y.dim(), (5, 5));
        assert_eq!(x[[0, 4]], 10.0);
        assert_eq!(y[[0, 4]], 10.0);
        assert_eq!(y[[4, 0]], 0.0);
    }

    #[test]
    fn test_degenerate_bbox_is_rejected() {
        let bbox = Bbox::new(0.0, 10.0, 5.0, 5.0).unwrap();
        assert!(matches!(
            SampleGrid::new(bbox, 10),
            Err(GridError::Degenerate { .. })
        ));
        let bbox = Bbox::new(0.0, 10.0, 0.0, 5.0).unwrap();
        assert_eq!(SampleGrid::new(bbox, 0), Err(GridError::NoSamples));
    }
}
