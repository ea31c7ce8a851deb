use crate::bbox::Bbox;

/// Affine map from pixel `(col, row)` to CRS `(x, y)`, in GDAL coefficient
/// order: `x = c0 + col*c1 + row*c2`, `y = c3 + col*c4 + row*c5`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform([f64; 6]);

impl GeoTransform {
    pub fn from_gdal(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    pub fn identity() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// North-up transform sending the bbox's top-left corner to pixel
    /// `(0, 0)` and its bottom-right corner to `(width, height)`. Row 0 is the
    /// maximum Y.
    pub fn from_bounds(bbox: &Bbox, width: usize, height: usize) -> Self {
        Self([
            bbox.xmin,
            bbox.width() / width as f64,
            0.0,
            bbox.ymax,
            0.0,
            -bbox.height() / height as f64,
        ])
    }

    pub fn as_gdal(&self) -> [f64; 6] {
        self.0
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.0;
        (
            c[0] + col * c[1] + row * c[2],
            c[3] + col * c[4] + row * c[5],
        )
    }

    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Pixel containing `(x, y)`. `None` when the point falls before the
    /// first row or column, or the transform is singular. Callers check the
    /// upper bound against their raster size.
    pub fn pixel_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let c = &self.0;
        let det = c[1] * c[5] - c[2] * c[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let dx = x - c[0];
        let dy = y - c[3];
        let col = (c[5] * dx - c[2] * dy) / det;
        let row = (-c[4] * dx + c[1] * dy) / det;

        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        Some((col.floor() as usize, row.floor() as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds_maps_corners() {
        let bbox = Bbox::new(100.0, 200.0, 50.0, 100.0).unwrap();
        let transform = GeoTransform::from_bounds(&bbox, 10, 5);

        assert_eq!(transform.apply(0.0, 0.0), (100.0, 100.0));
        assert_eq!(transform.apply(10.0, 5.0), (200.0, 50.0));
        assert_eq!(transform.pixel_center(0, 0), (105.0, 95.0));
    }

    #[test]
    fn test_pixel_of_inverts_pixel_center() {
        let bbox = Bbox::new(-10.0, 10.0, -5.0, 5.0).unwrap();
        let transform = GeoTransform::from_bounds(&bbox, 20, 10);

        for (col, row) in [(0, 0), (3, 7), (19, 9)] {
            let (x, y) = transform.pixel_center(col, row);
            assert_eq!(transform.pixel_of(x, y), Some((col, row)));
        }

        assert_eq!(transform.pixel_of(-11.0, 0.0), None);
        assert_eq!(transform.pixel_of(0.0, 6.0), None);
    }
}
