use geo::{BoundingRect, Contains, Point};
use ndarray::{Array2, Zip};

use super::GeoTransform;
use crate::bbox::Bbox;
use crate::geometry::Polygon;

/// Rasterizes `polygons` onto a `(rows, cols)` grid. A cell is `true` (to be
/// masked) when its centre lies outside every polygon.
pub fn outside_mask(
    polygons: &[Polygon],
    transform: &GeoTransform,
    shape: (usize, usize),
) -> Array2<bool> {
    let (rows, cols) = shape;
    let indexed: Vec<(&Polygon, Bbox)> = polygons
        .iter()
        .filter_map(|p| p.bounding_rect().map(|r| (p, Bbox::from(r))))
        .collect();

    let mut mask = Array2::from_elem(shape, true);
    for row in 0..rows {
        let (_, y) = transform.pixel_center(0, row);
        let candidates: Vec<&(&Polygon, Bbox)> = indexed
            .iter()
            .filter(|(_, b)| (b.ymin..=b.ymax).contains(&y))
            .collect();
        if candidates.is_empty() {
            continue;
        }

        for col in 0..cols {
            let (x, y) = transform.pixel_center(col, row);
            let inside = candidates
                .iter()
                .any(|(p, b)| b.contains(x, y) && p.contains(&Point::new(x, y)));
            mask[[row, col]] = !inside;
        }
    }
    mask
}

/// Sets masked cells to NaN. Applying the same mask twice changes nothing.
pub fn apply_mask(values: &mut Array2<f64>, mask: &Array2<bool>) {
    Zip::from(values).and(mask).for_each(|v, &masked| {
        if masked {
            *v = f64::NAN;
        }
    });
}

/// Negative values of a non-negative attribute are extrapolation artefacts:
/// they become no-data instead of being clamped to zero.
pub fn mask_negative(values: &mut Array2<f64>) {
    values.mapv_inplace(|v| if v < 0.0 { f64::NAN } else { v });
}
