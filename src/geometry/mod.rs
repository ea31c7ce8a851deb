//! Polygon helpers over `geo` types, and conversion to and from OGR.
//!
//! GDAL owns the heavy geometry operations (buffering, simplification); the
//! results are pulled out into `geo` polygons so that per-cell work does not go
//! back through OGR.

use gdal::errors::GdalError;
use gdal::vector::{Geometry, OGRwkbGeometryType};
use geo::{BoundingRect, Centroid, LineString};

pub use geo::{MultiPolygon, Polygon};

use crate::bbox::Bbox;

pub mod projection;
pub use projection::Projector;

/// Polygon from an exterior ring of `(x, y)` vertices. The ring is closed if
/// it was not.
pub fn polygon(exterior: Vec<(f64, f64)>) -> Polygon {
    Polygon::new(LineString::from(exterior), Vec::new())
}

/// Area-weighted centroid of all polygons, holes subtracted. Degenerate
/// shapes fall back to their lines or points.
pub fn multipolygon_centroid(polygons: &[Polygon]) -> Option<(f64, f64)> {
    MultiPolygon::new(polygons.to_vec())
        .centroid()
        .map(|p| p.x_y())
}

pub fn multipolygon_bbox(polygons: &[Polygon]) -> Option<Bbox> {
    Bbox::from_points(
        polygons
            .iter()
            .filter_map(|p| p.bounding_rect())
            .flat_map(|r| [r.min().x_y(), r.max().x_y()]),
    )
}

fn ring_to_gdal(ring: &LineString) -> Result<Geometry, GdalError> {
    let mut out = Geometry::empty(OGRwkbGeometryType::wkbLinearRing)?;
    for c in ring.coords() {
        out.add_point_2d(c.x_y());
    }
    Ok(out)
}

pub fn polygon_to_gdal(polygon: &Polygon) -> Result<Geometry, GdalError> {
    let mut out = Geometry::empty(OGRwkbGeometryType::wkbPolygon)?;
    out.add_geometry(ring_to_gdal(polygon.exterior())?)?;
    for hole in polygon.interiors() {
        out.add_geometry(ring_to_gdal(hole)?)?;
    }
    Ok(out)
}

pub fn multipolygon_to_gdal(polygons: &[Polygon]) -> Result<Geometry, GdalError> {
    let mut out = Geometry::empty(OGRwkbGeometryType::wkbMultiPolygon)?;
    for polygon in polygons {
        out.add_geometry(polygon_to_gdal(polygon)?)?;
    }
    Ok(out)
}

pub fn point_to_gdal((x, y): (f64, f64)) -> Result<Geometry, GdalError> {
    let mut out = Geometry::empty(OGRwkbGeometryType::wkbPoint)?;
    out.add_point_2d((x, y));
    Ok(out)
}

pub fn multipoint_to_gdal(points: &[(f64, f64)]) -> Result<Geometry, GdalError> {
    let mut out = Geometry::empty(OGRwkbGeometryType::wkbMultiPoint)?;
    for &p in points {
        out.add_geometry(point_to_gdal(p)?)?;
    }
    Ok(out)
}

/// Pulls polygon rings out of an OGR geometry. Polygons, multipolygons and
/// collections are walked; any other geometry type contributes nothing.
pub fn polygons_from_gdal(geometry: &Geometry) -> Vec<Polygon> {
    let mut out = Vec::new();
    collect_polygons(geometry, &mut out);
    out
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    let kind = geometry.geometry_type();

    if kind == OGRwkbGeometryType::wkbPolygon {
        let mut rings = (0..geometry.geometry_count()).map(|i| {
            geometry
                .get_geometry(i)
                .get_point_vec()
                .into_iter()
                .map(|(x, y, _)| (x, y))
                .collect::<LineString>()
        });
        if let Some(exterior) = rings.next() {
            out.push(Polygon::new(exterior, rings.collect()));
        }
    } else if kind == OGRwkbGeometryType::wkbMultiPolygon
        || kind == OGRwkbGeometryType::wkbGeometryCollection
    {
        for i in 0..geometry.geometry_count() {
            collect_polygons(&geometry.get_geometry(i), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point};

    fn square(x0: f64, y0: f64, size: f64) -> Vec<(f64, f64)> {
        vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]
    }

    #[test]
    fn test_centroid_of_square_and_triangle() {
        let (cx, cy) = multipolygon_centroid(&[polygon(square(2.0, 2.0, 4.0))]).unwrap();
        assert!((cx - 4.0).abs() < 1e-12);
        assert!((cy - 4.0).abs() < 1e-12);

        // Clockwise winding gives the same answer
        let triangle = polygon(vec![(0.0, 0.0), (0.0, 3.0), (3.0, 0.0)]);
        let (cx, cy) = multipolygon_centroid(&[triangle]).unwrap();
        assert!((cx - 1.0).abs() < 1e-12);
        assert!((cy - 1.0).abs() < 1e-12);

        assert!(multipolygon_centroid(&[]).is_none());
    }

    #[test]
    fn test_multipolygon_centroid_is_area_weighted() {
        let polygons = vec![polygon(square(0.0, 0.0, 2.0)), polygon(square(10.0, 0.0, 2.0))];
        let (cx, cy) = multipolygon_centroid(&polygons).unwrap();
        assert!((cx - 6.0).abs() < 1e-12);
        assert!((cy - 1.0).abs() < 1e-12);

        let big = vec![polygon(square(0.0, 0.0, 4.0)), polygon(square(10.0, 0.0, 2.0))];
        let (cx, _) = multipolygon_centroid(&big).unwrap();
        // (16 * 2 + 4 * 11) / 20
        assert!((cx - 3.8).abs() < 1e-12);
    }

    #[test]
    fn test_multipolygon_bbox() {
        let polygons = vec![polygon(square(0.0, 0.0, 2.0)), polygon(square(10.0, -3.0, 2.0))];
        assert_eq!(
            multipolygon_bbox(&polygons),
            Some(Bbox::new(0.0, 12.0, -3.0, 2.0).unwrap())
        );
        assert!(multipolygon_bbox(&[]).is_none());
    }

    #[test]
    fn test_to_gdal_keeps_holes_and_area() {
        let with_hole = Polygon::new(
            LineString::from(square(0.0, 0.0, 10.0)),
            vec![LineString::from(square(4.0, 4.0, 2.0))],
        );
        let geometry = polygon_to_gdal(&with_hole).unwrap();
        assert_eq!(geometry.geometry_type(), OGRwkbGeometryType::wkbPolygon);
        assert_eq!(geometry.geometry_count(), 2);
        assert!((geometry.area() - 96.0).abs() < 1e-9);

        let multi = multipolygon_to_gdal(&[with_hole, polygon(square(20.0, 0.0, 1.0))]).unwrap();
        assert_eq!(multi.geometry_count(), 2);
        assert!((multi.area() - 97.0).abs() < 1e-9);

        let cloud = multipoint_to_gdal(&[(0.0, 0.0), (1.0, 1.0)]).unwrap();
        assert_eq!(cloud.geometry_type(), OGRwkbGeometryType::wkbMultiPoint);
        assert_eq!(cloud.geometry_count(), 2);
    }

    #[test]
    fn test_polygons_from_gdal() {
        let geometry = Geometry::from_wkt(
            "MULTIPOLYGON (((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 2 1, 2 2, 1 2, 1 1)), ((10 10, 11 10, 11 11, 10 10)))",
        )
        .unwrap();

        let polygons = polygons_from_gdal(&geometry);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert!(polygons[0].contains(&Point::new(3.0, 3.0)));
        assert!(!polygons[0].contains(&Point::new(1.5, 1.5)));
        assert!((polygons[0].unsigned_area() - 15.0).abs() < 1e-12);
    }
}
