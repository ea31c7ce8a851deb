use gdal::errors::GdalError;
use gdal::spatial_ref::{CoordTransform, SpatialRef};

use geo::LineString;

use super::Polygon;

/// Longitude/latitude on WGS84 with x = longitude, whatever the GDAL axis
/// order defaults are.
const GEOGRAPHIC_LON_LAT: &str = "OGC:CRS84";

/// Projects longitude/latitude coordinates into the target EPSG code.
pub struct Projector {
    epsg: u32,
    transform: CoordTransform,
}

impl Projector {
    pub fn from_lon_lat(epsg: u32) -> Result<Self, GdalError> {
        let source = SpatialRef::from_definition(GEOGRAPHIC_LON_LAT)?;
        let target = SpatialRef::from_epsg(epsg)?;
        let transform = CoordTransform::new(&source, &target)?;

        Ok(Self { epsg, transform })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn project_points(&self, points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, GdalError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let mut ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let mut zs = vec![0.0; points.len()];
        self.transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

        Ok(xs.into_iter().zip(ys).collect())
    }

    pub fn project_point(&self, x: f64, y: f64) -> Result<(f64, f64), GdalError> {
        let projected = self.project_points(&[(x, y)])?;
        Ok(projected[0])
    }

    fn project_ring(&self, ring: &LineString) -> Result<LineString, GdalError> {
        let points: Vec<(f64, f64)> = ring.coords().map(|c| c.x_y()).collect();
        Ok(LineString::from(self.project_points(&points)?))
    }

    pub fn project_polygon(&self, polygon: &Polygon) -> Result<Polygon, GdalError> {
        Ok(Polygon::new(
            self.project_ring(polygon.exterior())?,
            polygon
                .interiors()
                .iter()
                .map(|ring| self.project_ring(ring))
                .collect::<Result<_, _>>()?,
        ))
    }
}
