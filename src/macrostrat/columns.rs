use geo::{LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("invalid column collection: {0}")]
    Json(#[from] serde_json::Error),
    #[error("column {col_id}: {reason}")]
    Geometry { col_id: u64, reason: String },
}

/// A stratigraphic column and its footprint in longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub col_id: u64,
    pub col_name: String,
    pub col_group: String,
    pub shape: MultiPolygon,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<GeoJsonGeometry>,
    properties: ColumnProperties,
}

#[derive(Deserialize)]
struct ColumnProperties {
    col_id: u64,
    col_name: Option<String>,
    col_group: Option<String>,
}

type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeoJsonGeometry {
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

fn to_ring(col_id: u64, positions: Vec<Position>) -> Result<LineString, ColumnError> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(ColumnError::Geometry {
                col_id,
                reason: format!("position with {} coordinates", p.len()),
            }),
        })
        .collect()
}

fn to_polygon(col_id: u64, rings: Vec<Vec<Position>>) -> Result<Option<Polygon>, ColumnError> {
    let mut rings = rings.into_iter().map(|r| to_ring(col_id, r));
    let Some(exterior) = rings.next().transpose()? else {
        return Ok(None);
    };
    Ok(Some(Polygon::new(exterior, rings.collect::<Result<_, _>>()?)))
}

/// Parses a bare GeoJSON feature collection of columns. Features without a
/// geometry are kept with an empty footprint.
pub fn parse_columns(geojson: &str) -> Result<Vec<Column>, ColumnError> {
    let collection: FeatureCollection = serde_json::from_str(geojson)?;

    collection
        .features
        .into_iter()
        .map(|feature| {
            let col_id = feature.properties.col_id;
            let shape = match feature.geometry {
                None => MultiPolygon::new(Vec::new()),
                Some(GeoJsonGeometry::Polygon(rings)) => {
                    to_polygon(col_id, rings)?.into_iter().collect()
                }
                Some(GeoJsonGeometry::MultiPolygon(polygons)) => polygons
                    .into_iter()
                    .map(|rings| to_polygon(col_id, rings))
                    .filter_map(Result::transpose)
                    .collect::<Result<_, _>>()?,
            };

            Ok(Column {
                col_id,
                col_name: feature.properties.col_name.unwrap_or_default(),
                col_group: feature.properties.col_group.unwrap_or_default(),
                shape,
            })
        })
        .collect()
}
