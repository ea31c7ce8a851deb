//! GeoPackage output and polygon input through OGR.

use gdal::errors::GdalError;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    FieldValue, Geometry, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType,
};
use gdal::{Dataset, DriverManager};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::geometry::{Polygon, multipolygon_to_gdal, point_to_gdal, polygons_from_gdal};
use crate::raster::{RasterError, prepare_destination};

#[derive(Debug, Error)]
pub enum VectorError {
    #[error(transparent)]
    Destination(#[from] RasterError),
    #[error("layer {layer}: {expected} fields declared, row has {found}")]
    FieldCount {
        layer: String,
        expected: usize,
        found: usize,
    },
    #[error("{0} has no layers")]
    NoLayers(PathBuf),
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),
}

/// Attribute column of an output layer.
pub type FieldSpec<'a> = (&'a str, OGRFieldType::Type);

/// A GeoPackage being written. Layers are added one at a time and share the
/// file's CRS.
pub struct GeoPackageWriter {
    dataset: Dataset,
    srs: SpatialRef,
    path: PathBuf,
}

impl GeoPackageWriter {
    pub fn create<P: AsRef<Path>>(path: P, epsg: u32, overwrite: bool) -> Result<Self, VectorError> {
        let path = path.as_ref();
        prepare_destination(path, overwrite)?;

        let driver = DriverManager::get_driver_by_name("GPKG")?;
        let dataset = driver.create_vector_only(path)?;

        Ok(Self {
            dataset,
            srs: SpatialRef::from_epsg(epsg)?,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_points<I>(
        &mut self,
        layer: &str,
        fields: &[FieldSpec],
        rows: I,
    ) -> Result<usize, VectorError>
    where
        I: IntoIterator<Item = ((f64, f64), Vec<FieldValue>)>,
    {
        let rows = rows
            .into_iter()
            .map(|(point, values)| point_to_gdal(point).map(|g| (g, values)));
        self.add_layer(layer, OGRwkbGeometryType::wkbPoint, fields, rows)
    }

    pub fn add_polygons<I>(
        &mut self,
        layer: &str,
        fields: &[FieldSpec],
        rows: I,
    ) -> Result<usize, VectorError>
    where
        I: IntoIterator<Item = (Vec<Polygon>, Vec<FieldValue>)>,
    {
        let rows = rows
            .into_iter()
            .map(|(shape, values)| multipolygon_to_gdal(&shape).map(|g| (g, values)));
        self.add_layer(layer, OGRwkbGeometryType::wkbMultiPolygon, fields, rows)
    }

    fn add_layer<I>(
        &mut self,
        name: &str,
        ty: OGRwkbGeometryType::Type,
        fields: &[FieldSpec],
        rows: I,
    ) -> Result<usize, VectorError>
    where
        I: IntoIterator<Item = Result<(Geometry, Vec<FieldValue>), GdalError>>,
    {
        let mut layer = self.dataset.create_layer(LayerOptions {
            name,
            srs: Some(&self.srs),
            ty,
            options: None,
        })?;
        layer.create_defn_fields(fields)?;

        let names: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
        let mut count = 0;
        for row in rows {
            let (geometry, values) = row?;
            if values.len() != names.len() {
                return Err(VectorError::FieldCount {
                    layer: name.to_string(),
                    expected: names.len(),
                    found: values.len(),
                });
            }
            layer.create_feature_fields(geometry, &names, &values)?;
            count += 1;
        }

        info!(
            "Wrote {} features to layer '{}' of {}",
            count,
            name,
            self.path.display()
        );
        Ok(count)
    }
}

/// Every polygon in the first layer of a vector file, reprojected to `epsg`
/// when the layer has a CRS of its own.
pub fn read_polygons<P: AsRef<Path>>(path: P, epsg: u32) -> Result<Vec<Polygon>, VectorError> {
    let path = path.as_ref();
    let dataset = Dataset::open(path)?;
    if dataset.layer_count() == 0 {
        return Err(VectorError::NoLayers(path.to_path_buf()));
    }

    let mut layer = dataset.layer(0)?;
    let target = SpatialRef::from_epsg(epsg)?;
    let reproject = layer
        .spatial_ref()
        .is_some_and(|srs| srs.auth_code().ok() != Some(epsg as i32));

    let mut polygons = Vec::new();
    for feature in layer.features() {
        let Some(geometry) = feature.geometry() else {
            continue;
        };
        if reproject {
            polygons.extend(polygons_from_gdal(&geometry.transform_to(&target)?));
        } else {
            polygons.extend(polygons_from_gdal(geometry));
        }
    }

    Ok(polygons)
}
