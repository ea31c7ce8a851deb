use super::{DataReader, RasterData, ReadError};
use gdal::Dataset;
use ndarray::Array2;
use std::path::{Path, PathBuf};

use crate::raster::GeoTransform;

/// Reads band 1 of any GDAL raster (GeoTIFF, ASCII grid) as `f64`, with the
/// band's no-data value turned into NaN.
pub struct GeoTiffReader {
    pub file_name: PathBuf,
}

impl GeoTiffReader {
    pub fn new<P: AsRef<Path>>(file_name: P) -> Self {
        Self {
            file_name: file_name.as_ref().to_path_buf(),
        }
    }

    fn malformed(&self, reason: impl ToString) -> ReadError {
        ReadError::Raster {
            path: self.file_name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl DataReader for GeoTiffReader {
    type Output = RasterData;

    fn read_data(&self) -> Result<RasterData, ReadError> {
        let dataset = Dataset::open(&self.file_name)?;
        let (width, height) = dataset.raster_size();

        let band = dataset.rasterband(1)?;
        let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
        let no_data = band.no_data_value();

        let pixels: Vec<f64> = buffer
            .data()
            .iter()
            .map(|&v| {
                if no_data.is_some_and(|nd| v == nd) {
                    f64::NAN
                } else {
                    v
                }
            })
            .collect();

        let values = Array2::from_shape_vec((height, width), pixels)
            .map_err(|e| self.malformed(e))?;

        // Rasters without a georeference (bare ASCII grids) fall back to pixel space
        let transform = dataset
            .geo_transform()
            .map(GeoTransform::from_gdal)
            .unwrap_or_else(|_| GeoTransform::identity());

        let epsg = dataset
            .spatial_ref()
            .ok()
            .and_then(|srs| srs.auth_code().ok())
            .and_then(|code| u32::try_from(code).ok());

        Ok(RasterData {
            values,
            transform,
            epsg,
        })
    }
}
