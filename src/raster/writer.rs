use gdal::DriverManager;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use ndarray::Array2;
use std::fs;
use std::path::Path;
use tracing::info;

use super::{GeoTransform, RasterError};

/// A georeferenced single-band surface ready to be written.
#[derive(Debug, Clone)]
pub struct RasterOutput {
    pub values: Array2<f64>,
    pub transform: GeoTransform,
    pub epsg: u32,
}

impl RasterOutput {
    pub fn new(values: Array2<f64>, transform: GeoTransform, epsg: u32) -> Self {
        Self {
            values,
            transform,
            epsg,
        }
    }

    /// Writes a GeoTIFF with one `f64` band and NaN as no-data. Parent
    /// directories are created. An existing file is replaced when `overwrite`
    /// is set and is an error otherwise.
    pub fn write<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<(), RasterError> {
        let path = path.as_ref();
        prepare_destination(path, overwrite)?;

        let (height, width) = self.values.dim();
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset =
            driver.create_with_band_type::<f64, _>(path, width as _, height as _, 1)?;

        dataset.set_geo_transform(&self.transform.as_gdal())?;
        dataset.set_spatial_ref(&SpatialRef::from_epsg(self.epsg)?)?;

        let mut band = dataset.rasterband(1)?;
        band.set_no_data_value(Some(f64::NAN))?;

        let mut buffer = Buffer::new((width, height), self.values.iter().copied().collect());
        band.write((0, 0), (width, height), &mut buffer)?;

        info!("Saved {}x{} raster to {}", width, height, path.display());
        Ok(())
    }
}

/// Creates parent directories and clears the way for a new file at `path`.
pub fn prepare_destination(path: &Path, overwrite: bool) -> Result<(), RasterError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RasterError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if path.exists() {
        if !overwrite {
            return Err(RasterError::Exists(path.to_path_buf()));
        }
        fs::remove_file(path).map_err(|source| RasterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Bbox;
    use crate::readers::{DataReader, GeoTiffReader};
    use tempfile::tempdir;

    fn sample_output() -> RasterOutput {
        let values = Array2::from_shape_fn((3, 4), |(r, c)| {
            if r == 1 && c == 2 {
                f64::NAN
            } else {
                r as f64 * 10.0 + c as f64 + 0.25
            }
        });
        let bbox = Bbox::new(-400_000.0, -200_000.0, 2_600_000.0, 2_750_000.0).unwrap();
        RasterOutput::new(values, GeoTransform::from_bounds(&bbox, 4, 3), 5069)
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("surface.tif");
        let output = sample_output();

        output.write(&path, true).unwrap();
        let read = GeoTiffReader::new(&path).read_data().unwrap();

        assert_eq!(read.epsg, Some(5069));
        assert_eq!(read.transform, output.transform);
        assert_eq!(read.values.dim(), (3, 4));
        for (a, b) in read.values.iter().zip(output.values.iter()) {
            assert!((a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_refuses_to_overwrite_when_asked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("surface.tif");
        let output = sample_output();

        output.write(&path, false).unwrap();
        assert!(matches!(
            output.write(&path, false),
            Err(RasterError::Exists(_))
        ));
        // Default policy replaces the file
        assert!(output.write(&path, true).is_ok());
    }
}
