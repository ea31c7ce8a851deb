use glob::glob;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::PipelineError;
use crate::config::Config;
use crate::raster::RasterOutput;
use crate::readers::{DataReader, GeoTiffReader};
use crate::utils::log_surface_statistics;

/// No-data marker of the horizon grids.
pub const ASCII_NO_DATA: f64 = -9999.0;

/// Horizon grids store depth in feet, positive down. Converted values are
/// elevations in metres, so they are negated as well as scaled.
pub fn convert_values(values: &Array2<f64>, depth_factor: f64) -> Array2<f64> {
    values.mapv(|v| {
        if v.is_nan() || v == ASCII_NO_DATA {
            f64::NAN
        } else {
            v * -depth_factor
        }
    })
}

/// Converts every `*.asc` grid in `input` to `<output>/grids/<stem>.tif`.
/// Grids without a CRS of their own are tagged with the configured one.
pub fn convert_grids(config: &Config, input: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let out_dir = config.output_dir().join("grids");
    let pattern = input.join("*.asc");

    let mut written = Vec::new();
    for entry in glob(&pattern.to_string_lossy())? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let grid = GeoTiffReader::new(&path).read_data()?;
        let values = convert_values(&grid.values, config.wells().depth_factor);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        log_surface_statistics(&stem, &values);

        let out = out_dir.join(format!("{}.tif", stem));
        RasterOutput::new(values, grid.transform, grid.epsg.unwrap_or(config.crs()))
            .write(&out, config.overwrite())?;
        written.push(out);
    }

    if written.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no .asc grids in {}",
            input.display()
        )));
    }
    info!("Converted {} grids", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FT_TO_M;
    use ndarray::array;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_convert_values() {
        let values = array![[1000.0, ASCII_NO_DATA], [0.0, f64::NAN]];
        let converted = convert_values(&values, FT_TO_M);

        assert!((converted[[0, 0]] + 304.800_609_6).abs() < 1e-6);
        assert!(converted[[0, 1]].is_nan());
        assert_eq!(converted[[1, 0]], 0.0);
        assert!(converted[[1, 1]].is_nan());
    }

    #[test]
    fn test_convert_ascii_grid() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("grids_horizons");
        fs::create_dir_all(&input).unwrap();
        fs::write(
            input.join("bakken.asc"),
            "ncols 3\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1000\nNODATA_value -9999\n\
             100 200 -9999\n300 400 500\n",
        )
        .unwrap();

        let config = Config::default().with_output_dir(dir.path().join("output"));
        let written = convert_grids(&config, &input).unwrap();
        assert_eq!(written, vec![dir.path().join("output").join("grids").join("bakken.tif")]);

        let raster = GeoTiffReader::new(&written[0]).read_data().unwrap();
        assert_eq!(raster.values.dim(), (2, 3));
        assert!(raster.values[[0, 2]].is_nan());
        assert!((raster.values[[1, 2]] + 500.0 * FT_TO_M).abs() < 1e-9);
        assert_eq!(raster.epsg, Some(5069));
        assert_eq!(raster.transform.as_gdal(), [0.0, 1000.0, 0.0, 2000.0, 0.0, -1000.0]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_output_dir(dir.path());
        assert!(matches!(
            convert_grids(&config, dir.path()),
            Err(PipelineError::NoData(_))
        ));
    }
}
