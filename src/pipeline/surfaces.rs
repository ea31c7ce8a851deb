use std::path::PathBuf;
use tracing::{info, warn};

use super::{PipelineError, SurfaceBuilder, file_stem_for, load_wells};
use crate::config::Config;
use crate::grid::SampleGrid;
use crate::outline::{OutlineError, build_outline};
use crate::utils::log_surface_statistics;

/// Fewer wells than this cannot span a triangle.
pub const MIN_WELLS_PER_SURFACE: usize = 3;

/// One raster per formation column, written to
/// `<output>/scipy/<formation>.tif`. Tops keep the sign of the well file, so
/// negative elevations survive. Returns the written paths.
pub fn create_surfaces(config: &Config) -> Result<Vec<PathBuf>, PipelineError> {
    let wells = load_wells(config)?;

    let outline = build_outline(&wells.coordinates(), config.outline())?;
    let bbox = outline.bbox().ok_or(OutlineError::Empty)?;
    let grid = SampleGrid::new(bbox, config.n_samples())?;
    info!("Sampling {} rows x {} columns", grid.nrows(), grid.ncols());

    let builder = SurfaceBuilder::new(grid, outline.polygons(), config.crs());
    let out_dir = config.output_dir().join("scipy");

    let mut written = Vec::new();
    for formation in wells.attributes() {
        let samples = wells.samples(formation).unwrap_or_default();
        if samples.len() < MIN_WELLS_PER_SURFACE {
            warn!(
                "Skipping {}: {} wells, need at least {}",
                formation,
                samples.len(),
                MIN_WELLS_PER_SURFACE
            );
            continue;
        }

        info!("Processing {} formation ({} wells)", formation, samples.len());
        let raster = match builder.build(&samples) {
            Ok(raster) => raster,
            Err(e) => {
                warn!("Skipping {}: {}", formation, e);
                continue;
            }
        };
        log_surface_statistics(formation, &raster.values);

        let path = out_dir.join(format!("{}.tif", file_stem_for(formation)));
        raster.write(&path, config.overwrite())?;
        written.push(path);
    }

    if written.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no formation in {} has {} or more wells",
            config.wells().path.display(),
            MIN_WELLS_PER_SURFACE
        )));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WellColumns;
    use crate::readers::{DataReader, GeoTiffReader};
    use std::fs;
    use tempfile::tempdir;

    // Twelve wells around Williston, ND, with two formations; the second is
    // only reported by two wells.
    const WELLS: &str = "\
WELL_ID,API,LAT,LONG,A_TOP,B_TOP
1,33-1,47.80,-103.80,1000,
2,33-2,47.80,-103.20,1100,
3,33-3,47.80,-102.60,1200,
4,33-4,48.20,-103.80,1050,900
5,33-5,48.20,-103.20,1150,
6,33-6,48.20,-102.60,1250,
7,33-7,48.60,-103.80,1100,
8,33-8,48.60,-103.20,1200,950
9,33-9,48.60,-102.60,1300,
10,33-10,47.50,-103.50,1000,
11,33-11,48.90,-103.00,1250,
12,33-12,48.00,-102.30,1280,
";

    fn config_for(dir: &std::path::Path, wells: &str) -> Config {
        let csv = dir.join("wells.csv");
        fs::write(&csv, wells).unwrap();

        Config::default()
            .with_wells(WellColumns {
                path: csv,
                ..WellColumns::default()
            })
            .with_output_dir(dir.join("output"))
            .with_n_samples(60)
    }

    #[test]
    fn test_create_surfaces_writes_one_raster_per_formation() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path(), WELLS);

        let written = create_surfaces(&config).unwrap();
        assert_eq!(written, vec![dir.path().join("output").join("scipy").join("A_TOP.tif")]);

        let raster = GeoTiffReader::new(&written[0]).read_data().unwrap();
        assert_eq!(raster.epsg, Some(5069));
        assert_eq!(raster.width().max(raster.height()), 60);

        let valid: Vec<f64> = raster.values.iter().copied().filter(|v| !v.is_nan()).collect();
        assert!(!valid.is_empty());
        // Tops are in metres: 1000 ft is about 305 m
        for v in valid {
            assert!(v > 250.0 && v < 450.0, "top {} out of range", v);
        }
    }

    #[test]
    fn test_create_surfaces_keeps_negative_tops() {
        let dir = tempdir().unwrap();
        let wells = WELLS
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    return line.to_string();
                }
                // Tops below sea level: 1000 ft becomes -8500 ft, and so on
                let mut fields: Vec<String> = line.split(',').map(str::to_string).collect();
                if let Ok(top) = fields[4].parse::<f64>() {
                    fields[4] = format!("{}", -9500.0 + top);
                }
                fields.join(",")
            })
            .collect::<Vec<_>>()
            .join("\n");
        let config = config_for(dir.path(), &wells);

        let written = create_surfaces(&config).unwrap();
        let raster = GeoTiffReader::new(&written[0]).read_data().unwrap();

        let valid: Vec<f64> = raster.values.iter().copied().filter(|v| !v.is_nan()).collect();
        assert!(valid.len() > raster.values.len() / 4, "{} valid cells", valid.len());
        // -8500 ft is about -2591 m, -8200 ft about -2499 m
        for v in valid {
            assert!(v > -2700.0 && v < -2400.0, "elevation {} out of range", v);
        }
    }
}
