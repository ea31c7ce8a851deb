use glob::glob;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::PipelineError;
use crate::config::Config;
use crate::geometry::Projector;
use crate::raster::prepare_destination;
use crate::readers::{DataReader, RasterData, create_raster_reader};

/// Distance between samples along a section, in CRS units.
pub const SECTION_STEP: f64 = 100.0;

/// A straight section between two longitude/latitude points.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionLine {
    pub name: String,
    pub start: (f64, f64),
    pub end: (f64, f64),
}

impl SectionLine {
    pub fn new(name: &str, start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
        }
    }

    /// The two Williston Basin sections: NW to SE, then W to E.
    pub fn williston() -> Vec<SectionLine> {
        vec![
            SectionLine::new("section-1", (-106.6000, 48.9654), (-100.8362, 45.7890)),
            SectionLine::new("section-2", (-107.0315, 48.1072), (-99.8404, 47.4613)),
        ]
    }
}

/// Points every `step` from `start` towards `end`, the end itself excluded.
pub fn sample_line(start: (f64, f64), end: (f64, f64), step: f64) -> Vec<(f64, f64, f64)> {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = dx.hypot(dy);
    if !(length > 0.0) || !(step > 0.0) {
        return Vec::new();
    }

    let n = (length / step).ceil() as usize;
    (0..n)
        .map(|i| {
            let d = i as f64 * step;
            let t = d / length;
            (d, start.0 + t * dx, start.1 + t * dy)
        })
        .collect()
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{}", v),
        _ => String::new(),
    }
}

/// Samples every raster in `<output>/<model>/` along each section and writes
/// `<output>/cross-sections/<model>-<section>.csv`: distance, x, y, then one
/// column per surface. Cells off a raster or without data are left blank.
pub fn cross_sections(
    config: &Config,
    model: &str,
    sections: &[SectionLine],
) -> Result<Vec<PathBuf>, PipelineError> {
    info!("Building cross sections for {} model", model);

    let surfaces = load_surfaces(&config.output_dir().join(model))?;
    if surfaces.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no rasters in {}",
            config.output_dir().join(model).display()
        )));
    }

    let projector = Projector::from_lon_lat(config.crs())?;
    let out_dir = config.output_dir().join("cross-sections");

    let mut written = Vec::new();
    for section in sections {
        let start = projector.project_point(section.start.0, section.start.1)?;
        let end = projector.project_point(section.end.0, section.end.1)?;
        let samples = sample_line(start, end, SECTION_STEP);

        let mut csv = String::from("distance,x,y");
        for (name, _) in &surfaces {
            csv.push(',');
            csv.push_str(name);
        }
        csv.push('\n');

        for (d, x, y) in &samples {
            let _ = write!(csv, "{},{},{}", d, x, y);
            for (_, raster) in &surfaces {
                csv.push(',');
                csv.push_str(&format_value(raster.sample(*x, *y)));
            }
            csv.push('\n');
        }

        let path = out_dir.join(format!("{}-{}.csv", model, section.name));
        prepare_destination(&path, config.overwrite())?;
        fs::write(&path, csv).map_err(PipelineError::io(&path))?;
        info!(
            "Wrote {} samples along {} to {}",
            samples.len(),
            section.name,
            path.display()
        );
        written.push(path);
    }

    Ok(written)
}

/// Every `*.tif` in `dir`, keyed by file stem, in name order.
fn load_surfaces(dir: &Path) -> Result<Vec<(String, RasterData)>, PipelineError> {
    let pattern = dir.join("*.tif");
    let mut surfaces = Vec::new();

    for entry in glob(&pattern.to_string_lossy())? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raster = create_raster_reader(&path)?.read_data()?;
        debug!("Loaded {}\n{}", path.display(), raster);
        surfaces.push((name, raster));
    }

    surfaces.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(surfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Bbox;
    use crate::raster::{GeoTransform, RasterOutput};
    use ndarray::Array2;
    use tempfile::tempdir;

    #[test]
    fn test_sample_line_spacing() {
        let samples = sample_line((0.0, 0.0), (350.0, 0.0), 100.0);
        let distances: Vec<f64> = samples.iter().map(|s| s.0).collect();
        assert_eq!(distances, vec![0.0, 100.0, 200.0, 300.0]);

        let diagonal = sample_line((0.0, 0.0), (300.0, 400.0), 100.0);
        assert_eq!(diagonal.len(), 5);
        assert!((diagonal[1].1 - 60.0).abs() < 1e-9);
        assert!((diagonal[1].2 - 80.0).abs() < 1e-9);

        assert!(sample_line((1.0, 1.0), (1.0, 1.0), 100.0).is_empty());
    }

    #[test]
    fn test_cross_sections_write_one_column_per_surface() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_output_dir(dir.path());
        let projector = Projector::from_lon_lat(config.crs()).unwrap();

        // Raster covering the first 2 km of a short section
        let start = projector.project_point(-103.0, 48.0).unwrap();
        let bbox = Bbox::new(start.0 - 1000.0, start.0 + 1000.0, start.1 - 1000.0, start.1 + 1000.0).unwrap();
        let transform = GeoTransform::from_bounds(&bbox, 20, 20);
        for (name, value) in [("b_top", 2.0), ("a_top", 1.0)] {
            RasterOutput::new(Array2::from_elem((20, 20), value), transform, config.crs())
                .write(dir.path().join("scipy").join(format!("{}.tif", name)), true)
                .unwrap();
        }

        let section = SectionLine::new("test", (-103.0, 48.0), (-102.9, 48.0));
        let written = cross_sections(&config, "scipy", &[section]).unwrap();
        assert_eq!(written, vec![dir.path().join("cross-sections").join("scipy-test.csv")]);

        let text = fs::read_to_string(&written[0]).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("distance,x,y,a_top,b_top"));

        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first[0], "0");
        assert_eq!(&first[3..], &["1", "2"]);

        // Far end of the section is off both rasters
        let last: Vec<&str> = text.lines().last().unwrap().split(',').collect();
        assert_eq!(&last[3..], &["", ""]);
    }

    #[test]
    fn test_missing_model_directory() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_output_dir(dir.path());
        assert!(matches!(
            cross_sections(&config, "loop", &SectionLine::williston()),
            Err(PipelineError::NoData(_))
        ));
    }
}
