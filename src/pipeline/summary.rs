use gdal::vector::{FieldValue, OGRFieldType};
use std::path::PathBuf;
use tracing::info;

use super::{PipelineError, load_wells};
use crate::config::Config;
use crate::outline::build_outline;
use crate::readers::PointRecord;
use crate::vector::GeoPackageWriter;

/// Shallowest reported formation top and the number of formations a well
/// reports. A well with no tops has no depth.
pub fn well_depth_summary(record: &PointRecord) -> (Option<f64>, usize) {
    let present: Vec<f64> = record.attributes.iter().flatten().copied().collect();
    let max_depth = present.iter().copied().reduce(f64::min);
    (max_depth, present.len())
}

/// Writes `<output>/well-info.gpkg` with a `metadata` point layer (one point
/// per well) and a `bounds` layer holding the basin outline.
pub fn summarize_data(config: &Config) -> Result<PathBuf, PipelineError> {
    let wells = load_wells(config)?;
    let path = config.output_dir().join("well-info.gpkg");

    let mut writer = GeoPackageWriter::create(&path, config.crs(), config.overwrite())?;
    let rows = wells.records().iter().map(|record| {
        let (max_depth, n_surfaces) = well_depth_summary(record);
        (
            (record.x, record.y),
            vec![
                FieldValue::StringValue(record.id.clone()),
                FieldValue::RealValue(max_depth.unwrap_or(f64::NAN)),
                FieldValue::IntegerValue(n_surfaces as i32),
            ],
        )
    });
    writer.add_points(
        "metadata",
        &[
            ("well_id", OGRFieldType::OFTString),
            ("max_depth", OGRFieldType::OFTReal),
            ("n_surfaces", OGRFieldType::OFTInteger),
        ],
        rows,
    )?;

    let outline = build_outline(&wells.coordinates(), config.outline())?;
    writer.add_polygons(
        "bounds",
        &[("area_km2", OGRFieldType::OFTReal)],
        [(
            outline.polygons().to_vec(),
            vec![FieldValue::RealValue(outline.area() / 1e6)],
        )],
    )?;

    info!("Summarized {} wells in {}", wells.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WellColumns;
    use gdal::Dataset;
    use gdal::vector::LayerAccess;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_well_depth_summary() {
        let record = PointRecord {
            id: "7".to_string(),
            x: 0.0,
            y: 0.0,
            attributes: vec![Some(1200.0), None, Some(950.0)],
        };
        assert_eq!(well_depth_summary(&record), (Some(950.0), 2));

        let dry = PointRecord {
            attributes: vec![None, None],
            ..record
        };
        assert_eq!(well_depth_summary(&dry), (None, 0));
    }

    #[test]
    fn test_summarize_data_writes_both_layers() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("wells.csv");
        fs::write(
            &csv,
            "WELL_ID,LAT,LONG,A_TOP,B_TOP\n1,47.8,-103.8,1000,\n2,48.6,-102.6,1300,1200\n3,48.2,-103.2,,\n",
        )
        .unwrap();

        let config = Config::default()
            .with_wells(WellColumns {
                path: csv,
                ..WellColumns::default()
            })
            .with_output_dir(dir.path());

        let path = summarize_data(&config).unwrap();
        let dataset = Dataset::open(&path).unwrap();
        assert_eq!(dataset.layer_by_name("metadata").unwrap().feature_count(), 3);
        assert_eq!(dataset.layer_by_name("bounds").unwrap().feature_count(), 1);
    }
}
