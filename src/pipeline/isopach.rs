//! Isopach (unit thickness) maps from Macrostrat columns.

use gdal::vector::{FieldValue, OGRFieldType};
use geo::{Contains, Point};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{PipelineError, SurfaceBuilder};
use crate::config::Config;
use crate::geometry::{Polygon, Projector, multipolygon_bbox, multipolygon_centroid};
use crate::grid::SampleGrid;
use crate::macrostrat::{
    AgeRange, ColumnCache, ReferenceSource, UnitQuery, UnitSummary, fetch_units,
    group_units_by_column, lithology_level, parse_columns,
};
use crate::utils::log_surface_statistics;
use crate::vector::{GeoPackageWriter, read_polygons};

pub const DEFAULT_PROJECT_ID: u32 = 1;

/// What to map and where to put it.
#[derive(Debug, Clone)]
pub struct IsopachRequest {
    /// Vector output goes next to this path as `.gpkg`; a `.tif` path also
    /// gets a thickness raster.
    pub output: PathBuf,
    pub strat_name: Option<String>,
    pub ages: AgeRange,
    pub lithology: Option<String>,
    /// Keep only columns whose centroid falls inside this polygon file.
    pub bounds: Option<PathBuf>,
    pub project_id: u32,
    pub crs: u32,
}

impl IsopachRequest {
    pub fn new<P: Into<PathBuf>>(output: P, crs: u32) -> Self {
        Self {
            output: output.into(),
            strat_name: None,
            ages: AgeRange::default(),
            lithology: None,
            bounds: None,
            project_id: DEFAULT_PROJECT_ID,
            crs,
        }
    }

    fn wants_raster(&self) -> bool {
        self.output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tif"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsopachOutput {
    pub vector: PathBuf,
    pub raster: Option<PathBuf>,
    /// Columns that carry at least one matching unit.
    pub columns_with_units: usize,
}

/// A column footprint in the output CRS joined with its units, if any.
struct JoinedColumn {
    col_id: u64,
    col_name: String,
    col_group: String,
    shape: Vec<Polygon>,
    centroid: (f64, f64),
    units: Option<UnitSummary>,
}

pub fn isopach_map<S: ReferenceSource + ?Sized>(
    config: &Config,
    source: &S,
    request: &IsopachRequest,
) -> Result<IsopachOutput, PipelineError> {
    request.ages.validate()?;
    info!(
        "Creating isopach map for {}",
        request.strat_name.as_deref().unwrap_or("all units")
    );

    let cache = ColumnCache::new(config.cache_dir());
    let columns = parse_columns(&cache.load_or_fetch(source, request.project_id)?)?;

    let (age_top, age_bottom) = request.ages.resolve(source)?;
    let lithology = request
        .lithology
        .as_ref()
        .map(|name| lithology_level(source, name).map(|level| (level, name.clone())))
        .transpose()?;

    let query = UnitQuery {
        strat_name: request.strat_name.clone(),
        age_top,
        age_bottom,
        lithology,
    };
    let grouped = group_units_by_column(&fetch_units(source, &query)?);

    let projector = Projector::from_lon_lat(request.crs)?;
    let mut joined = Vec::with_capacity(columns.len());
    for column in columns {
        let shape = column
            .shape
            .0
            .iter()
            .map(|p| projector.project_polygon(p))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(centroid) = multipolygon_centroid(&shape) else {
            warn!("Column {} has no footprint, skipping", column.col_id);
            continue;
        };
        joined.push(JoinedColumn {
            col_id: column.col_id,
            col_name: column.col_name,
            col_group: column.col_group,
            shape,
            centroid,
            units: grouped.get(&column.col_id).cloned(),
        });
    }

    if let Some(bounds) = &request.bounds {
        let clip = read_polygons(bounds, request.crs)?;
        joined.retain(|c| {
            let centroid = Point::new(c.centroid.0, c.centroid.1);
            clip.iter().any(|p| p.contains(&centroid))
        });
        info!("{} columns inside {}", joined.len(), bounds.display());
    }

    let vector = request.output.with_extension("gpkg");
    let columns_with_units = write_units(&vector, &joined, request.crs, config.overwrite())?;

    let raster = if request.wants_raster() {
        Some(write_thickness(config, request, &joined)?)
    } else {
        None
    };

    Ok(IsopachOutput {
        vector,
        raster,
        columns_with_units,
    })
}

/// Columns with units only, as the `units` layer.
fn write_units(
    path: &Path,
    joined: &[JoinedColumn],
    epsg: u32,
    overwrite: bool,
) -> Result<usize, PipelineError> {
    let mut writer = GeoPackageWriter::create(path, epsg, overwrite)?;

    let rows = joined.iter().filter_map(|c| {
        let units = c.units.as_ref()?;
        Some((
            c.shape.clone(),
            vec![
                FieldValue::Integer64Value(c.col_id as i64),
                FieldValue::StringValue(units.unit_ids.clone()),
                FieldValue::StringValue(units.unit_names.clone()),
                FieldValue::StringValue(c.col_name.clone()),
                FieldValue::StringValue(c.col_group.clone()),
                FieldValue::RealValue(units.t_age),
                FieldValue::RealValue(units.b_age),
                FieldValue::RealValue(units.min_thick),
                FieldValue::RealValue(units.max_thick),
            ],
        ))
    });

    let count = writer.add_polygons(
        "units",
        &[
            ("col_id", OGRFieldType::OFTInteger64),
            ("unit_id", OGRFieldType::OFTString),
            ("unit_name", OGRFieldType::OFTString),
            ("col_name", OGRFieldType::OFTString),
            ("col_group", OGRFieldType::OFTString),
            ("t_age", OGRFieldType::OFTReal),
            ("b_age", OGRFieldType::OFTReal),
            ("min_thick", OGRFieldType::OFTReal),
            ("max_thick", OGRFieldType::OFTReal),
        ],
        rows,
    )?;
    Ok(count)
}

/// Maximum thickness interpolated between column centroids. Columns without
/// the unit count as zero thickness, so the surface thins out to them.
fn write_thickness(
    config: &Config,
    request: &IsopachRequest,
    joined: &[JoinedColumn],
) -> Result<PathBuf, PipelineError> {
    let samples: Vec<(f64, f64, f64)> = joined
        .iter()
        .map(|c| {
            let thickness = c.units.as_ref().map_or(0.0, |u| u.max_thick);
            (c.centroid.0, c.centroid.1, thickness)
        })
        .collect();

    let footprint: Vec<Polygon> = joined.iter().flat_map(|c| c.shape.iter().cloned()).collect();
    let bbox = multipolygon_bbox(&footprint)
        .ok_or_else(|| PipelineError::NoData("no column footprints to grid".to_string()))?;
    let grid = SampleGrid::new(bbox, config.n_samples())?;

    let raster = SurfaceBuilder::new(grid, &footprint, request.crs)
        .non_negative()
        .build(&samples)?;
    log_surface_statistics("max_thick", &raster.values);

    let path = request.output.with_extension("tif");
    raster.write(&path, config.overwrite())?;
    Ok(path)
}
