//! End-to-end runs, one per CLI subcommand. Each run is a straight line from
//! loading to writing; nothing is shared between runs except the column cache
//! and the output directory.

use gdal::errors::GdalError;
use ndarray::Array2;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::geometry::{Polygon, Projector};
use crate::grid::{GridError, SampleGrid};
use crate::interpolate::{CloughTocher, InterpolateError};
use crate::macrostrat::{ApiError, ColumnError, LookupError};
use crate::outline::OutlineError;
use crate::raster::{RasterError, RasterOutput, apply_mask, mask_negative, outside_mask};
use crate::readers::{DataReader, PointTable, ReadError, WellReader};
use crate::vector::VectorError;

pub mod cross_section;
pub mod grids;
pub mod isopach;
pub mod model;
pub mod summary;
pub mod surfaces;

pub use cross_section::{SectionLine, cross_sections};
pub use grids::convert_grids;
pub use isopach::{IsopachOutput, IsopachRequest, isopach_map};
pub use model::{MeshDirectory, SurfaceModeler, model_surfaces};
pub use summary::summarize_data;
pub use surfaces::create_surfaces;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Outline(#[from] OutlineError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Interpolate(#[from] InterpolateError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Vector(#[from] VectorError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Columns(#[from] ColumnError),
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("surface modeler: {0}")]
    Modeler(String),
    #[error("nothing to do: {0}")]
    NoData(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PipelineError::Io { path, source }
    }
}

/// Wells from the configured spreadsheet, projected to the configured CRS.
pub fn load_wells(config: &Config) -> Result<PointTable, PipelineError> {
    let table = WellReader::new(config.wells()).read_data()?;
    info!(
        "Loaded wells from {}\n{}",
        config.wells().path.display(),
        table
    );

    let projector = Projector::from_lon_lat(config.crs())?;
    let projected = projector.project_points(&table.coordinates())?;
    Ok(table.relocated(&projected))
}

/// Interpolates point samples over a fixed grid and footprint. The footprint
/// mask is computed once and reused for every surface.
pub struct SurfaceBuilder {
    grid: SampleGrid,
    outside: Array2<bool>,
    epsg: u32,
    non_negative: bool,
}

impl SurfaceBuilder {
    pub fn new(grid: SampleGrid, footprint: &[Polygon], epsg: u32) -> Self {
        let outside = outside_mask(footprint, &grid.transform(), grid.shape());
        Self {
            grid,
            outside,
            epsg,
            non_negative: false,
        }
    }

    /// Treats the attribute as non-negative (a thickness): negative values
    /// become no-data. Signed attributes such as elevations are left alone.
    pub fn non_negative(mut self) -> Self {
        self.non_negative = true;
        self
    }

    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    /// Fits, evaluates and masks the footprint.
    pub fn build(&self, samples: &[(f64, f64, f64)]) -> Result<RasterOutput, InterpolateError> {
        let interpolator = CloughTocher::fit(samples)?;
        let mut values = interpolator.evaluate_grid(&self.grid);
        apply_mask(&mut values, &self.outside);
        if self.non_negative {
            mask_negative(&mut values);
        }

        Ok(RasterOutput::new(values, self.grid.transform(), self.epsg))
    }
}

/// Name usable as a file stem: path separators and whitespace become `_`.
pub fn file_stem_for(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
