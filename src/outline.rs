//! Coarse basin outline around a point cloud: buffer out, buffer back in,
//! simplify.

use gdal::errors::GdalError;
use gdal::vector::Geometry;
use geo::{Area, Contains, Point};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::bbox::Bbox;
use crate::geometry::{
    Polygon, multipoint_to_gdal, multipolygon_bbox, multipolygon_to_gdal, polygons_from_gdal,
};

/// Fewer distinct points than this give no meaningful envelope.
pub const MIN_OUTLINE_POINTS: usize = 2;

/// Segments per quarter circle when buffering.
const QUADRANT_SEGMENTS: u32 = 30;

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("need at least {} distinct points to build an outline, got {found}", MIN_OUTLINE_POINTS)]
    TooFewPoints { found: usize },
    #[error("outline collapsed to an empty geometry")]
    Empty,
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),
}

/// Buffer distances and simplification tolerance, in CRS units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlineParams {
    pub expand_radius: f64,
    pub shrink_radius: f64,
    pub simplify_tolerance: f64,
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            expand_radius: 100_000.0,
            shrink_radius: 90_000.0,
            simplify_tolerance: 10_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasinOutline {
    polygons: Vec<Polygon>,
}

impl BasinOutline {
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn bbox(&self) -> Option<Bbox> {
        multipolygon_bbox(&self.polygons)
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(|p| p.unsigned_area()).sum()
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        self.polygons.iter().any(|p| p.contains(&point))
    }

    pub fn to_gdal(&self) -> Result<Geometry, GdalError> {
        multipolygon_to_gdal(&self.polygons)
    }
}

/// Builds the outline of `points`. The expand buffer unions the disks around
/// every point; the shrink buffer pulls the envelope back in and smooths
/// concavities between clusters.
pub fn build_outline(
    points: &[(f64, f64)],
    params: &OutlineParams,
) -> Result<BasinOutline, OutlineError> {
    let mut seen = HashSet::new();
    let distinct: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .filter(|(x, y)| seen.insert((x.to_bits(), y.to_bits())))
        .collect();
    if distinct.len() < MIN_OUTLINE_POINTS {
        return Err(OutlineError::TooFewPoints {
            found: distinct.len(),
        });
    }

    debug!(
        "Buffering {} points by {} then {}",
        distinct.len(),
        params.expand_radius,
        -params.shrink_radius
    );
    let cloud = multipoint_to_gdal(&distinct)?;
    let expanded = cloud.buffer(params.expand_radius, QUADRANT_SEGMENTS)?;
    let shrunk = expanded.buffer(-params.shrink_radius, QUADRANT_SEGMENTS)?;
    let simplified = if params.simplify_tolerance > 0.0 {
        shrunk.simplify(params.simplify_tolerance)?
    } else {
        shrunk
    };

    if simplified.is_empty() {
        return Err(OutlineError::Empty);
    }
    let polygons: Vec<Polygon> = polygons_from_gdal(&simplified)
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();
    if polygons.is_empty() {
        return Err(OutlineError::Empty);
    }

    let outline = BasinOutline { polygons };
    info!(
        "Basin outline: {} polygon(s), {:.0} km²",
        outline.polygons.len(),
        outline.area() / 1e6
    );
    Ok(outline)
}
