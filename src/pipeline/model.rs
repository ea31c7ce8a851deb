//! Surfaces from an external implicit geological modeler.
//!
//! The modeler only sees point constraints and a stratigraphic ordering and
//! hands back one triangulated mesh per unit. Meshes are gridded exactly like
//! the well surfaces so the two sets of rasters line up.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{PipelineError, SurfaceBuilder, file_stem_for, load_wells};
use crate::config::Config;
use crate::grid::SampleGrid;
use crate::outline::{OutlineError, build_outline};
use crate::readers::{PointTable, csv_quote};
use crate::utils::log_surface_statistics;

/// Vertical extent handed to the modeler, in metres of elevation.
pub const MODEL_Z_RANGE: (f64, f64) = (-5000.0, 1000.0);

/// A point on a unit's top surface. `z` is the top as read from the wells.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub feature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratUnit {
    pub name: String,
    pub id: usize,
    pub min: f64,
    pub max: f64,
}

/// Units ordered from youngest (highest) to oldest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratColumn {
    pub units: Vec<StratUnit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    pub name: String,
    pub vertices: Vec<(f64, f64, f64)>,
}

/// Model extent: `(xmin, ymin, zmin)` and `(xmax, ymax, zmax)`.
pub type Extent = ((f64, f64, f64), (f64, f64, f64));

pub trait SurfaceModeler {
    fn submit(
        &mut self,
        extent: Extent,
        constraints: &[Constraint],
        column: &StratColumn,
    ) -> Result<(), PipelineError>;

    /// One mesh per unit of the submitted column, in column order.
    fn surfaces(&self, column: &StratColumn) -> Result<Vec<SurfaceMesh>, PipelineError>;
}

/// Constraints and the stratigraphic column from well tops. Tops are signed
/// elevations; units are ordered by mean elevation, highest first.
pub fn model_inputs(wells: &PointTable) -> (Vec<Constraint>, StratColumn) {
    let mut ordered: Vec<(String, f64, Vec<(f64, f64, f64)>)> = wells
        .attributes()
        .iter()
        .filter_map(|name| {
            let samples = wells.samples(name)?;
            if samples.is_empty() {
                return None;
            }
            let mean = samples.iter().map(|s| s.2).sum::<f64>() / samples.len() as f64;
            Some((name.clone(), mean, samples))
        })
        .collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1));

    let constraints = ordered
        .iter()
        .flat_map(|(name, _, samples)| {
            samples.iter().map(move |&(x, y, z)| Constraint {
                x,
                y,
                z,
                feature: name.clone(),
            })
        })
        .collect();

    let units = ordered
        .iter()
        .enumerate()
        .map(|(id, (name, _, _))| StratUnit {
            name: name.clone(),
            id,
            min: id as f64,
            max: id as f64 + 1.0,
        })
        .collect();

    (constraints, StratColumn { units })
}

/// Exchanges files with a modeling tool through a working directory:
/// `constraints.csv`, `column.json` and `extent.json` go in, one
/// `<unit>.csv` of `x,y,z` vertices per unit comes back.
#[derive(Debug, Clone)]
pub struct MeshDirectory {
    dir: PathBuf,
}

impl MeshDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn mesh_path(&self, unit: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", file_stem_for(unit)))
    }

    fn write(&self, name: &str, contents: String) -> Result<(), PipelineError> {
        let path = self.dir.join(name);
        fs::write(&path, contents).map_err(PipelineError::io(&path))
    }
}

fn parse_mesh(path: &Path, text: &str) -> Result<Vec<(f64, f64, f64)>, PipelineError> {
    let malformed = |line: usize, reason: &str| {
        PipelineError::Modeler(format!("{} line {}: {}", path.display(), line, reason))
    };

    let mut vertices = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (i == 0 && line.starts_with(|c: char| c.is_alphabetic())) {
            continue;
        }

        let values = line
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed(i + 1, "not a number"))?;
        match values.as_slice() {
            [x, y, z] => vertices.push((*x, *y, *z)),
            _ => return Err(malformed(i + 1, "expected x,y,z")),
        }
    }
    Ok(vertices)
}

impl SurfaceModeler for MeshDirectory {
    fn submit(
        &mut self,
        extent: Extent,
        constraints: &[Constraint],
        column: &StratColumn,
    ) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir).map_err(PipelineError::io(&self.dir))?;

        let mut csv = String::from("X,Y,Z,val,feature_name\n");
        for c in constraints {
            csv.push_str(&format!("{},{},{},0,{}\n", c.x, c.y, c.z, csv_quote(&c.feature)));
        }
        self.write("constraints.csv", csv)?;

        let column_json = serde_json::to_string_pretty(column)
            .map_err(|e| PipelineError::Modeler(e.to_string()))?;
        self.write("column.json", column_json)?;

        let ((x0, y0, z0), (x1, y1, z1)) = extent;
        let extent_json = serde_json::json!({"origin": [x0, y0, z0], "maximum": [x1, y1, z1]});
        self.write("extent.json", extent_json.to_string())?;

        info!(
            "Submitted {} constraints for {} units to {}",
            constraints.len(),
            column.units.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn surfaces(&self, column: &StratColumn) -> Result<Vec<SurfaceMesh>, PipelineError> {
        column
            .units
            .iter()
            .map(|unit| {
                let path = self.mesh_path(&unit.name);
                let text = fs::read_to_string(&path).map_err(PipelineError::io(&path))?;
                Ok(SurfaceMesh {
                    name: unit.name.clone(),
                    vertices: parse_mesh(&path, &text)?,
                })
            })
            .collect()
    }
}

/// Runs the modeler over the well tops and writes one raster per unit to
/// `<output>/loop/<unit>.tif`, in the same elevation convention as the wells.
pub fn model_surfaces<M: SurfaceModeler + ?Sized>(
    config: &Config,
    modeler: &mut M,
) -> Result<Vec<PathBuf>, PipelineError> {
    let wells = load_wells(config)?;
    let (constraints, column) = model_inputs(&wells);
    if column.units.is_empty() {
        return Err(PipelineError::NoData("no formation tops to model".to_string()));
    }

    let outline = build_outline(&wells.coordinates(), config.outline())?;
    let bbox = outline.bbox().ok_or(OutlineError::Empty)?;
    let extent = (
        (bbox.xmin, bbox.ymin, MODEL_Z_RANGE.0),
        (bbox.xmax, bbox.ymax, MODEL_Z_RANGE.1),
    );

    modeler.submit(extent, &constraints, &column)?;
    let meshes = modeler.surfaces(&column)?;

    let builder = SurfaceBuilder::new(
        SampleGrid::new(bbox, config.n_samples())?,
        outline.polygons(),
        config.crs(),
    );
    let out_dir = config.output_dir().join("loop");

    let mut written = Vec::new();
    for mesh in meshes {
        let raster = match builder.build(&mesh.vertices) {
            Ok(raster) => raster,
            Err(e) => {
                warn!("Skipping {}: {}", mesh.name, e);
                continue;
            }
        };
        log_surface_statistics(&mesh.name, &raster.values);

        let path = out_dir.join(format!("{}.tif", file_stem_for(&mesh.name)));
        raster.write(&path, config.overwrite())?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{DataReader, GeoTiffReader, PointRecord, csv_split};
    use tempfile::tempdir;

    fn wells() -> PointTable {
        let record = |id: &str, x: f64, y: f64, tops: Vec<Option<f64>>| PointRecord {
            id: id.to_string(),
            x,
            y,
            attributes: tops,
        };
        PointTable::new(
            vec!["DEEP_TOP".to_string(), "SHALLOW_TOP".to_string()],
            vec![
                record("1", 0.0, 0.0, vec![Some(-2000.0), Some(-500.0)]),
                record("2", 10.0, 0.0, vec![Some(-2100.0), None]),
                record("3", 0.0, 10.0, vec![None, Some(-520.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_model_inputs_order_units_by_elevation() {
        let (constraints, column) = model_inputs(&wells());

        let names: Vec<&str> = column.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["SHALLOW_TOP", "DEEP_TOP"]);
        assert_eq!(column.units[1].id, 1);

        assert_eq!(constraints.len(), 4);
        assert_eq!(constraints[0].feature, "SHALLOW_TOP");
        assert_eq!(constraints[0].z, -500.0);
    }

    /// Returns flat meshes at a fixed depth per unit.
    struct FlatModeler {
        submitted: usize,
        bbox: Option<Extent>,
    }

    impl SurfaceModeler for FlatModeler {
        fn submit(&mut self, extent: Extent, constraints: &[Constraint], _: &StratColumn) -> Result<(), PipelineError> {
            self.submitted = constraints.len();
            self.bbox = Some(extent);
            Ok(())
        }

        fn surfaces(&self, column: &StratColumn) -> Result<Vec<SurfaceMesh>, PipelineError> {
            let ((x0, y0, _), (x1, y1, _)) = self.bbox.ok_or_else(|| PipelineError::Modeler("not submitted".into()))?;
            Ok(column
                .units
                .iter()
                .map(|u| SurfaceMesh {
                    name: u.name.clone(),
                    vertices: vec![
                        (x0, y0, -100.0 * (u.id + 1) as f64),
                        (x1, y0, -100.0 * (u.id + 1) as f64),
                        (x1, y1, -100.0 * (u.id + 1) as f64),
                        (x0, y1, -100.0 * (u.id + 1) as f64),
                    ],
                })
                .collect())
        }
    }

    #[test]
    fn test_mesh_directory_exchange() {
        let dir = tempdir().unwrap();
        let mut meshes = MeshDirectory::new(dir.path().join("loop-work"));
        let (constraints, column) = model_inputs(&wells());

        meshes
            .submit(((0.0, 0.0, -5000.0), (10.0, 10.0, 1000.0)), &constraints, &column)
            .unwrap();
        let written = fs::read_to_string(dir.path().join("loop-work").join("constraints.csv")).unwrap();
        assert_eq!(written.lines().next(), Some("X,Y,Z,val,feature_name"));
        assert_eq!(written.lines().count(), 5);

        // Nothing produced yet
        assert!(matches!(meshes.surfaces(&column), Err(PipelineError::Io { .. })));

        fs::write(meshes.mesh_path("SHALLOW_TOP"), "x,y,z\n0,0,-500\n10,0,-510\n0,10,-505\n").unwrap();
        fs::write(meshes.mesh_path("DEEP_TOP"), "0,0,-2000\n10,0,-2100\n0,10,oops\n").unwrap();
        assert!(matches!(meshes.surfaces(&column), Err(PipelineError::Modeler(_))));

        fs::write(meshes.mesh_path("DEEP_TOP"), "0,0,-2000\n10,0,-2100\n0,10,-2050\n").unwrap();
        let surfaces = meshes.surfaces(&column).unwrap();
        assert_eq!(surfaces.len(), 2);
        assert_eq!(surfaces[0].vertices[1], (10.0, 0.0, -510.0));
    }

    #[test]
    fn test_model_surfaces_with_fake_modeler() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("wells.csv");
        fs::write(
            &csv,
            "WELL_ID,LAT,LONG,A_TOP,B_TOP\n1,47.8,-103.8,-1000,-3000\n2,47.8,-102.6,-1100,-3100\n3,48.6,-103.2,-1200,-3200\n",
        )
        .unwrap();
        let config = Config::default()
            .with_wells(crate::config::WellColumns {
                path: csv,
                ..Default::default()
            })
            .with_output_dir(dir.path().join("output"))
            .with_n_samples(30);

        let mut modeler = FlatModeler { submitted: 0, bbox: None };
        let written = model_surfaces(&config, &mut modeler).unwrap();

        assert_eq!(modeler.submitted, 6);
        assert_eq!(
            written,
            vec![
                dir.path().join("output").join("loop").join("A_TOP.tif"),
                dir.path().join("output").join("loop").join("B_TOP.tif"),
            ]
        );

        // Flat mesh at -100 m stays negative
        let raster = GeoTiffReader::new(&written[0]).read_data().unwrap();
        let valid: Vec<f64> = raster.values.iter().copied().filter(|v| !v.is_nan()).collect();
        assert!(!valid.is_empty());
        assert!(valid.iter().all(|v| (v + 100.0).abs() < 1e-6));
    }

    #[test]
    fn test_constraints_quote_feature_names() {
        let dir = tempdir().unwrap();
        let mut meshes = MeshDirectory::new(dir.path());
        let constraints = vec![Constraint {
            x: 1.0,
            y: 2.0,
            z: -3.0,
            feature: "LODGEPOLE, \"UPPER\"".to_string(),
        }];

        meshes
            .submit(((0.0, 0.0, -5000.0), (10.0, 10.0, 1000.0)), &constraints, &StratColumn { units: Vec::new() })
            .unwrap();
        let written = fs::read_to_string(dir.path().join("constraints.csv")).unwrap();
        let row = written.lines().nth(1).unwrap();

        assert_eq!(row, r#"1,2,-3,0,"LODGEPOLE, ""UPPER""""#);
        assert_eq!(csv_split(row), vec!["1", "2", "-3", "0", "LODGEPOLE, \"UPPER\""]);
    }
}
