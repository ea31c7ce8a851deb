use gdal::errors::GdalError;
use ndarray::Array2;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::raster::GeoTransform;

pub trait DataReader {
    type Output;

    fn read_data(&self) -> Result<Self::Output, ReadError>;
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} has no header row")]
    Empty { path: PathBuf },
    #[error("{path} is missing required column {column}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("line {line}, column {column}: cannot parse {value:?} as a number")]
    Parse {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("attribute list has {attributes} names but record {id} has {values} values")]
    Shape {
        id: String,
        attributes: usize,
        values: usize,
    },
    #[error("Malformed raster {path}: {reason}")]
    Raster { path: PathBuf, reason: String },
    #[error("Unsupported file type: {0}")]
    UnknownFileType(PathBuf),
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),
}

/// One located record, e.g. a well with its formation tops. `attributes` is
/// co-indexed with the owning table's attribute names; `None` means the
/// record does not report that attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub attributes: Vec<Option<f64>>,
}

/// Sparse table of point records sharing one attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    attributes: Vec<String>,
    records: Vec<PointRecord>,
}

impl PointTable {
    pub fn new(attributes: Vec<String>, records: Vec<PointRecord>) -> Result<Self, ReadError> {
        if let Some(bad) = records
            .iter()
            .find(|r| r.attributes.len() != attributes.len())
        {
            return Err(ReadError::Shape {
                id: bad.id.clone(),
                attributes: attributes.len(),
                values: bad.attributes.len(),
            });
        }

        Ok(Self {
            attributes,
            records,
        })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn records(&self) -> &[PointRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.records.iter().map(|r| (r.x, r.y)).collect()
    }

    /// `(x, y, value)` for every record that reports `attribute`.
    pub fn samples(&self, attribute: &str) -> Option<Vec<(f64, f64, f64)>> {
        let index = self.attributes.iter().position(|a| a == attribute)?;

        Some(
            self.records
                .iter()
                .filter_map(|r| r.attributes[index].map(|v| (r.x, r.y, v)))
                .collect(),
        )
    }

    /// Same records and values at new coordinates, e.g. after projection.
    pub fn relocated(&self, coordinates: &[(f64, f64)]) -> Self {
        let records = self
            .records
            .iter()
            .zip(coordinates)
            .map(|(r, &(x, y))| PointRecord {
                id: r.id.clone(),
                x,
                y,
                attributes: r.attributes.clone(),
            })
            .collect();

        Self {
            attributes: self.attributes.clone(),
            records,
        }
    }
}

impl fmt::Display for PointTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present = self
            .records
            .iter()
            .flat_map(|r| r.attributes.iter())
            .filter(|v| v.is_some())
            .count();

        write!(
            f,
            "Records: {}\nAttributes: {}\nValues present: {} / {}",
            self.records.len(),
            self.attributes.len(),
            present,
            self.records.len() * self.attributes.len(),
        )
    }
}

/// A single-band raster read back from disk.
#[derive(Debug)]
pub struct RasterData {
    pub values: Array2<f64>,
    pub transform: GeoTransform,
    pub epsg: Option<u32>,
}

impl RasterData {
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// Value of the pixel containing `(x, y)`; `None` off the raster.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.pixel_of(x, y)?;
        self.values.get((row, col)).copied()
    }
}

impl fmt::Display for RasterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid = self.values.iter().filter(|x| !x.is_nan());
        let min_value = valid.clone().fold(f64::NAN, |a, &b| a.min(b));
        let max_value = valid.fold(f64::NAN, |a, &b| a.max(b));

        write!(
            f,
            "Width: {}\nHeight: {}\nBuffer Length: {}\nMin value: {}\nMax value: {}",
            self.width(),
            self.height(),
            self.values.len(),
            min_value,
            max_value,
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    GeoTiff,
    AsciiGrid,
}
