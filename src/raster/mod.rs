use gdal::errors::GdalError;
use std::path::PathBuf;
use thiserror::Error;

pub mod mask;
pub mod transform;
pub mod writer;

pub use mask::{apply_mask, mask_negative, outside_mask};
pub use transform::GeoTransform;
pub use writer::{RasterOutput, prepare_destination};

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} already exists and overwriting is disabled")]
    Exists(PathBuf),
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),
}
