use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ApiError, ReferenceSource};

/// Column collections stored on disk, one file per project. A cached file is
/// used as-is; delete it to refetch. Nothing guards against two processes
/// writing the same file at once.
#[derive(Debug, Clone)]
pub struct ColumnCache {
    dir: PathBuf,
}

impl ColumnCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, project_id: u32) -> PathBuf {
        self.dir.join(format!("columns-project-{}.geojson", project_id))
    }

    /// GeoJSON text for the project's columns, fetched only on a cache miss.
    pub fn load_or_fetch<S: ReferenceSource + ?Sized>(
        &self,
        source: &S,
        project_id: u32,
    ) -> Result<String, ApiError> {
        let path = self.path_for(project_id);
        let cache_error = |source| ApiError::Cache {
            path: path.clone(),
            source,
        };

        if path.exists() {
            debug!("Using cached columns from {}", path.display());
            return fs::read_to_string(&path).map_err(cache_error);
        }

        let text = source.fetch_text(
            "columns",
            &[
                ("project_id", Some(project_id.to_string())),
                ("format", Some("geojson_bare".to_string())),
            ],
        )?;

        fs::create_dir_all(&self.dir).map_err(cache_error)?;
        fs::write(&path, &text).map_err(cache_error)?;
        info!("Cached columns for project {} in {}", project_id, path.display());
        Ok(text)
    }
}
