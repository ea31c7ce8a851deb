use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::outline::OutlineParams;

pub mod error;
pub use error::ConfigError;

pub mod wells;
pub use wells::{FT_TO_M, WellColumns};

pub const DEFAULT_API_BASE_URL: &str = "https://dev2.macrostrat.org/api/v2";

/// CONUS Albers equal area; suits the Williston Basin.
pub const DEFAULT_CRS: u32 = 5069;

pub const DEFAULT_N_SAMPLES: usize = 1000;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Requests never wait longer than this, whatever the config says.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Everything a pipeline run needs to know about its surroundings. Passed
/// explicitly into loaders and writers.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    api_base_url: String,
    cache_dir: PathBuf,
    output_dir: PathBuf,
    crs: u32,
    n_samples: usize,
    request_timeout_secs: u64,
    overwrite: bool,
    outline: OutlineParams,
    wells: WellColumns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("output"),
            crs: DEFAULT_CRS,
            n_samples: DEFAULT_N_SAMPLES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            overwrite: true,
            outline: OutlineParams::default(),
            wells: WellColumns::default(),
        }
    }
}

// Deserializes over the defaults, so a config file only has to name what it
// changes. The merged result is validated before it is returned.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigHelper {
            api_base_url: Option<String>,
            cache_dir: Option<PathBuf>,
            output_dir: Option<PathBuf>,
            crs: Option<u32>,
            n_samples: Option<usize>,
            request_timeout_secs: Option<u64>,
            overwrite: Option<bool>,
            outline: Option<OutlineParams>,
            wells: Option<WellColumns>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;
        let defaults = Config::default();

        let config = Config {
            api_base_url: helper.api_base_url.unwrap_or(defaults.api_base_url),
            cache_dir: helper.cache_dir.unwrap_or(defaults.cache_dir),
            output_dir: helper.output_dir.unwrap_or(defaults.output_dir),
            crs: helper.crs.unwrap_or(defaults.crs),
            n_samples: helper.n_samples.unwrap_or(defaults.n_samples),
            request_timeout_secs: helper
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            overwrite: helper.overwrite.unwrap_or(defaults.overwrite),
            outline: helper.outline.unwrap_or(defaults.outline),
            wells: helper.wells.unwrap_or(defaults.wells),
        };

        config.validate().map_err(D::Error::custom)?;

        Ok(config)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let outline = &self.outline;
        if outline.expand_radius <= 0.0 || outline.shrink_radius <= 0.0 {
            return Err(ConfigError::Radius);
        }
        if outline.shrink_radius >= outline.expand_radius {
            return Err(ConfigError::RadiusOrder {
                expand: outline.expand_radius,
                shrink: outline.shrink_radius,
            });
        }
        if !(outline.simplify_tolerance >= 0.0) {
            return Err(ConfigError::Tolerance);
        }
        if self.n_samples == 0 {
            return Err(ConfigError::Samples);
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ConfigError::Timeout);
        }
        if !self.wells.depth_factor.is_finite() || self.wells.depth_factor == 0.0 {
            return Err(ConfigError::DepthFactor);
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn crs(&self) -> u32 {
        self.crs
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn outline(&self) -> &OutlineParams {
        &self.outline
    }

    pub fn wells(&self) -> &WellColumns {
        &self.wells
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    pub fn with_wells(mut self, wells: WellColumns) -> Self {
        self.wells = wells;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, file_path)
    }

    #[test]
    fn test_from_file() {
        let (_dir, path) = write_config(
            r#"
    {
        "cache_dir": "/tmp/macrostrat-cache",
        "crs": 5070,
        "n_samples": 250,
        "outline": {
            "expand_radius": 50000,
            "shrink_radius": 40000,
            "simplify_tolerance": 5000
        }
    }
    "#,
        );

        let config = Config::from_file(path).unwrap();

        assert_eq!(config.crs(), 5070);
        assert_eq!(config.n_samples(), 250);
        assert_eq!(config.cache_dir(), Path::new("/tmp/macrostrat-cache"));
        assert_eq!(config.outline().expand_radius, 50000.0);
        assert_eq!(config.outline().shrink_radius, 40000.0);
        // Untouched fields keep their defaults
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.overwrite());
        assert_eq!(config.wells(), &WellColumns::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        let (_dir, path) = write_config("{}");
        assert_eq!(Config::from_file(path).unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_shrink_larger_than_expand() {
        let (_dir, path) = write_config(
            r#"{"outline": {"expand_radius": 1000, "shrink_radius": 2000, "simplify_tolerance": 10}}"#,
        );
        let err = Config::from_file(path).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("shrink_radius"));
    }

    #[test]
    fn test_rejects_timeout_above_ceiling() {
        let (_dir, path) = write_config(r#"{"request_timeout_secs": 3600}"#);
        assert!(Config::from_file(path).is_err());

        let (_dir, path) = write_config(r#"{"request_timeout_secs": 0}"#);
        assert!(Config::from_file(path).is_err());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let (_dir, path) = write_config(r#"{"start_date": "2023-01-01"}"#);
        assert!(Config::from_file(path).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validate_defaults() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default().with_n_samples(0).validate().is_err());
    }
}
