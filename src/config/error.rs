use thiserror::Error;

use super::MAX_REQUEST_TIMEOUT_SECS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("outline shrink_radius ({shrink}) must be smaller than expand_radius ({expand})")]
    RadiusOrder { expand: f64, shrink: f64 },
    #[error("outline radii must be positive")]
    Radius,
    #[error("simplify_tolerance must be >= 0")]
    Tolerance,
    #[error("n_samples must be at least 1")]
    Samples,
    #[error("request_timeout_secs should be between 1 and {}", MAX_REQUEST_TIMEOUT_SECS)]
    Timeout,
    #[error("depth_factor must be finite and non-zero")]
    DepthFactor,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}
