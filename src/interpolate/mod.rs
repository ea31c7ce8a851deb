use thiserror::Error;

pub mod clough_tocher;
pub mod delaunay;

pub use clough_tocher::CloughTocher;
pub use delaunay::Triangulation;

#[derive(Debug, Error)]
pub enum InterpolateError {
    #[error("interpolation needs at least 3 distinct points, got {found}")]
    TooFewPoints { found: usize },
    #[error("all points lie on a single line")]
    Collinear,
    #[error("cannot triangulate point ({x}, {y})")]
    InvalidPoint { x: f64, y: f64 },
}
