pub mod bbox;
pub mod config;
pub mod geometry;
pub mod grid;
pub mod interpolate;
pub mod macrostrat;
pub mod outline;
pub mod pipeline;
pub mod raster;
pub mod readers;
pub mod utils;
pub mod vector;
