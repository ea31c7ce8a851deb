//! Read-only access to the Macrostrat reference API: stratigraphic columns,
//! units, and the lithology/interval dictionaries used to build unit queries.

use std::path::PathBuf;
use thiserror::Error;

pub mod cache;
pub mod client;
pub mod columns;
pub mod lookup;
pub mod units;

pub use cache::ColumnCache;
pub use client::{MacrostratClient, ReferenceSource};
pub use columns::{Column, ColumnError, parse_columns};
pub use lookup::{AgeBound, AgeEdge, AgeRange, LithLevel, lithology_level, resolve_age};
pub use units::{Unit, UnitQuery, UnitSummary, fetch_units, group_units_by_column};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
    #[error("cache file {path}: {source}")]
    Cache {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no {kind} named '{name}'")]
    NotFound { kind: &'static str, name: String },
    #[error("{count} {kind} records match '{name}', expected exactly one")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },
    #[error("{kind} '{name}' has no usable '{field}'")]
    MissingField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },
    #[error("minimum age {min} Ma is older than maximum age {max} Ma")]
    AgeOrder { min: f64, max: f64 },
    #[error(transparent)]
    Api(#[from] ApiError),
}
