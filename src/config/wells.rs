use serde::Deserialize;
use std::path::PathBuf;

/// U.S. survey foot to metre.
pub const FT_TO_M: f64 = 0.304_800_609_601_219_2;

/// Layout of the well spreadsheet: which columns hold the key, the location
/// and the formation tops.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WellColumns {
    pub path: PathBuf,
    pub id_column: String,
    pub lat_column: String,
    pub lon_column: String,
    /// Substring that marks a formation top column, e.g. `MISSION_CANYON_TOP`.
    pub formation_marker: String,
    /// Multiplier applied to every formation value (feet to metres by default).
    pub depth_factor: f64,
}

impl Default for WellColumns {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/Williston_Basin_well_data.csv"),
            id_column: "WELL_ID".to_string(),
            lat_column: "LAT".to_string(),
            lon_column: "LONG".to_string(),
            formation_marker: "TOP".to_string(),
            depth_factor: FT_TO_M,
        }
    }
}
