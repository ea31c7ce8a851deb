use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use super::lookup::LithLevel;
use super::{ApiError, ReferenceSource};

/// One stratigraphic unit record. Thicknesses are in metres.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Unit {
    pub unit_id: u64,
    #[serde(default)]
    pub unit_name: String,
    pub col_id: u64,
    pub t_age: f64,
    pub b_age: f64,
    #[serde(default)]
    pub min_thick: f64,
    #[serde(default)]
    pub max_thick: f64,
}

/// Filters for the units endpoint, already resolved to API values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitQuery {
    pub strat_name: Option<String>,
    pub age_top: Option<f64>,
    pub age_bottom: Option<f64>,
    pub lithology: Option<(LithLevel, String)>,
}

impl UnitQuery {
    pub fn params(&self) -> Vec<(&str, Option<String>)> {
        let mut params = vec![
            ("strat_name", self.strat_name.clone()),
            ("age_top", self.age_top.map(|v| v.to_string())),
            ("age_bottom", self.age_bottom.map(|v| v.to_string())),
        ];
        if let Some((level, name)) = &self.lithology {
            params.push((level.param(), Some(name.clone())));
        }
        params
    }
}

pub fn fetch_units<S: ReferenceSource + ?Sized>(
    source: &S,
    query: &UnitQuery,
) -> Result<Vec<Unit>, ApiError> {
    let records = source.fetch_records("units", &query.params())?;

    let units = records
        .into_iter()
        .map(serde_json::from_value::<Unit>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Malformed {
            url: "units".to_string(),
            reason: e.to_string(),
        })?;

    info!("Fetched {} units", units.len());
    Ok(units)
}

/// All units of one column folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSummary {
    pub col_id: u64,
    pub unit_ids: String,
    pub unit_names: String,
    pub t_age: f64,
    pub b_age: f64,
    pub min_thick: f64,
    pub max_thick: f64,
}

/// Groups units per column: ids and names comma-joined in input order, the
/// youngest top, the oldest base and the summed thicknesses.
pub fn group_units_by_column(units: &[Unit]) -> BTreeMap<u64, UnitSummary> {
    let mut grouped: BTreeMap<u64, UnitSummary> = BTreeMap::new();

    for unit in units {
        grouped
            .entry(unit.col_id)
            .and_modify(|s| {
                s.unit_ids.push_str(&format!(",{}", unit.unit_id));
                s.unit_names.push_str(&format!(",{}", unit.unit_name));
                s.t_age = s.t_age.min(unit.t_age);
                s.b_age = s.b_age.max(unit.b_age);
                s.min_thick += unit.min_thick;
                s.max_thick += unit.max_thick;
            })
            .or_insert_with(|| UnitSummary {
                col_id: unit.col_id,
                unit_ids: unit.unit_id.to_string(),
                unit_names: unit.unit_name.clone(),
                t_age: unit.t_age,
                b_age: unit.b_age,
                min_thick: unit.min_thick,
                max_thick: unit.max_thick,
            });
    }

    grouped
}
