//! Name lookups against the Macrostrat dictionaries. Each name must match
//! exactly one record.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::{LookupError, ReferenceSource};

/// Age bound as given by the user: a number in Ma, or a named time interval.
#[derive(Debug, Clone, PartialEq)]
pub enum AgeBound {
    Ma(f64),
    Interval(String),
}

impl FromStr for AgeBound {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<f64>() {
            Ok(ma) => AgeBound::Ma(ma),
            Err(_) => AgeBound::Interval(s.to_string()),
        })
    }
}

impl fmt::Display for AgeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeBound::Ma(ma) => write!(f, "{} Ma", ma),
            AgeBound::Interval(name) => write!(f, "{}", name),
        }
    }
}

/// Which end of an interval a bound refers to. The top is the young edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeEdge {
    Top,
    Base,
}

impl AgeEdge {
    fn field(self) -> &'static str {
        match self {
            AgeEdge::Top => "t_age",
            AgeEdge::Base => "b_age",
        }
    }
}

/// Fetches the single record matching `name`.
fn lookup_one<S: ReferenceSource + ?Sized>(
    source: &S,
    endpoint: &str,
    key: &str,
    kind: &'static str,
    name: &str,
) -> Result<Value, LookupError> {
    let mut records = source.fetch_records(endpoint, &[(key, Some(name.to_string()))])?;
    match records.len() {
        0 => Err(LookupError::NotFound {
            kind,
            name: name.to_string(),
        }),
        1 => Ok(records.remove(0)),
        count => Err(LookupError::Ambiguous {
            kind,
            name: name.to_string(),
            count,
        }),
    }
}

/// Numeric age of a bound. Named intervals resolve to their `t_age` or
/// `b_age`, depending on `edge`.
pub fn resolve_age<S: ReferenceSource + ?Sized>(
    source: &S,
    bound: &AgeBound,
    edge: AgeEdge,
) -> Result<f64, LookupError> {
    let name = match bound {
        AgeBound::Ma(ma) => return Ok(*ma),
        AgeBound::Interval(name) => name,
    };

    let interval = lookup_one(source, "defs/intervals", "name", "interval", name)?;
    let age = interval
        .get(edge.field())
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| LookupError::MissingField {
            kind: "interval",
            name: name.clone(),
            field: edge.field(),
        })?;

    debug!("Interval {} {} = {} Ma", name, edge.field(), age);
    Ok(age)
}

/// Requested age window. `min` is the young (upper) bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgeRange {
    pub min: Option<AgeBound>,
    pub max: Option<AgeBound>,
}

impl AgeRange {
    pub fn new(min: Option<AgeBound>, max: Option<AgeBound>) -> Self {
        Self { min, max }
    }

    /// Checks what can be checked without a lookup: two numeric bounds must
    /// be ordered.
    pub fn validate(&self) -> Result<(), LookupError> {
        if let (Some(AgeBound::Ma(min)), Some(AgeBound::Ma(max))) = (&self.min, &self.max) {
            check_order(*min, *max)?;
        }
        Ok(())
    }

    /// Resolves both bounds to Ma and checks their order again.
    pub fn resolve<S: ReferenceSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<(Option<f64>, Option<f64>), LookupError> {
        self.validate()?;

        let min = self
            .min
            .as_ref()
            .map(|b| resolve_age(source, b, AgeEdge::Top))
            .transpose()?;
        let max = self
            .max
            .as_ref()
            .map(|b| resolve_age(source, b, AgeEdge::Base))
            .transpose()?;

        if let (Some(min), Some(max)) = (min, max) {
            check_order(min, max)?;
        }
        Ok((min, max))
    }
}

fn check_order(min: f64, max: f64) -> Result<(), LookupError> {
    if min > max {
        return Err(LookupError::AgeOrder { min, max });
    }
    Ok(())
}

/// Level of the lithology hierarchy a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LithLevel {
    Class,
    Type,
    Group,
    Name,
}

impl LithLevel {
    /// Query parameter the units endpoint expects for this level.
    pub fn param(self) -> &'static str {
        match self {
            LithLevel::Class => "lith_class",
            LithLevel::Type => "lith_type",
            LithLevel::Group => "lith_group",
            LithLevel::Name => "lith",
        }
    }

    fn field(self) -> &'static str {
        match self {
            LithLevel::Class => "class",
            LithLevel::Type => "type",
            LithLevel::Group => "group",
            LithLevel::Name => "name",
        }
    }
}

/// Finds the hierarchy level of a lithology name, checking the broadest
/// level first.
pub fn lithology_level<S: ReferenceSource + ?Sized>(
    source: &S,
    name: &str,
) -> Result<LithLevel, LookupError> {
    let record = lookup_one(source, "defs/lithologies", "lith", "lithology", name)?;

    [LithLevel::Class, LithLevel::Type, LithLevel::Group, LithLevel::Name]
        .into_iter()
        .find(|level| record.get(level.field()).and_then(Value::as_str) == Some(name))
        .ok_or_else(|| LookupError::MissingField {
            kind: "lithology",
            name: name.to_string(),
            field: "class/type/group/name",
        })
}
