//! Shared value representation for the ThingModel workspace.
//!
//! Every field of a thing type is bound to a [`ValueKind`], and every field of
//! a thing carries a [`Value`] of exactly that kind. The kind set is closed:
//! supporting a new primitive means adding a variant to both enums, never a
//! runtime type dispatch.
//!
//! No crate in the workspace defines its own value representation. Schema
//! declarations, the warehouse, the sink wire format and the adapter all go
//! through these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The semantic type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Free text.
    String,
    /// 64-bit floating point number.
    Double,
    /// 64-bit signed integer.
    Int,
    /// True or false.
    Boolean,
    /// A UTC timestamp.
    DateTime,
    /// A WGS84 latitude/longitude pair.
    LatLng,
}

impl ValueKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [ValueKind; 6] = [
        Self::String,
        Self::Double,
        Self::Int,
        Self::Boolean,
        Self::DateTime,
        Self::LatLng,
    ];

    /// Returns the canonical lowercase label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Double => "double",
            Self::Int => "int",
            Self::Boolean => "boolean",
            Self::DateTime => "date_time",
            Self::LatLng => "lat_lng",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueKind {
    type Err = ParseValueKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "double" => Ok(Self::Double),
            "int" => Ok(Self::Int),
            "boolean" => Ok(Self::Boolean),
            "date_time" => Ok(Self::DateTime),
            "lat_lng" => Ok(Self::LatLng),
            _ => Err(ParseValueKindError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown value kind label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value kind: {0}")]
pub struct ParseValueKindError(pub String);

/// A geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude, positive north of the equator.
    pub latitude: f64,
    /// Longitude, positive east of Greenwich.
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A typed field value.
///
/// Serialised as `{"kind": "<label>", "value": <payload>}` so consumers can
/// dispatch on the kind without inspecting the payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Double(f64),
    Int(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    LatLng(LatLng),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Double(_) => ValueKind::Double,
            Self::Int(_) => ValueKind::Int,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::LatLng(_) => ValueKind::LatLng,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_lat_lng(&self) -> Option<LatLng> {
        match self {
            Self::LatLng(loc) => Some(*loc),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<LatLng> for Value {
    fn from(value: LatLng) -> Self {
        Self::LatLng(value)
    }
}
