use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::types::ColumnKind;

/// Concrete value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Json(Value),
    Array(Vec<GeneratedValue>),
    Bytes(Vec<u8>),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            GeneratedValue::Date(value) => Some(*value),
            GeneratedValue::Timestamp(value) => Some(value.date()),
            _ => None,
        }
    }

    /// Canonical string used for uniqueness tracking and row matching.
    pub fn key(&self) -> String {
        match self {
            GeneratedValue::Null => "<null>".to_string(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Time(value) => value.format("%H:%M:%S%.f").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            GeneratedValue::Json(value) => value.to_string(),
            GeneratedValue::Array(values) => {
                let parts: Vec<String> = values.iter().map(GeneratedValue::key).collect();
                format!("[{}]", parts.join(","))
            }
            GeneratedValue::Bytes(bytes) => format!("\\x{}", hex::encode(bytes)),
        }
    }

    /// Convert a JSON literal into a value shaped by the column kind.
    pub fn from_json(value: &Value, kind: &ColumnKind) -> Result<Self, String> {
        if value.is_null() {
            return Ok(GeneratedValue::Null);
        }
        match kind {
            ColumnKind::Json => Ok(GeneratedValue::Json(value.clone())),
            ColumnKind::Array(inner) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("expected an array, got {value}"))?;
                items
                    .iter()
                    .map(|item| Self::from_json(item, inner))
                    .collect::<Result<Vec<_>, _>>()
                    .map(GeneratedValue::Array)
            }
            ColumnKind::SmallInt | ColumnKind::Int | ColumnKind::BigInt => value
                .as_i64()
                .map(GeneratedValue::Int)
                .ok_or_else(|| format!("expected an integer, got {value}")),
            ColumnKind::Float | ColumnKind::Decimal { .. } => value
                .as_f64()
                .map(GeneratedValue::Float)
                .ok_or_else(|| format!("expected a number, got {value}")),
            ColumnKind::Bool => value
                .as_bool()
                .map(GeneratedValue::Bool)
                .ok_or_else(|| format!("expected a boolean, got {value}")),
            ColumnKind::Uuid => expect_str(value).map(|text| GeneratedValue::Uuid(text.to_string())),
            ColumnKind::Date => {
                let text = expect_str(value)?;
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map(GeneratedValue::Date)
                    .map_err(|err| format!("invalid date '{text}': {err}"))
            }
            ColumnKind::Time => {
                let text = expect_str(value)?;
                NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                    .map(GeneratedValue::Time)
                    .map_err(|err| format!("invalid time '{text}': {err}"))
            }
            ColumnKind::Timestamp { .. } => {
                let text = expect_str(value)?;
                parse_timestamp(text)
                    .map(GeneratedValue::Timestamp)
                    .ok_or_else(|| format!("invalid timestamp '{text}'"))
            }
            ColumnKind::Bytes => {
                let text = expect_str(value)?;
                match text.strip_prefix("\\x").or_else(|| text.strip_prefix("0x")) {
                    Some(digits) => hex::decode(digits)
                        .map(GeneratedValue::Bytes)
                        .map_err(|err| format!("invalid hex bytes '{text}': {err}")),
                    None => Ok(GeneratedValue::Bytes(text.as_bytes().to_vec())),
                }
            }
            ColumnKind::Text { .. } | ColumnKind::Enum(_) | ColumnKind::Unknown(_) => match value {
                Value::String(text) => Ok(GeneratedValue::Text(text.clone())),
                Value::Number(number) => Ok(GeneratedValue::Text(number.to_string())),
                Value::Bool(flag) => Ok(GeneratedValue::Text(flag.to_string())),
                other => Err(format!("expected a string, got {other}")),
            },
        }
    }
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {value}"))
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

impl From<&str> for GeneratedValue {
    fn from(value: &str) -> Self {
        GeneratedValue::Text(value.to_string())
    }
}

impl From<String> for GeneratedValue {
    fn from(value: String) -> Self {
        GeneratedValue::Text(value)
    }
}

impl From<i64> for GeneratedValue {
    fn from(value: i64) -> Self {
        GeneratedValue::Int(value)
    }
}

impl From<i32> for GeneratedValue {
    fn from(value: i32) -> Self {
        GeneratedValue::Int(i64::from(value))
    }
}

impl From<f64> for GeneratedValue {
    fn from(value: f64) -> Self {
        GeneratedValue::Float(value)
    }
}

impl From<bool> for GeneratedValue {
    fn from(value: bool) -> Self {
        GeneratedValue::Bool(value)
    }
}

/// A row slot: either a concrete value or the database default.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Column is left out of the INSERT so the database applies its default.
    Default,
    Value(GeneratedValue),
}

impl Cell {
    pub fn value(&self) -> Option<&GeneratedValue> {
        match self {
            Cell::Value(value) => Some(value),
            Cell::Default => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Cell::Default)
    }
}

impl From<GeneratedValue> for Cell {
    fn from(value: GeneratedValue) -> Self {
        Cell::Value(value)
    }
}

/// Row keyed by column name.
pub type Row = BTreeMap<String, Cell>;
