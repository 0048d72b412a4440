//! Field value types and coercion
//!
//! Query strings and request payloads carry untyped values. Every value that
//! reaches a [`Record`](crate::core::record::Record) or a filter predicate goes
//! through [`FieldValue::coerce`] first, which dispatches on the declared
//! [`PropertyType`] instead of guessing from the value's shape.
//!
//! # Coercion table
//!
//! | declared type | accepted input                                               | rejected with            |
//! |---------------|--------------------------------------------------------------|--------------------------|
//! | `string`      | any string; numbers and booleans are stringified             | `must be a string`       |
//! | `integer`     | JSON integers, integral floats, strings parsing as either    | `must be a number` / `must be an integer` |
//! | `float`       | JSON numbers, strings parsing as a finite float              | `must be a number`       |
//! | `boolean`     | `true`/`false`, `1`/`0`, strings `"true"`/`"1"`/`"false"`/`"0"` (case-insensitive) | `must be a boolean` |
//! | `date`        | `YYYY-MM-DD`, or an RFC 3339 timestamp (date part kept)      | `must be a date`         |
//! | `datetime`    | RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (UTC), `YYYY-MM-DD` (midnight UTC), integer epoch milliseconds | `must be a datetime` |
//! | relation      | a string id, or a number (stringified)                       | `must be an id`          |
//!
//! Strings are trimmed before numeric, boolean and date parsing; the empty
//! string is never a number, a boolean or a date. JSON `null` coerces to
//! [`FieldValue::Null`] for every type.

use crate::core::schema::PropertyType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

/// Why a raw value could not be coerced to its declared type
///
/// The display form is the tail of the client-facing message; callers
/// prefix it with the quoted property name (`"integer" must be a number`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("must be a string")]
    NotString,
    #[error("must be a number")]
    NotNumber,
    #[error("must be an integer")]
    NotInteger,
    #[error("must be a boolean")]
    NotBoolean,
    #[error("must be a date")]
    NotDate,
    #[error("must be a datetime")]
    NotDateTime,
    #[error("must be an id")]
    NotId,
}

impl FieldValue {
    /// Coerce a raw JSON value to the given declared type
    pub fn coerce(raw: &Value, property_type: &PropertyType) -> Result<Self, CoercionError> {
        if raw.is_null() {
            return Ok(FieldValue::Null);
        }

        match property_type {
            PropertyType::String => coerce_string(raw).ok_or(CoercionError::NotString),
            PropertyType::Integer => coerce_integer(raw),
            PropertyType::Float => coerce_float(raw).ok_or(CoercionError::NotNumber),
            PropertyType::Boolean => coerce_boolean(raw).ok_or(CoercionError::NotBoolean),
            PropertyType::Date => coerce_date(raw).ok_or(CoercionError::NotDate),
            PropertyType::DateTime => coerce_datetime(raw).ok_or(CoercionError::NotDateTime),
            PropertyType::Relation { .. } => coerce_string(raw)
                .filter(|_| !raw.is_boolean())
                .ok_or(CoercionError::NotId),
        }
    }

    /// Get the value as a float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Order two values of compatible kinds
    ///
    /// Integers and floats compare numerically with each other. Values of
    /// unrelated kinds, and nulls, are unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::DateTime(b)) => Some(a.cmp(&b.date_naive())),
            (FieldValue::DateTime(a), FieldValue::Date(b)) => Some(a.date_naive().cmp(b)),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Equality used by filter predicates (numeric kinds compare by value)
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Render the value as a group-by label
    pub fn label(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::DateTime(dt) => dt.to_rfc3339(),
            FieldValue::Null => "null".to_string(),
        }
    }

    /// Convert to a JSON value for attribute rendering
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

fn trimmed(raw: &Value) -> Option<&str> {
    raw.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn coerce_string(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::String(s) => Some(FieldValue::String(s.clone())),
        Value::Number(n) => Some(FieldValue::String(n.to_string())),
        Value::Bool(b) => Some(FieldValue::String(b.to_string())),
        _ => None,
    }
}

fn coerce_integer(raw: &Value) -> Result<FieldValue, CoercionError> {
    let float = match raw {
        Value::Number(n) => match n.as_i64() {
            Some(i) => return Ok(FieldValue::Integer(i)),
            None => n.as_f64(),
        },
        Value::String(_) => {
            let s = trimmed(raw).ok_or(CoercionError::NotNumber)?;
            if let Ok(i) = s.parse::<i64>() {
                return Ok(FieldValue::Integer(i));
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };

    match float.filter(|f| f.is_finite()) {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(FieldValue::Integer(f as i64))
        }
        Some(_) => Err(CoercionError::NotInteger),
        None => Err(CoercionError::NotNumber),
    }
}

fn coerce_float(raw: &Value) -> Option<FieldValue> {
    let f = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(_) => trimmed(raw)?.parse::<f64>().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(FieldValue::Float(f))
}

fn coerce_boolean(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Bool(b) => Some(FieldValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(FieldValue::Boolean(true)),
            Some(0) => Some(FieldValue::Boolean(false)),
            _ => None,
        },
        Value::String(_) => match trimmed(raw)?.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(FieldValue::Boolean(true)),
            "false" | "0" => Some(FieldValue::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_date(raw: &Value) -> Option<FieldValue> {
    let s = trimmed(raw)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .map(FieldValue::Date)
}

fn coerce_datetime(raw: &Value) -> Option<FieldValue> {
    if let Some(millis) = raw.as_i64() {
        return DateTime::from_timestamp_millis(millis).map(FieldValue::DateTime);
    }

    let s = trimmed(raw)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(FieldValue::DateTime(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(FieldValue::DateTime(naive.and_utc()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| FieldValue::DateTime(naive.and_utc()))
}
