//! The runtime value representation FHIRPath expressions evaluate over.
//!
//! `TypedValue` is the tagged-variant sum type the data model calls for
//! (§9): booleans, numbers, strings, the three temporal kinds, quantities,
//! and FHIR resources/backbone elements carried as raw JSON so navigation
//! doesn't need a typed model of every resource shape.

use rust_decimal::Decimal;
use serde_json::{Map, Value as Json};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Millisecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimePrecision {
    Hour,
    Minute,
    Second,
    Millisecond,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialDate {
    pub raw: String,
    pub precision: DatePrecision,
    pub value: chrono::NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialDateTime {
    pub raw: String,
    pub precision: DateTimePrecision,
    pub value: chrono::DateTime<chrono::Utc>,
    pub timezone_offset_seconds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialTime {
    pub raw: String,
    pub precision: TimePrecision,
    pub value: chrono::NaiveTime,
}

/// A single FHIRPath value. Collections are plain `Vec<TypedValue>`.
#[derive(Debug, Clone)]
pub enum TypedValue {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Date(PartialDate),
    DateTime(PartialDateTime),
    Time(PartialTime),
    Quantity { value: Decimal, unit: Option<String> },
    /// A FHIR resource or complex-typed element, carried as raw JSON fields.
    Resource { type_name: Option<String>, fields: Map<String, Json> },
    BackboneElement(Map<String, Json>),
    Null,
}

impl TypedValue {
    pub fn boolean(b: bool) -> Self {
        TypedValue::Boolean(b)
    }

    pub fn integer(i: i64) -> Self {
        TypedValue::Integer(i)
    }

    pub fn string(s: impl Into<String>) -> Self {
        TypedValue::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Boolean(_) => "Boolean",
            TypedValue::Integer(_) => "Integer",
            TypedValue::Decimal(_) => "Decimal",
            TypedValue::String(_) => "String",
            TypedValue::Date(_) => "Date",
            TypedValue::DateTime(_) => "DateTime",
            TypedValue::Time(_) => "Time",
            TypedValue::Quantity { .. } => "Quantity",
            TypedValue::Resource { .. } => "Resource",
            TypedValue::BackboneElement(_) => "BackboneElement",
            TypedValue::Null => "Null",
        }
    }

    /// Convert a raw JSON instance (a FHIR resource, or a property's raw
    /// value) into the equivalent TypedValue, inferring primitive tags from
    /// JSON shape where no richer information is available.
    pub fn from_json(value: &Json) -> TypedValue {
        match value {
            Json::Null => TypedValue::Null,
            Json::Bool(b) => TypedValue::Boolean(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TypedValue::Integer(i)
                } else {
                    Decimal::from_str_exact(&n.to_string())
                        .map(TypedValue::Decimal)
                        .unwrap_or(TypedValue::Null)
                }
            }
            Json::String(s) => crate::temporal::parse_as_temporal(s).unwrap_or(TypedValue::String(s.clone())),
            Json::Array(_) => TypedValue::Null, // arrays are flattened by the caller, not represented as a single value
            Json::Object(map) => {
                let type_name = map.get("resourceType").and_then(Json::as_str).map(str::to_string);
                if type_name.is_some() {
                    TypedValue::Resource { type_name, fields: map.clone() }
                } else {
                    TypedValue::BackboneElement(map.clone())
                }
            }
        }
    }

    /// The JSON object fields backing a Resource/BackboneElement, if any.
    pub fn as_object(&self) -> Option<&Map<String, Json>> {
        match self {
            TypedValue::Resource { fields, .. } => Some(fields),
            TypedValue::BackboneElement(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            TypedValue::Integer(i) => Some(Decimal::from(*i)),
            TypedValue::Decimal(d) => Some(*d),
            TypedValue::Quantity { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// FHIRPath `toString()` rendering.
    pub fn to_fhirpath_string(&self) -> Option<String> {
        match self {
            TypedValue::Null => None,
            TypedValue::Boolean(b) => Some(b.to_string()),
            TypedValue::Integer(i) => Some(i.to_string()),
            TypedValue::Decimal(d) => Some(d.to_string()),
            TypedValue::String(s) => Some(s.clone()),
            TypedValue::Date(d) => Some(d.raw.clone()),
            TypedValue::DateTime(dt) => Some(dt.raw.clone()),
            TypedValue::Time(t) => Some(t.raw.clone()),
            TypedValue::Quantity { value, unit } => match unit {
                Some(unit) => Some(format!("{value} '{unit}'")),
                None => Some(value.to_string()),
            },
            TypedValue::Resource { type_name, .. } => type_name.clone(),
            TypedValue::BackboneElement(_) => None,
        }
    }
}

/// FHIRPath `=` equality: exact value comparison, same type required.
pub fn equals(a: &TypedValue, b: &TypedValue) -> Option<bool> {
    Some(match (a, b) {
        (TypedValue::Null, _) | (_, TypedValue::Null) => return None,
        (TypedValue::Boolean(x), TypedValue::Boolean(y)) => x == y,
        (TypedValue::Integer(x), TypedValue::Integer(y)) => x == y,
        (TypedValue::String(x), TypedValue::String(y)) => x == y,
        (TypedValue::Date(x), TypedValue::Date(y)) => x.precision == y.precision && x.value == y.value,
        (TypedValue::Time(x), TypedValue::Time(y)) => x.precision == y.precision && x.value == y.value,
        (TypedValue::DateTime(x), TypedValue::DateTime(y)) => {
            x.precision == y.precision && x.value == y.value
        }
        (TypedValue::Quantity { value: v1, unit: u1 }, TypedValue::Quantity { value: v2, unit: u2 }) => {
            v1 == v2 && u1 == u2
        }
        _ => {
            if let (Some(x), Some(y)) = (a.as_decimal(), b.as_decimal()) {
                x == y
            } else {
                return None;
            }
        }
    })
}

/// FHIRPath `~` equivalence: case-insensitive strings, 0.01 decimal
/// tolerance, deep structural compare for objects.
pub fn equivalent(a: &TypedValue, b: &TypedValue) -> bool {
    match (a, b) {
        (TypedValue::Null, TypedValue::Null) => true,
        (TypedValue::String(x), TypedValue::String(y)) => x.to_lowercase() == y.to_lowercase(),
        (TypedValue::Resource { fields: x, .. }, TypedValue::Resource { fields: y, .. }) => x == y,
        (TypedValue::BackboneElement(x), TypedValue::BackboneElement(y)) => x == y,
        _ => {
            if let (Some(x), Some(y)) = (a.as_decimal(), b.as_decimal()) {
                (x - y).abs() <= Decimal::new(1, 2)
            } else {
                equals(a, b).unwrap_or(false)
            }
        }
    }
}

/// Ordering for the comparison operators (`< <= > >=`); `None` when the
/// types are not mutually orderable.
pub fn compare(a: &TypedValue, b: &TypedValue) -> Option<Ordering> {
    match (a, b) {
        (TypedValue::String(x), TypedValue::String(y)) => Some(x.cmp(y)),
        (TypedValue::Date(x), TypedValue::Date(y)) => x.value.partial_cmp(&y.value),
        (TypedValue::Time(x), TypedValue::Time(y)) => x.value.partial_cmp(&y.value),
        (TypedValue::DateTime(x), TypedValue::DateTime(y)) => x.value.partial_cmp(&y.value),
        _ => {
            let (x, y) = (a.as_decimal()?, b.as_decimal()?);
            x.partial_cmp(&y)
        }
    }
}
