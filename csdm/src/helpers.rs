//! Typed access to the fields of JSON objects in a CSDM document.
//!
use serde_json::{Map, Value};

use crate::errors::{Error, Result};
use crate::units::Quantity;

pub type Object = Map<String, Value>;

fn wrong_type(key: &str, expected: &str, context: &str) -> Error {
    Error::schema(format!("`{key}` in {context} must be {expected}"))
}

pub(crate) fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Object> {
    value
        .as_object()
        .ok_or_else(|| Error::schema(format!("{context} must be a JSON object")))
}

pub(crate) fn get_str<'a>(object: &'a Object, key: &str, context: &str) -> Result<Option<&'a str>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(wrong_type(key, "a string", context)),
    }
}

pub(crate) fn require_str<'a>(object: &'a Object, key: &str, context: &str) -> Result<&'a str> {
    get_str(object, key, context)?.ok_or_else(|| Error::missing(key, context))
}

/// A string field that defaults to empty
pub(crate) fn get_string(object: &Object, key: &str, context: &str) -> Result<String> {
    Ok(get_str(object, key, context)?.unwrap_or_default().to_string())
}

pub(crate) fn get_bool(object: &Object, key: &str, context: &str) -> Result<bool> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(wrong_type(key, "a boolean", context)),
    }
}

pub(crate) fn require_usize(object: &Object, key: &str, context: &str) -> Result<usize> {
    match object.get(key) {
        None | Some(Value::Null) => Err(Error::missing(key, context)),
        Some(value) => value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| wrong_type(key, "a non-negative integer", context)),
    }
}

/// Read a physical quantity written either as a string such as `"2.5 ms"` or as a bare number.
///
pub(crate) fn get_quantity(object: &Object, key: &str, context: &str) -> Result<Option<Quantity>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_quantity(value).map(Some).map_err(|err| match err {
            Error::UnitParse(msg) => Error::schema(format!("`{key}` in {context}: {msg}")),
            err => err,
        }),
    }
}

pub(crate) fn parse_quantity(value: &Value) -> Result<Quantity> {
    match value {
        Value::String(text) => Quantity::parse(text),
        Value::Number(number) => number
            .as_f64()
            .map(Quantity::dimensionless)
            .ok_or_else(|| Error::UnitParse(format!("bad number {number}"))),
        _ => Err(Error::UnitParse(format!("expected a quantity, got {value}"))),
    }
}

pub(crate) fn get_string_list(
    object: &Object,
    key: &str,
    context: &str,
) -> Result<Option<Vec<String>>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| wrong_type(key, "a list of strings", context))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(_) => Err(wrong_type(key, "a list of strings", context)),
    }
}

pub(crate) fn get_array<'a>(
    object: &'a Object,
    key: &str,
    context: &str,
) -> Result<Option<&'a Vec<Value>>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => Ok(Some(values)),
        Some(_) => Err(wrong_type(key, "a list", context)),
    }
}

/// The free-form `application` object, empty when absent
pub(crate) fn get_application(object: &Object, context: &str) -> Result<Object> {
    match object.get("application") {
        None | Some(Value::Null) => Ok(Object::new()),
        Some(Value::Object(application)) => Ok(application.clone()),
        Some(_) => Err(wrong_type("application", "an object", context)),
    }
}

/// Insert a string unless it is blank
pub(crate) fn insert_text(object: &mut Object, key: &str, value: &str) {
    if !value.trim().is_empty() {
        object.insert(key.to_string(), Value::String(value.to_string()));
    }
}

pub(crate) fn insert_application(object: &mut Object, application: &Object) {
    if !application.is_empty() {
        object.insert(
            "application".to_string(),
            Value::Object(application.clone()),
        );
    }
}

/// Number of points in a grid with the given dimension counts.
///
/// Fails with `ShapeMismatch` if the product overflows.
///
pub(crate) fn grid_size(counts: &[usize]) -> Result<usize> {
    counts.iter().try_fold(1usize, |size, &n| {
        size.checked_mul(n).ok_or_else(|| {
            Error::ShapeMismatch(format!("a grid with dimension counts {counts:?} is too large"))
        })
    })
}
