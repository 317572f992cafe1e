//! # Lenient Field Decoding
//!
//! Frontends send the same field as `500` or `"500"` depending on the form
//! widget. These helpers accept both for fields that are stored as text
//! (`pageNo`, `debit`, `manualMazduri`, ...) or as numbers (`amount`).
//!
//! ```text
//! text field:    500 ──► "500"     "500" ──► "500"     null ──► None
//! number field:  "500" ──► 500.0   500 ──► 500.0       "abc" ──► error
//! ```
//!
//! Use with `#[serde(default, deserialize_with = "...")]`.

use serde::de::{Error, Unexpected};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Text field that also accepts numbers and booleans.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number_text(&number))),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        other => Err(D::Error::invalid_type(unexpected(&other), &"a string or number")),
    }
}

/// Number field that also accepts numeric text.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    to_number::<D::Error>(Value::deserialize(deserializer)?)
}

/// Optional number field that also accepts numeric text. `null` is absent.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => to_number::<D::Error>(value).map(Some),
    }
}

fn to_number<E: Error>(value: Value) -> Result<f64, E> {
    let parsed = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        other => return Err(E::invalid_type(unexpected(other), &"a number")),
    };

    match parsed {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(E::invalid_value(unexpected(&value), &"a number")),
    }
}

/// Integers keep their digits; `500.0` reads as "500".
fn number_text(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        int.to_string()
    } else if let Some(int) = number.as_u64() {
        int.to_string()
    } else {
        number.as_f64().map(|float| float.to_string()).unwrap_or_else(|| number.to_string())
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(flag) => Unexpected::Bool(*flag),
        Value::Number(number) => number
            .as_f64()
            .map(Unexpected::Float)
            .unwrap_or(Unexpected::Other("number")),
        Value::String(text) => Unexpected::Str(text),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}
