//! # Documents
//!
//! Every record the store keeps is a [`Document`]: a JSON object mapping
//! top-level field names to arbitrary JSON values.
//!
//! ## Shallow Merge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  existing: { id, items: [a, b], calculations: { netAmount: 814.6 } }   │
//! │  patch:    { items: [c], manualMazduri: "50" }                          │
//! │                                                                         │
//! │  merged:   { id, items: [c], calculations: { netAmount: 814.6 },        │
//! │              manualMazduri: "50" }                                      │
//! │                                                                         │
//! │  • top-level keys in the patch replace existing values                 │
//! │  • nested objects/arrays are replaced wholesale, never deep-merged     │
//! │  • `id` is never taken from a patch                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A schemaless record: JSON object keyed by top-level field name.
pub type Document = serde_json::Map<String, Value>;

/// Name of the identifier field present on every stored record.
pub const ID_FIELD: &str = "id";

/// Applies `patch` over `target`, replacing top-level fields.
///
/// The `id` field of `target` is left untouched.
pub fn shallow_merge(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        if key == ID_FIELD {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Returns the record's id, if it has a string one.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Serializes a value that must produce a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Deserializes a typed value out of a document.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(doc))
}

/// Case-insensitive equality used for customer-name matching.
///
/// Uses full Unicode lowercasing so Urdu/Latin names compare the same way on
/// every backend.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
