// SPDX-License-Identifier: MIT

//! Document value model
//!
//! Documents hold loosely-typed bodies. Representing them as a tagged
//! variant (rather than raw JSON) makes the reference-vs-non-reference
//! branch in the resolver a pattern match instead of a runtime probe.

use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

use super::error::StoreError;

/// Reserved key marking a reference in JSON interchange:
/// `{"$ref": "collection/id"}`.
pub const REF_KEY: &str = "$ref";

/// An unresolved pointer to another document.
///
/// Equality is structural: two references to the same collection and id
/// compare equal regardless of how they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    pub collection: String,
    pub id: String,
}

impl Reference {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Parse a `collection/id` path into a reference.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        match path.split_once('/') {
            Some((collection, id)) if !collection.is_empty() && !id.is_empty() => {
                Ok(Self::new(collection, id))
            }
            _ => Err(StoreError::InvalidPath(path.to_string())),
        }
    }

    /// The `collection/id` path of this reference.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A single field value in a document body.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Reference(Reference),
}

/// A document body: field name to value.
pub type Fields = BTreeMap<String, Value>;

impl Value {
    /// Convert interchange JSON into a value. An object of the exact shape
    /// `{"$ref": "collection/id"}` becomes a [`Value::Reference`]; everything
    /// else maps structurally.
    pub fn from_json(json: &JsonValue) -> Result<Self, StoreError> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::Number(n) => Ok(Value::Number(n.clone())),
            JsonValue::String(s) => Ok(Value::String(s.clone())),
            JsonValue::Array(items) => Ok(Value::Array(
                items.iter().map(Value::from_json).collect::<Result<_, _>>()?,
            )),
            JsonValue::Object(map) => {
                if map.len() == 1 {
                    if let Some(JsonValue::String(path)) = map.get(REF_KEY) {
                        return Ok(Value::Reference(Reference::parse(path)?));
                    }
                }
                let mut fields = BTreeMap::new();
                for (key, value) in map {
                    fields.insert(key.clone(), Value::from_json(value)?);
                }
                Ok(Value::Map(fields))
            }
        }
    }

    /// Convert back to interchange JSON. References serialize as
    /// `{"$ref": "collection/id"}`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            Value::Reference(reference) => json!({ REF_KEY: reference.path() }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Value::Reference(reference)
    }
}

/// Convert a whole JSON object into a field map.
pub fn fields_from_json(json: &JsonValue) -> Result<Fields, StoreError> {
    match Value::from_json(json)? {
        Value::Map(fields) => Ok(fields),
        _ => Err(StoreError::InvalidBody(
            "document body must be a JSON object".to_string(),
        )),
    }
}

/// Convert a field map back into a JSON object.
pub fn fields_to_json(fields: &Fields) -> JsonValue {
    Value::Map(fields.clone()).to_json()
}

/// A document as returned by the store: its id plus its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// JSON shape with the id folded into the body, the way list endpoints
    /// return rows.
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("id".to_string(), JsonValue::String(self.id.clone()));
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_structural_equality() {
        let a = Reference::new("users", "u1");
        let b = Reference::parse("users/u1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path(), "users/u1");
    }

    #[test]
    fn test_reference_parse_rejects_bad_paths() {
        assert!(Reference::parse("users").is_err());
        assert!(Reference::parse("/u1").is_err());
        assert!(Reference::parse("users/").is_err());
    }

    #[test]
    fn test_ref_shape_becomes_reference() {
        let value = Value::from_json(&json!({"$ref": "users/u1"})).unwrap();
        assert_eq!(value, Value::Reference(Reference::new("users", "u1")));
    }

    #[test]
    fn test_object_with_extra_keys_stays_a_map() {
        let value = Value::from_json(&json!({"$ref": "users/u1", "note": "x"})).unwrap();
        assert!(matches!(value, Value::Map(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let json = json!({
            "name": "ops",
            "size": 3,
            "active": true,
            "lead": {"$ref": "users/u1"},
            "members": [{"$ref": "users/u1"}, {"$ref": "users/u2"}, "guest"],
            "meta": {"region": "emea"}
        });
        let value = Value::from_json(&json).unwrap();
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_document_to_json_includes_id() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), Value::from("hello"));
        let doc = Document::new("d1", fields);
        assert_eq!(doc.to_json(), json!({"id": "d1", "title": "hello"}));
    }

    #[test]
    fn test_fields_from_json_rejects_non_objects() {
        assert!(fields_from_json(&json!([1, 2])).is_err());
        assert!(fields_from_json(&json!("nope")).is_err());
    }
}
