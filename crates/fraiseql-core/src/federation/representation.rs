//! Entity representations (`_Any` inputs).

use fraiseql_error::{FederationError, Result};
use serde_json::Value;

/// One `{__typename, key-fields}` object supplied to `_entities`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRepresentation {
    /// Concrete type name.
    pub typename: String,

    /// The full representation object (keys plus any pre-fetched fields).
    pub fields: serde_json::Map<String, Value>,
}

impl EntityRepresentation {
    /// Parse one `_Any` value.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::EntityNotResolvable`] when the value is
    /// not an object or lacks `__typename`.
    pub fn from_any(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(FederationError::EntityNotResolvable {
                type_name: "<non-object representation>".to_string(),
            }
            .into());
        };
        let Some(typename) = object.get("__typename").and_then(Value::as_str) else {
            return Err(FederationError::EntityNotResolvable {
                type_name: "<missing __typename>".to_string(),
            }
            .into());
        };
        Ok(Self {
            typename: typename.to_string(),
            fields:   object.clone(),
        })
    }

    /// Whether the representation carries a (non-null) value for a field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_null())
    }

    /// The representation as a JSON object value (for batch SQL binding and
    /// subgraph request bodies).
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_representation() {
        let rep = EntityRepresentation::from_any(&json!({
            "__typename": "User",
            "id": "u1",
            "email": "a@b.c"
        }))
        .expect("parses");
        assert_eq!(rep.typename, "User");
        assert!(rep.has_field("id"));
        assert!(!rep.has_field("missing"));
    }

    #[test]
    fn test_missing_typename_rejected() {
        assert!(EntityRepresentation::from_any(&json!({"id": "u1"})).is_err());
        assert!(EntityRepresentation::from_any(&json!("scalar")).is_err());
    }

    #[test]
    fn test_null_field_counts_as_missing() {
        let rep = EntityRepresentation::from_any(&json!({
            "__typename": "Order",
            "id": "o1",
            "total": null
        }))
        .expect("parses");
        assert!(!rep.has_field("total"));
    }
}
