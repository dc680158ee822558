//! GraphQL error wire shape.
//!
//! Runtime errors never abort the whole response; they become entries in the
//! top-level `errors` array with a `path` and `extensions.code`, per the
//! GraphQL-over-HTTP convention.

use serde::{Deserialize, Serialize};

use crate::{FraiseQLError, SanitizationLevel};

/// One entry in a GraphQL response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Human-readable message (already sanitized for the configured level).
    pub message: String,

    /// Path to the field that failed (e.g. `["_entities", 1]`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,

    /// Machine-readable extensions.
    pub extensions: ErrorExtensions,
}

/// `extensions` object carried by every error entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorExtensions {
    /// Stable machine-readable code (e.g. `TIMEOUT`, `PERMISSION_DENIED`).
    pub code: String,
}

/// One segment of an error path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name segment.
    Field(String),
    /// List index segment.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl GraphQLError {
    /// Shape an error for the wire at the given sanitization level.
    #[must_use]
    pub fn from_error(err: &FraiseQLError, level: SanitizationLevel) -> Self {
        Self {
            message:    err.sanitized_message(level),
            path:       Vec::new(),
            extensions: ErrorExtensions {
                code: err.error_code().to_string(),
            },
        }
    }

    /// Attach a path to the error entry.
    #[must_use]
    pub fn at_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FederationError;

    #[test]
    fn test_path_serializes_mixed_segments() {
        let err: FraiseQLError = FederationError::EntityNotResolvable {
            type_name: "User".to_string(),
        }
        .into();
        let entry = GraphQLError::from_error(&err, SanitizationLevel::Internal)
            .at_path(vec!["_entities".into(), 1.into()]);

        let json = serde_json::to_value(&entry).expect("serializes");
        assert_eq!(json["path"], serde_json::json!(["_entities", 1]));
        assert_eq!(json["extensions"]["code"], "ENTITY_NOT_RESOLVABLE");
    }

    #[test]
    fn test_empty_path_is_omitted() {
        let err = FraiseQLError::internal("boom");
        let entry = GraphQLError::from_error(&err, SanitizationLevel::Public);
        let json = serde_json::to_value(&entry).expect("serializes");
        assert!(json.get("path").is_none());
    }
}
