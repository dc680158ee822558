//! Keyset pagination cursors.
//!
//! A cursor is the URL-safe base64 of a canonical JSON array holding the
//! ordered keyset tuple of the last row on a page. Opaque to clients;
//! round-trips exactly.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use fraiseql_error::{FraiseQLError, ProtocolError, Result};

/// Ordered keyset tuple for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetCursor {
    /// Values of the ORDER BY columns, in keyset order.
    pub values: Vec<serde_json::Value>,
}

impl KeysetCursor {
    /// Build a cursor from the keyset column values of a row.
    #[must_use]
    pub fn new(values: Vec<serde_json::Value>) -> Self {
        Self { values }
    }

    /// Extract the keyset tuple from a row payload.
    ///
    /// Returns `None` if any keyset field is absent from the row.
    #[must_use]
    pub fn from_row(row: &serde_json::Value, keyset_fields: &[String]) -> Option<Self> {
        let mut values = Vec::with_capacity(keyset_fields.len());
        for field in keyset_fields {
            values.push(row.get(field)?.clone());
        }
        Some(Self { values })
    }

    /// Encode as an opaque cursor string.
    #[must_use]
    pub fn encode(&self) -> String {
        let canonical = serde_json::to_vec(&self.values)
            .expect("JSON values serialize infallibly");
        URL_SAFE_NO_PAD.encode(canonical)
    }

    /// Decode a client-supplied cursor.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for anything that is not base64-wrapped
    /// JSON array content.
    pub fn decode(cursor: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| malformed_cursor())?;
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|_| malformed_cursor())?;
        if values.is_empty() {
            return Err(malformed_cursor());
        }
        Ok(Self { values })
    }
}

fn malformed_cursor() -> FraiseQLError {
    ProtocolError::MalformedQuery {
        message: "invalid pagination cursor".to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = KeysetCursor::new(vec![json!("u2"), json!(17)]);
        let encoded = cursor.encode();
        let decoded = KeysetCursor::decode(&encoded).expect("decodes");
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_is_opaque_base64() {
        let cursor = KeysetCursor::new(vec![json!("u2")]);
        let encoded = cursor.encode();
        assert!(!encoded.contains('"'));
        assert!(!encoded.contains('='), "URL-safe alphabet without padding");
    }

    #[test]
    fn test_from_row_requires_all_fields() {
        let row = json!({"id": "u3", "created_at": "2026-01-01"});
        let cursor = KeysetCursor::from_row(&row, &["id".to_string()]).expect("extracts");
        assert_eq!(cursor.values, vec![json!("u3")]);

        assert!(KeysetCursor::from_row(&row, &["missing".to_string()]).is_none());
    }

    #[test]
    fn test_garbage_cursor_rejected() {
        assert!(KeysetCursor::decode("!!!not-base64!!!").is_err());
        // Valid base64, invalid payload.
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let bogus = URL_SAFE_NO_PAD.encode(b"{\"not\":\"array\"}");
        assert!(KeysetCursor::decode(&bogus).is_err());
    }
}
