//! JSON response builder - the hot path.
//!
//! The database already returns each row as serialized JSON text. This
//! module builds the complete GraphQL response in a single pass over those
//! bytes: envelope framing, `__typename` injection at each row root,
//! snake_case → camelCase key rewriting, and whitespace stripping, all while
//! copying into one pre-allocated output buffer. There is no parse /
//! serialize round-trip and no per-row allocation beyond the buffer.
//!
//! Rows are consumed by value: a [`RowBytes`] enters exactly one builder
//! pass, which yields the [`ResponseBytes`] sent to the HTTP writer.

use fraiseql_error::graphql::GraphQLError;
use fraiseql_error::{DataError, Result};

use crate::db::RowBytes;
use crate::utils::casing::camelize_into;

/// Owned, framed, UTF-8 GraphQL response body.
///
/// Terminal value: handed to the HTTP writer without further touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBytes(Vec<u8>);

impl ResponseBytes {
    /// Byte view of the response.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the underlying buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the body is empty (never true for framed responses).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The response as UTF-8 text (it is constructed from UTF-8 inputs).
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("")
    }
}

/// Per-row slack for `"__typename":"...",` plus framing punctuation.
const RENAME_SLACK_PER_ROW: usize = 24;
/// Envelope overhead: `{"data":{...}}` plus field framing.
const ENVELOPE_OVERHEAD: usize = 64;

/// Streaming writer for one GraphQL response.
///
/// Fields are written in executor order; `finish` closes the envelope and
/// appends collected errors and extensions. Because the body is buffered
/// until `finish`, a mid-pass failure aborts cleanly before any byte
/// reaches the socket.
pub struct ResponseWriter {
    out:         Vec<u8>,
    first_field: bool,
    errors:      Vec<GraphQLError>,
}

impl ResponseWriter {
    /// Start a response with a pre-sized buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut out = Vec::with_capacity(capacity + ENVELOPE_OVERHEAD);
        out.extend_from_slice(b"{\"data\":{");
        Self {
            out,
            first_field: true,
            errors: Vec::new(),
        }
    }

    /// Start a response sized for the given rows.
    #[must_use]
    pub fn sized_for(rows: &[RowBytes]) -> Self {
        let payload: usize = rows.iter().map(RowBytes::len).sum();
        Self::with_capacity(payload + rows.len() * RENAME_SLACK_PER_ROW)
    }

    fn begin_field(&mut self, name: &str) {
        if !self.first_field {
            self.out.push(b',');
        }
        self.first_field = false;
        self.out.push(b'"');
        self.out.extend_from_slice(name.as_bytes());
        self.out.extend_from_slice(b"\":");
    }

    /// Write a list field: `"name":[row,row,...]`.
    ///
    /// An empty row set produces the framed empty array.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::RowDecodeError`] if any row is not valid JSON;
    /// the buffer is abandoned by the caller in that case.
    pub fn write_list_field(
        &mut self,
        name: &str,
        typename: Option<&str>,
        rows: Vec<RowBytes>,
    ) -> Result<()> {
        self.begin_field(name);
        self.out.push(b'[');
        for (i, row) in rows.into_iter().enumerate() {
            if i > 0 {
                self.out.push(b',');
            }
            append_transformed(&mut self.out, row.as_bytes(), typename, i)?;
        }
        self.out.push(b']');
        Ok(())
    }

    /// Write a single-object field: `"name":{...}` or `"name":null`.
    pub fn write_single_field(
        &mut self,
        name: &str,
        typename: Option<&str>,
        row: Option<RowBytes>,
    ) -> Result<()> {
        self.begin_field(name);
        match row {
            None => self.out.extend_from_slice(b"null"),
            Some(row) => append_transformed(&mut self.out, row.as_bytes(), typename, 0)?,
        }
        Ok(())
    }

    /// Write the `_entities` field: positions resolve to a row or `null`,
    /// in representation order. Each position carries its own typename.
    pub fn write_entities_field(&mut self, entities: Vec<(Option<RowBytes>, String)>) -> Result<()> {
        self.begin_field("_entities");
        self.out.push(b'[');
        for (i, (row, typename)) in entities.into_iter().enumerate() {
            if i > 0 {
                self.out.push(b',');
            }
            match row {
                None => self.out.extend_from_slice(b"null"),
                Some(row) if row.is_null() => self.out.extend_from_slice(b"null"),
                Some(row) => append_transformed(&mut self.out, row.as_bytes(), Some(&typename), i)?,
            }
        }
        self.out.push(b']');
        Ok(())
    }

    /// Write a field from an in-process JSON value (`__typename`, computed
    /// scalars). Not a row path; rows go through the transforming writers.
    pub fn write_value_field(&mut self, name: &str, value: &serde_json::Value) {
        self.begin_field(name);
        let bytes = serde_json::to_vec(value).expect("JSON values serialize infallibly");
        self.out.extend_from_slice(&bytes);
    }

    /// Attach a GraphQL error entry to the response.
    pub fn push_error(&mut self, error: GraphQLError) {
        self.errors.push(error);
    }

    /// Close the envelope; append `errors` and `extensions` when present.
    #[must_use]
    pub fn finish(self, extensions: Option<serde_json::Value>) -> ResponseBytes {
        let mut out = self.out;
        out.extend_from_slice(b"}");

        if !self.errors.is_empty() {
            out.extend_from_slice(b",\"errors\":");
            // GraphQLError is a plain serde struct; serialization cannot fail.
            let errors =
                serde_json::to_vec(&self.errors).expect("error entries serialize infallibly");
            out.extend_from_slice(&errors);
        }
        if let Some(extensions) = extensions {
            out.extend_from_slice(b",\"extensions\":");
            let ext = serde_json::to_vec(&extensions).expect("extensions serialize infallibly");
            out.extend_from_slice(&ext);
        }
        out.push(b'}');
        ResponseBytes(out)
    }
}

/// Build `{"data":{<field>:[...]}}` for a list of rows.
pub fn build_list_response(
    field: &str,
    typename: Option<&str>,
    rows: Vec<RowBytes>,
) -> Result<ResponseBytes> {
    let mut writer = ResponseWriter::sized_for(&rows);
    writer.write_list_field(field, typename, rows)?;
    Ok(writer.finish(None))
}

/// Build `{"data":{<field>:{...}}}` or the framed null response.
pub fn build_single_response(
    field: &str,
    typename: Option<&str>,
    row: Option<RowBytes>,
) -> Result<ResponseBytes> {
    let capacity = row.as_ref().map_or(0, RowBytes::len) + RENAME_SLACK_PER_ROW;
    let mut writer = ResponseWriter::with_capacity(capacity);
    writer.write_single_field(field, typename, row)?;
    Ok(writer.finish(None))
}

// ============================================================================
// Row transformation
// ============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Frame {
    Object,
    Array,
}

/// Copy one row's JSON into `out`, transforming as it goes:
/// - `"__typename":"<typename>"` injected right after the row root's `{`;
/// - object keys re-cased snake → camel at every depth;
/// - whitespace outside strings dropped;
/// - structure validated (balanced containers, sane literals).
fn append_transformed(
    out: &mut Vec<u8>,
    row: &[u8],
    typename: Option<&str>,
    row_index: usize,
) -> Result<()> {
    let decode_err = |cause: &str| -> fraiseql_error::FraiseQLError {
        DataError::RowDecodeError {
            row_index,
            cause: cause.to_string(),
        }
        .into()
    };

    let mut stack: Vec<Frame> = Vec::with_capacity(8);
    let mut expect_key = false;
    let mut produced_value = false;
    let mut i = 0;

    while i < row.len() {
        let b = row[i];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
            },
            b'{' => {
                out.push(b'{');
                stack.push(Frame::Object);
                produced_value = true;

                // Inject the declared typename at the row root.
                if stack.len() == 1 {
                    if let Some(typename) = typename {
                        out.extend_from_slice(b"\"__typename\":\"");
                        out.extend_from_slice(typename.as_bytes());
                        out.push(b'"');
                        // Comma only if the object has members.
                        let mut j = i + 1;
                        while j < row.len() && row[j].is_ascii_whitespace() {
                            j += 1;
                        }
                        if j < row.len() && row[j] != b'}' {
                            out.push(b',');
                        }
                    }
                }
                expect_key = true;
                i += 1;
            },
            b'}' => {
                if stack.pop() != Some(Frame::Object) {
                    return Err(decode_err("unbalanced '}'"));
                }
                out.push(b'}');
                expect_key = false;
                i += 1;
            },
            b'[' => {
                out.push(b'[');
                stack.push(Frame::Array);
                produced_value = true;
                expect_key = false;
                i += 1;
            },
            b']' => {
                if stack.pop() != Some(Frame::Array) {
                    return Err(decode_err("unbalanced ']'"));
                }
                out.push(b']');
                i += 1;
            },
            b':' => {
                if stack.last() != Some(&Frame::Object) {
                    return Err(decode_err("':' outside object"));
                }
                out.push(b':');
                expect_key = false;
                i += 1;
            },
            b',' => {
                if stack.is_empty() {
                    return Err(decode_err("',' outside container"));
                }
                out.push(b',');
                expect_key = stack.last() == Some(&Frame::Object);
                i += 1;
            },
            b'"' => {
                let end = scan_string(row, i).ok_or_else(|| decode_err("unterminated string"))?;
                let content = &row[i + 1..end];
                if expect_key {
                    out.push(b'"');
                    if content.contains(&b'\\') {
                        // Escaped keys pass through untouched; re-casing an
                        // escape sequence could corrupt it.
                        out.extend_from_slice(content);
                    } else {
                        camelize_into(content, out);
                    }
                    out.push(b'"');
                    expect_key = false;
                } else {
                    out.push(b'"');
                    out.extend_from_slice(content);
                    out.push(b'"');
                }
                produced_value = true;
                i = end + 1;
            },
            _ => {
                let end = scan_literal(row, i).ok_or_else(|| decode_err("invalid literal"))?;
                out.extend_from_slice(&row[i..end]);
                produced_value = true;
                i = end;
            },
        }
    }

    if !stack.is_empty() {
        return Err(decode_err("unterminated container"));
    }
    if !produced_value {
        return Err(decode_err("empty row"));
    }
    Ok(())
}

/// Find the closing quote of the string starting at `start` (which must be
/// a `"`), honoring escapes. Returns the index of the closing quote.
fn scan_string(row: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < row.len() {
        match row[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Scan a number / `true` / `false` / `null` literal starting at `start`.
/// Returns the exclusive end index, or `None` if the token is garbage.
fn scan_literal(row: &[u8], start: usize) -> Option<usize> {
    let mut end = start;
    while end < row.len()
        && matches!(row[end],
            b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'
            | b'a'..=b'z')
    {
        end += 1;
    }
    if end == start {
        return None;
    }
    let token = &row[start..end];
    let valid = matches!(token, b"true" | b"false" | b"null")
        || token
            .iter()
            .all(|b| matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'));
    if valid {
        Some(end)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(s: &str) -> RowBytes {
        RowBytes::from(s)
    }

    #[test]
    fn test_list_response_exact_bytes() {
        let rows = vec![
            row(r#"{"id": "u1", "first_name": "Alice"}"#),
            row(r#"{"id": "u2", "first_name": "Bob"}"#),
        ];
        let response = build_list_response("users", Some("User"), rows).expect("builds");
        assert_eq!(
            response.as_str(),
            r#"{"data":{"users":[{"__typename":"User","id":"u1","firstName":"Alice"},{"__typename":"User","id":"u2","firstName":"Bob"}]}}"#
        );
    }

    #[test]
    fn test_empty_list_framed() {
        let response = build_list_response("users", Some("User"), Vec::new()).expect("builds");
        assert_eq!(response.as_str(), r#"{"data":{"users":[]}}"#);
    }

    #[test]
    fn test_null_single_framed() {
        let response = build_single_response("user", Some("User"), None).expect("builds");
        assert_eq!(response.as_str(), r#"{"data":{"user":null}}"#);
    }

    #[test]
    fn test_nested_objects_recursed() {
        let rows = vec![row(
            r#"{"id": "u1", "home_address": {"street_name": "Rue de la Paix", "zip_code": "75001"}, "tags": ["a_b", "c_d"]}"#,
        )];
        let response = build_list_response("users", Some("User"), rows).expect("builds");
        let text = response.as_str();
        // Nested keys re-cased; string VALUES untouched.
        assert!(text.contains(r#""homeAddress":{"streetName":"Rue de la Paix","zipCode":"75001"}"#));
        assert!(text.contains(r#""tags":["a_b","c_d"]"#));
    }

    #[test]
    fn test_typename_on_empty_object() {
        let response =
            build_single_response("user", Some("User"), Some(row("{}"))).expect("builds");
        assert_eq!(response.as_str(), r#"{"data":{"user":{"__typename":"User"}}}"#);
    }

    #[test]
    fn test_escaped_string_values_pass_through() {
        let rows = vec![row(r#"{"note": "line1\nline2 \"quoted\""}"#)];
        let response = build_list_response("notes", None, rows).expect("builds");
        assert!(response.as_str().contains(r#""note":"line1\nline2 \"quoted\"""#));
    }

    #[test]
    fn test_malformed_row_is_decode_error() {
        let rows = vec![row(r#"{"id": "u1""#)];
        let err = build_list_response("users", Some("User"), rows).expect_err("rejects");
        assert!(matches!(
            err,
            fraiseql_error::FraiseQLError::Data(DataError::RowDecodeError { row_index: 0, .. })
        ));
    }

    #[test]
    fn test_malformed_row_index_reported() {
        let rows = vec![row("{}"), row("not json at all !!")];
        let err = build_list_response("users", None, rows).expect_err("rejects");
        assert!(matches!(
            err,
            fraiseql_error::FraiseQLError::Data(DataError::RowDecodeError { row_index: 1, .. })
        ));
    }

    #[test]
    fn test_entities_positions_and_nulls() {
        let mut writer = ResponseWriter::with_capacity(128);
        writer
            .write_entities_field(vec![
                (Some(row(r#"{"id": "u1"}"#)), "User".to_string()),
                (None, "User".to_string()),
                (Some(row("null")), "User".to_string()),
            ])
            .expect("writes");
        let response = writer.finish(None);
        assert_eq!(
            response.as_str(),
            r#"{"data":{"_entities":[{"__typename":"User","id":"u1"},null,null]}}"#
        );
    }

    #[test]
    fn test_errors_appended_after_data() {
        let mut writer = ResponseWriter::with_capacity(64);
        writer
            .write_single_field("user", Some("User"), None)
            .expect("writes");
        writer.push_error(GraphQLError {
            message:    "boom".to_string(),
            path:       vec!["user".into()],
            extensions: fraiseql_error::graphql::ErrorExtensions {
                code: "TIMEOUT".to_string(),
            },
        });
        let response = writer.finish(None);
        let parsed: serde_json::Value =
            serde_json::from_slice(response.as_slice()).expect("valid JSON");
        assert_eq!(parsed["errors"][0]["extensions"]["code"], "TIMEOUT");
        assert_eq!(parsed["data"]["user"], serde_json::Value::Null);
    }

    #[test]
    fn test_extensions_appended() {
        let writer = ResponseWriter::with_capacity(16);
        let response = writer.finish(Some(serde_json::json!({"pageInfo": {"hasNextPage": false}})));
        let parsed: serde_json::Value =
            serde_json::from_slice(response.as_slice()).expect("valid JSON");
        assert_eq!(parsed["extensions"]["pageInfo"]["hasNextPage"], false);
    }

    #[test]
    fn test_multiple_fields_in_one_response() {
        let mut writer = ResponseWriter::with_capacity(128);
        writer
            .write_list_field("users", Some("User"), vec![row(r#"{"id": "u1"}"#)])
            .expect("writes");
        writer
            .write_single_field("stats", None, Some(row(r#"{"total_count": 1}"#)))
            .expect("writes");
        let response = writer.finish(None);
        assert_eq!(
            response.as_str(),
            r#"{"data":{"users":[{"__typename":"User","id":"u1"}],"stats":{"totalCount":1}}}"#
        );
    }

    #[test]
    fn test_large_row_set() {
        let rows: Vec<RowBytes> = (0..100_000)
            .map(|i| RowBytes::new(format!(r#"{{"id": "u{i}", "row_number": {i}}}"#)))
            .collect();
        let response = build_list_response("users", Some("User"), rows).expect("builds");
        let parsed: serde_json::Value =
            serde_json::from_slice(response.as_slice()).expect("valid JSON");
        let array = parsed["data"]["users"].as_array().expect("array");
        assert_eq!(array.len(), 100_000);
        assert_eq!(array[99_999]["rowNumber"], 99_999);
        assert_eq!(array[0]["__typename"], "User");
    }

    #[test]
    fn test_numbers_and_literals_copied() {
        let rows = vec![row(
            r#"{"int_val": -42, "float_val": 1.5e-3, "bool_val": true, "null_val": null}"#,
        )];
        let response = build_list_response("xs", None, rows).expect("builds");
        assert_eq!(
            response.as_str(),
            r#"{"data":{"xs":[{"intVal":-42,"floatVal":1.5e-3,"boolVal":true,"nullVal":null}]}}"#
        );
    }
}
