//! Database access layer.
//!
//! The executor talks to storage through [`DatabaseAdapter`], a narrow trait
//! returning rows as JSON text. The only bundled implementation is
//! PostgreSQL; other dialects participate at compile time (templates) and
//! bring their own adapter.

mod postgres;

pub use postgres::PostgresAdapter;

use async_trait::async_trait;
use fraiseql_error::Result;
use tokio_util::sync::CancellationToken;

/// Raw JSON text of a single database row.
///
/// Produced by an adapter, consumed exactly once by the response builder
/// (moves enforce the single pass). The `_entities` batch template returns
/// the literal string `null` for unmatched positions; [`RowBytes::is_null`]
/// detects that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBytes(String);

impl RowBytes {
    /// Wrap a row string returned by the database.
    #[must_use]
    pub fn new(row: String) -> Self {
        Self(row)
    }

    /// Raw bytes of the row JSON.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the row is the JSON literal `null` (an unmatched `_entities`
    /// position).
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == "null"
    }

    /// Consume into the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for RowBytes {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Narrow storage interface the executor and resolvers depend on.
///
/// Implementations must observe `cancel` at their suspension points:
/// cancelling a request cancels the in-flight query and returns the
/// connection to the pool.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Run a query returning one JSON text column; rows in database order.
    async fn query_json_rows(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<Vec<RowBytes>>;

    /// Run a statement, returning the affected row count.
    async fn execute(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Convenience: first row of a query, if any.
pub async fn query_json_row(
    adapter: &dyn DatabaseAdapter,
    sql: &str,
    params: &[serde_json::Value],
    cancel: &CancellationToken,
) -> Result<Option<RowBytes>> {
    let mut rows = adapter.query_json_rows(sql, params, cancel).await?;
    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(rows.swap_remove(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_bytes_null_detection() {
        assert!(RowBytes::from("null").is_null());
        assert!(!RowBytes::from("{}").is_null());
        assert!(!RowBytes::from("\"null\"").is_null());
    }
}
