//! Delta plane: CDC event-stream projection.
//!
//! Events are sourced from the durable `tb_entity_change_log` table and
//! shaped into a Debezium-compatible envelope. Sequence numbers are strictly
//! monotonic per tenant; readers poll from a sequence floor and delivery
//! adapters (SSE, webhook, peer queue) receive an ordered byte stream.

use std::sync::Arc;

use fraiseql_error::{FraiseQLError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::DatabaseAdapter;
use crate::runtime::RequestContext;

/// Debezium-style operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdcOp {
    /// Create.
    #[serde(rename = "c")]
    Create,
    /// Read (snapshot).
    #[serde(rename = "r")]
    Read,
    /// Update.
    #[serde(rename = "u")]
    Update,
    /// Delete.
    #[serde(rename = "d")]
    Delete,
}

/// Event source descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdcSource {
    /// Originating table.
    pub table: String,
}

/// One change event in the Debezium-compatible envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdcEvent {
    /// Operation code (`c` / `r` / `u` / `d`).
    pub op: CdcOp,

    /// Row image before the change (updates and deletes).
    pub before: Option<Value>,

    /// Row image after the change (creates, reads and updates).
    pub after: Option<Value>,

    /// Source descriptor.
    pub source: CdcSource,

    /// Event timestamp, epoch milliseconds.
    pub ts_ms: i64,

    /// Strictly monotonic per-tenant sequence number.
    pub sequence_number: i64,
}

impl CdcEvent {
    /// Serialize for an SSE `data:` line or webhook body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Poll-based reader over the change log table.
///
/// The WHERE predicate over the stream is fixed at compile time (it comes
/// from the subscription declaration); only the sequence floor and tenant
/// vary per poll.
pub struct ChangeLogReader {
    adapter:       Arc<dyn DatabaseAdapter>,
    /// Compile-time predicate over the event row, or `TRUE`.
    predicate_sql: String,
    batch_size:    i64,
}

impl ChangeLogReader {
    /// Create a reader with a pre-compiled predicate.
    #[must_use]
    pub fn new(adapter: Arc<dyn DatabaseAdapter>, predicate_sql: Option<String>) -> Self {
        Self {
            adapter,
            predicate_sql: predicate_sql.unwrap_or_else(|| "TRUE".to_string()),
            batch_size: 256,
        }
    }

    /// Fetch events after `after_sequence` for a tenant, in sequence order.
    ///
    /// # Errors
    ///
    /// Propagates database failures; also fails on any monotonicity
    /// violation, which indicates change-log corruption.
    pub async fn poll(
        &self,
        tenant_id: &str,
        after_sequence: i64,
        ctx: &RequestContext,
    ) -> Result<Vec<CdcEvent>> {
        let sql = format!(
            "SELECT json_build_object(\
                'op', \"op\", \
                'before', \"before\", \
                'after', \"after\", \
                'source', json_build_object('table', \"source_table\"), \
                'ts_ms', \"ts_ms\", \
                'sequence_number', \"sequence_number\"\
             )::text \
             FROM \"tb_entity_change_log\" \
             WHERE \"tenant_id\" = $1 AND \"sequence_number\" > $2 AND ({predicate}) \
             ORDER BY \"sequence_number\" ASC LIMIT {limit}",
            predicate = self.predicate_sql,
            limit = self.batch_size,
        );

        let rows = self
            .adapter
            .query_json_rows(
                &sql,
                &[Value::String(tenant_id.to_string()), Value::from(after_sequence)],
                &ctx.cancel,
            )
            .await?;

        let mut events = Vec::with_capacity(rows.len());
        let mut last_sequence = after_sequence;
        for row in rows {
            let event: CdcEvent = serde_json::from_str(&row.into_string())
                .map_err(|e| FraiseQLError::internal(format!("malformed change-log row: {e}")))?;
            if event.sequence_number <= last_sequence {
                return Err(FraiseQLError::internal(format!(
                    "change log sequence regression: {} after {last_sequence}",
                    event.sequence_number
                )));
            }
            last_sequence = event.sequence_number;
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let event = CdcEvent {
            op:              CdcOp::Update,
            before:          Some(json!({"id": "u1", "email": "old@x.y"})),
            after:           Some(json!({"id": "u1", "email": "new@x.y"})),
            source:          CdcSource {
                table: "tb_user".to_string(),
            },
            ts_ms:           1_722_500_000_000,
            sequence_number: 42,
        };
        let value: Value = serde_json::from_str(&event.to_json().expect("serializes"))
            .expect("valid JSON");
        assert_eq!(value["op"], "u");
        assert_eq!(value["source"]["table"], "tb_user");
        assert_eq!(value["sequence_number"], 42);
        assert_eq!(value["before"]["email"], "old@x.y");
    }

    #[test]
    fn test_op_codes_roundtrip() {
        for (op, code) in [
            (CdcOp::Create, "\"c\""),
            (CdcOp::Read, "\"r\""),
            (CdcOp::Update, "\"u\""),
            (CdcOp::Delete, "\"d\""),
        ] {
            assert_eq!(serde_json::to_string(&op).expect("serializes"), code);
        }
    }
}
