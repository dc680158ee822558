//! Arrow-plane execution.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use fraiseql_core::db::DatabaseAdapter;
use fraiseql_core::runtime::RequestContext;
use fraiseql_core::schema::CompiledArrowProjection;
use fraiseql_error::{FraiseQLError, Result};
use serde_json::Value;

use crate::batch::rows_to_record_batch;
use crate::ipc::{encode_file, encode_stream};

/// Executes compiled Arrow projections: one pre-rendered SELECT per batch,
/// JSON rows converted into typed record batches, encoded as IPC.
pub struct ArrowPlaneExecutor {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl ArrowPlaneExecutor {
    /// Build an executor over the local adapter.
    #[must_use]
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    /// Run every batch of a projection, in declaration order.
    pub async fn execute(
        &self,
        projection: &CompiledArrowProjection,
        ctx: &RequestContext,
    ) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::with_capacity(projection.batches.len());
        for declared in &projection.batches {
            let rows = self
                .adapter
                .query_json_rows(&declared.select_sql, &[], &ctx.cancel)
                .await?;

            let mut parsed = Vec::with_capacity(rows.len());
            for (i, row) in rows.into_iter().enumerate() {
                let value: Value = serde_json::from_str(&row.into_string()).map_err(|e| {
                    FraiseQLError::internal(format!(
                        "batch '{}' row {i} is not valid JSON: {e}",
                        declared.name
                    ))
                })?;
                parsed.push(value);
            }

            let record = rows_to_record_batch(declared, &parsed)?;
            tracing::debug!(
                target: "fraiseql::arrow",
                projection = %projection.name,
                batch = %declared.name,
                rows = record.num_rows(),
                "arrow batch built"
            );
            batches.push(record);
        }
        Ok(batches)
    }

    /// Execute and encode as an IPC stream body.
    pub async fn execute_stream(
        &self,
        projection: &CompiledArrowProjection,
        ctx: &RequestContext,
    ) -> Result<Vec<u8>> {
        let batches = self.execute(projection, ctx).await?;
        encode_stream(&batches).map_err(Into::into)
    }

    /// Execute and encode as an IPC file body.
    pub async fn execute_file(
        &self,
        projection: &CompiledArrowProjection,
        ctx: &RequestContext,
    ) -> Result<Vec<u8>> {
        let batches = self.execute(projection, ctx).await?;
        encode_file(&batches).map_err(Into::into)
    }
}
