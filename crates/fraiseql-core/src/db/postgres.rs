//! PostgreSQL adapter over deadpool pooling.
//!
//! Queries project JSON text (`jsonb::text`), so the adapter never parses
//! row payloads; it hands the driver's strings straight to the caller.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use fraiseql_error::{ExecutionError, FraiseQLError, Result};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tokio_util::sync::CancellationToken;

use super::{DatabaseAdapter, RowBytes};

/// Pooled PostgreSQL adapter.
pub struct PostgresAdapter {
    pool:            Pool,
    acquire_timeout: Duration,
    query_timeout:   Duration,
}

impl PostgresAdapter {
    /// Build an adapter from a connection URL.
    pub fn connect(
        url: &str,
        max_connections: usize,
        acquire_timeout: Duration,
        query_timeout: Duration,
    ) -> Result<Self> {
        let pg_config: tokio_postgres::Config = url
            .parse()
            .map_err(|e| FraiseQLError::config(format!("invalid database URL: {e}")))?;
        let manager = Manager::from_config(pg_config, NoTls, ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| FraiseQLError::config(format!("pool build failed: {e}")))?;
        Ok(Self {
            pool,
            acquire_timeout,
            query_timeout,
        })
    }

    /// Pool status (size, available), for leak assertions and metrics.
    #[must_use]
    pub fn pool_status(&self) -> (usize, usize) {
        let status = self.pool.status();
        (status.size, status.available)
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        match tokio::time::timeout(self.acquire_timeout, self.pool.get()).await {
            Err(_) => Err(ExecutionError::timeout(
                "pool-acquire",
                u64::try_from(self.acquire_timeout.as_millis()).unwrap_or(u64::MAX),
            )
            .into()),
            Ok(Err(e)) => Err(FraiseQLError::internal(format!("pool acquire failed: {e}"))),
            Ok(Ok(client)) => Ok(client),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    async fn query_json_rows(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<Vec<RowBytes>> {
        let client = self.client().await?;
        let owned = to_sql_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            owned.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let cancel_token = client.cancel_token();
        let query = tokio::time::timeout(self.query_timeout, client.query(sql, &refs));

        tokio::select! {
            () = cancel.cancelled() => {
                // Cooperative cancellation: tell the server to stop, then
                // drop the in-flight future (the connection recycles).
                tokio::spawn(async move {
                    let _ = cancel_token.cancel_query(NoTls).await;
                });
                Err(ExecutionError::cancelled("request cancelled").into())
            },
            result = query => match result {
                Err(_) => Err(ExecutionError::timeout(
                    "db-query",
                    u64::try_from(self.query_timeout.as_millis()).unwrap_or(u64::MAX),
                )
                .into()),
                Ok(Err(e)) => Err(sql_failure(&e)),
                Ok(Ok(rows)) => Ok(rows
                    .into_iter()
                    .map(|row| RowBytes::new(row.get::<_, String>(0)))
                    .collect()),
            },
        }
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let client = self.client().await?;
        let owned = to_sql_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            owned.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let cancel_token = client.cancel_token();
        let execute = tokio::time::timeout(self.query_timeout, client.execute(sql, &refs));

        tokio::select! {
            () = cancel.cancelled() => {
                tokio::spawn(async move {
                    let _ = cancel_token.cancel_query(NoTls).await;
                });
                Err(ExecutionError::cancelled("request cancelled").into())
            },
            result = execute => match result {
                Err(_) => Err(ExecutionError::timeout(
                    "db-query",
                    u64::try_from(self.query_timeout.as_millis()).unwrap_or(u64::MAX),
                )
                .into()),
                Ok(Err(e)) => Err(sql_failure(&e)),
                Ok(Ok(count)) => Ok(count),
            },
        }
    }
}

fn sql_failure(e: &tokio_postgres::Error) -> FraiseQLError {
    ExecutionError::SqlFailure {
        message:   e.to_string(),
        sql_state: e.code().map(|c| c.code().to_string()),
    }
    .into()
}

/// Convert JSON parameter values into driver bindings.
///
/// Scalars bind as their native types; arrays of strings bind as `text[]`
/// (for `= ANY($n)`); everything else binds as JSONB.
fn to_sql_params(params: &[serde_json::Value]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    params.iter().map(to_sql_param).collect()
}

fn to_sql_param(value: &serde_json::Value) -> Box<dyn ToSql + Sync + Send> {
    use serde_json::Value;

    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else {
                Box::new(n.as_f64().unwrap_or(f64::NAN))
            }
        },
        Value::String(s) => Box::new(s.clone()),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect();
            Box::new(strings)
        },
        Value::Array(items) if items.iter().all(Value::is_i64) => {
            let ints: Vec<i64> = items.iter().filter_map(Value::as_i64).collect();
            Box::new(ints)
        },
        other => Box::new(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_conversion_shapes() {
        // Exercise every branch; the boxes only need to construct.
        let params = to_sql_params(&[
            json!(null),
            json!(true),
            json!(42),
            json!(1.5),
            json!("alice"),
            json!(["a", "b"]),
            json!([1, 2, 3]),
            json!({"nested": "object"}),
        ]);
        assert_eq!(params.len(), 8);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = PostgresAdapter::connect(
            "not a url",
            4,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }
}
