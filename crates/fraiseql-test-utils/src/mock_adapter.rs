//! Programmable mock database adapter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fraiseql_core::db::{DatabaseAdapter, RowBytes};
use fraiseql_error::{ExecutionError, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// One canned response: any executed SQL containing `pattern` returns
/// `rows`.
struct CannedResponse {
    pattern: String,
    rows:    Vec<String>,
    /// One-shot responses are consumed by their first match, letting tests
    /// model successive pages from the same statement shape.
    once:    bool,
    used:    bool,
}

/// In-memory adapter for executor and federation tests.
///
/// - Responses are matched by SQL substring, first match wins.
/// - Every executed statement is recorded for assertions.
/// - An optional per-query delay makes cancellation observable.
/// - `open_connections` counts queries currently in flight; it must return
///   to zero on every exit path (the leak assertion of the cancellation
///   tests).
#[derive(Default)]
pub struct MockAdapter {
    responses:        Mutex<Vec<CannedResponse>>,
    executed:         Mutex<Vec<(String, Vec<serde_json::Value>)>>,
    delay:            Mutex<Option<Duration>>,
    open_connections: AtomicUsize,
}

impl MockAdapter {
    /// Create an adapter with no canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register rows for any SQL containing `pattern`.
    pub fn respond(&self, pattern: impl Into<String>, rows: Vec<&str>) {
        self.responses.lock().push(CannedResponse {
            pattern: pattern.into(),
            rows:    rows.into_iter().map(ToString::to_string).collect(),
            once:    false,
            used:    false,
        });
    }

    /// Register rows consumed by the first matching query only. Multiple
    /// one-shot registrations for the same pattern serve in order.
    pub fn respond_once(&self, pattern: impl Into<String>, rows: Vec<&str>) {
        self.responses.lock().push(CannedResponse {
            pattern: pattern.into(),
            rows:    rows.into_iter().map(ToString::to_string).collect(),
            once:    true,
            used:    false,
        });
    }

    /// Delay every query, so tests can cancel mid-flight.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// All executed statements with their parameters, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.executed.lock().clone()
    }

    /// Queries currently in flight. Zero when nothing leaks.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    fn rows_for(&self, sql: &str) -> Vec<String> {
        let mut responses = self.responses.lock();
        for response in responses.iter_mut() {
            if response.used || !sql.contains(&response.pattern) {
                continue;
            }
            if response.once {
                response.used = true;
            }
            return response.rows.clone();
        }
        Vec::new()
    }

    async fn run(&self, sql: &str, params: &[serde_json::Value], cancel: &CancellationToken) -> Result<Vec<String>> {
        self.executed.lock().push((sql.to_string(), params.to_vec()));
        self.open_connections.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::select! {
                () = cancel.cancelled() => {
                    self.open_connections.fetch_sub(1, Ordering::SeqCst);
                    return Err(ExecutionError::cancelled("request cancelled").into());
                },
                () = tokio::time::sleep(delay) => {},
            }
        }

        let rows = self.rows_for(sql);
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
        Ok(rows)
    }
}

#[async_trait]
impl DatabaseAdapter for MockAdapter {
    async fn query_json_rows(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<Vec<RowBytes>> {
        let rows = self.run(sql, params, cancel).await?;
        Ok(rows.into_iter().map(RowBytes::new).collect())
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[serde_json::Value],
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let rows = self.run(sql, params, cancel).await?;
        Ok(rows.len() as u64)
    }
}
