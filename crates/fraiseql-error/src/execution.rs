//! Query execution errors.

/// Errors raised while executing a compiled query plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The database rejected or failed the query.
    #[error("SQL execution failed: {message}")]
    SqlFailure {
        message:   String,
        /// SQLSTATE code if the driver reported one (e.g. "23505").
        sql_state: Option<String>,
    },

    /// A phase deadline expired. `phase` is one of `pool-acquire`,
    /// `db-query`, `subgraph-http`, or `request`.
    #[error("{phase} timed out after {timeout_ms}ms")]
    TimeoutError { phase: String, timeout_ms: u64 },

    /// The request task was cancelled while the query was in flight.
    #[error("query cancelled: {reason}")]
    CancelledError { reason: String },
}

impl ExecutionError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SqlFailure { .. } => "SQL_FAILURE",
            Self::TimeoutError { .. } => "TIMEOUT",
            Self::CancelledError { .. } => "CANCELLED",
        }
    }

    /// Create a timeout for the given phase.
    #[must_use]
    pub fn timeout(phase: impl Into<String>, timeout_ms: u64) -> Self {
        Self::TimeoutError {
            phase: phase.into(),
            timeout_ms,
        }
    }

    /// Create a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::CancelledError {
            reason: reason.into(),
        }
    }
}
