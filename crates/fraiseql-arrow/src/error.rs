//! Arrow-plane errors.

/// Failures while building or encoding record batches.
#[derive(Debug, thiserror::Error)]
pub enum ArrowPlaneError {
    /// A row value does not fit the declared column type.
    #[error("row {row} column '{column}': {message}")]
    ValueMismatch {
        row:     usize,
        column:  String,
        message: String,
    },

    /// The arrow kernel rejected the batch.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl From<ArrowPlaneError> for fraiseql_error::FraiseQLError {
    fn from(e: ArrowPlaneError) -> Self {
        Self::internal(e.to_string())
    }
}
