//! Data-path errors.

/// Errors raised on the response hot path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// A database row was not valid JSON text.
    ///
    /// The offending row content is deliberately NOT carried here; whether it
    /// reaches logs is a policy decision made at the logging site.
    #[error("row {row_index} is not valid JSON: {cause}")]
    RowDecodeError { row_index: usize, cause: String },
}

impl DataError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RowDecodeError { .. } => "ROW_DECODE_ERROR",
        }
    }
}
