//! Authorization errors.

/// Errors raised by the authorization layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// The caller lacks permission for the operation or field.
    #[error("permission denied{}", .field.as_ref().map(|f| format!(" for field '{f}'")).unwrap_or_default())]
    PermissionDenied {
        /// Field the denial applies to, when field-scoped.
        field: Option<String>,
    },

    /// The caller exceeded a configured rate-limit threshold.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Suggested wait before retrying, if the limiter computed one.
        retry_after_ms: Option<u64>,
    },
}

impl AuthorizationError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }
}
