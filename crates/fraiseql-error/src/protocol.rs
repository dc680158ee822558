//! Request protocol errors.

/// Errors raised before any execution starts: the request itself is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The query string failed to parse or bind against the schema.
    #[error("malformed query: {message}")]
    MalformedQuery { message: String },

    /// A persisted-query hash was supplied without a query body and the
    /// cache has no entry for it. Clients respond by retrying with the
    /// full query text.
    #[error("unknown persisted query hash '{hash}'")]
    UnknownPersistedHash { hash: String },

    /// The Accept header requests a plane the server does not serve.
    #[error("unsupported Accept header '{accept}'")]
    UnsupportedAccept { accept: String },
}

impl ProtocolError {
    /// Stable machine-readable code.
    ///
    /// `PERSISTED_QUERY_NOT_FOUND` matches the well-known APQ protocol code
    /// clients key their retry behavior on.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedQuery { .. } => "GRAPHQL_PARSE_FAILED",
            Self::UnknownPersistedHash { .. } => "PERSISTED_QUERY_NOT_FOUND",
            Self::UnsupportedAccept { .. } => "UNSUPPORTED_ACCEPT",
        }
    }

    /// Create a malformed-query error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedQuery {
            message: message.into(),
        }
    }
}
