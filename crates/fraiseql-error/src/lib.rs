//! Error taxonomy for FraiseQL.
//!
//! Every crate in the workspace reports failures through [`FraiseQLError`],
//! a sealed set of category enums:
//!
//! ```text
//! FraiseQLError
//! ├── Compile        - schema compilation failures (abort the compile)
//! ├── Execution      - SQL execution, timeouts, cancellation
//! ├── Federation     - entity resolution across subgraphs
//! ├── Protocol       - malformed requests, unknown persisted hashes
//! ├── Authorization  - permission and rate-limit denials
//! ├── Data           - row decoding on the hot path
//! ├── Configuration  - invalid or missing configuration
//! └── Internal       - unexpected internal errors (should be rare)
//! ```
//!
//! Compile errors surface as CLI diagnostics with suggestion sets; runtime
//! errors become GraphQL `errors` entries with a `path` and a stable
//! machine-readable `extensions.code` (see [`graphql::GraphQLError`]).

// Error variants and fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

mod authorization;
mod compile;
mod data;
mod execution;
mod federation;
pub mod graphql;
mod protocol;
mod sanitize;

pub use authorization::AuthorizationError;
pub use compile::CompileError;
pub use data::DataError;
pub use execution::ExecutionError;
pub use federation::FederationError;
pub use graphql::{GraphQLError, PathSegment};
pub use protocol::ProtocolError;
pub use sanitize::SanitizationLevel;

/// Result type alias for FraiseQL operations.
pub type Result<T> = std::result::Result<T, FraiseQLError>;

/// Top-level error wrapping all category errors.
#[derive(Debug, thiserror::Error)]
pub enum FraiseQLError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Federation(#[from] FederationError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source:  Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FraiseQLError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source:  None,
        }
    }

    /// Stable machine-readable code surfaced as `extensions.code`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Compile(e) => e.error_code(),
            Self::Execution(e) => e.error_code(),
            Self::Federation(e) => e.error_code(),
            Self::Protocol(e) => e.error_code(),
            Self::Authorization(e) => e.error_code(),
            Self::Data(e) => e.error_code(),
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP status code equivalent for transport layers.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Compile(_) | Self::Configuration { .. } | Self::Internal { .. } => 500,
            Self::Execution(e) => match e {
                ExecutionError::TimeoutError { .. } | ExecutionError::CancelledError { .. } => 408,
                ExecutionError::SqlFailure { .. } => 500,
            },
            Self::Federation(_) => 502,
            Self::Protocol(e) => match e {
                ProtocolError::UnsupportedAccept { .. } => 406,
                ProtocolError::MalformedQuery { .. } | ProtocolError::UnknownPersistedHash { .. } => 400,
            },
            Self::Authorization(e) => match e {
                AuthorizationError::PermissionDenied { .. } => 403,
                AuthorizationError::RateLimited { .. } => 429,
            },
            Self::Data(_) => 500,
        }
    }

    /// Whether retrying the operation may succeed.
    ///
    /// Only idempotent operations (read queries, `_entities` batches) consult
    /// this; mutations never auto-retry regardless of the answer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Execution(ExecutionError::TimeoutError { .. })
                | Self::Federation(FederationError::SubgraphUnreachable { .. })
        )
    }

    /// Render the user-facing message at the configured sanitization level.
    ///
    /// `Internal` returns the full display; `User` strips causes from server
    /// errors; `Public` collapses all server errors to a generic message.
    #[must_use]
    pub fn sanitized_message(&self, level: SanitizationLevel) -> String {
        sanitize::sanitize(self, level)
    }

    /// Whether this error originates from client input (4xx equivalent).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Authorization(_))
    }
}

impl From<serde_json::Error> for FraiseQLError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON error: {e}"),
            source:  Some(Box::new(e)),
        }
    }
}

impl From<std::io::Error> for FraiseQLError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {e}"),
            source:  Some(Box::new(e)),
        }
    }
}
