//! Error message sanitization.
//!
//! External error messages are sanitized per the configured level
//! (`FRAISEQL_ERROR_SANITIZATION=internal|user|public`); internal logs always
//! carry the full cause with trace id.

use serde::{Deserialize, Serialize};

use crate::FraiseQLError;

/// How much detail external error messages carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizationLevel {
    /// Full messages including causes. For trusted internal callers only.
    Internal,

    /// Client-caused errors keep their message; server errors lose causes.
    #[default]
    User,

    /// Server errors collapse to a generic message; client errors keep a
    /// short form.
    Public,
}

impl SanitizationLevel {
    /// Parse from the environment-variable spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" => Some(Self::Internal),
            "user" => Some(Self::User),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

/// Render the message for `err` at `level`.
pub(crate) fn sanitize(err: &FraiseQLError, level: SanitizationLevel) -> String {
    match level {
        SanitizationLevel::Internal => err.to_string(),
        SanitizationLevel::User => {
            if err.is_client_error() {
                err.to_string()
            } else {
                // Category is safe to reveal; the cause string is not.
                format!("{}: request failed", category_label(err))
            }
        },
        SanitizationLevel::Public => {
            if err.is_client_error() {
                err.to_string()
            } else {
                "internal server error".to_string()
            }
        },
    }
}

const fn category_label(err: &FraiseQLError) -> &'static str {
    match err {
        FraiseQLError::Compile(_) => "schema error",
        FraiseQLError::Execution(_) => "execution error",
        FraiseQLError::Federation(_) => "federation error",
        FraiseQLError::Protocol(_) => "protocol error",
        FraiseQLError::Authorization(_) => "authorization error",
        FraiseQLError::Data(_) => "data error",
        FraiseQLError::Configuration { .. } => "configuration error",
        FraiseQLError::Internal { .. } => "internal error",
    }
}
