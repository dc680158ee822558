//! Schema compilation errors.
//!
//! Every variant aborts the compile; the CLI prints the display message and
//! exits non-zero. `UnsupportedOperator` carries the target's suggestion set
//! so the diagnostic can propose alternatives.

/// Errors raised while compiling a schema IR against a capability manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A declared filter needs an operator the target database cannot render.
    #[error(
        "operator '{operator}' is not supported for {scalar_family} on target '{target}' \
         (available: {})", .suggestions.join(", ")
    )]
    UnsupportedOperator {
        target:        String,
        scalar_family: String,
        operator:      String,
        /// Operators the target does support for this scalar family.
        suggestions:   Vec<String>,
    },

    /// A field, query, or key references a type the IR does not define.
    #[error("unknown type '{type_name}'")]
    UnknownType { type_name: String },

    /// Federation declarations are inconsistent.
    #[error("invalid federation declaration on '{type_name}': {message}")]
    InvalidFederation { type_name: String, message: String },

    /// An Arrow projection declares a type with no Arrow representation.
    #[error("field '{field}' in batch '{batch}' has no Arrow representation: {message}")]
    UnrepresentableArrowType {
        batch:   String,
        field:   String,
        message: String,
    },

    /// A bound type has neither a local view nor a federation strategy.
    #[error("type '{type_name}' has no view binding and no federation strategy")]
    ViewBindingMissing { type_name: String },
}

impl CompileError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::UnknownType { .. } => "UNKNOWN_TYPE",
            Self::InvalidFederation { .. } => "INVALID_FEDERATION",
            Self::UnrepresentableArrowType { .. } => "UNREPRESENTABLE_ARROW_TYPE",
            Self::ViewBindingMissing { .. } => "VIEW_BINDING_MISSING",
        }
    }
}
