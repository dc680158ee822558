//! Federation and entity-resolution errors.
//!
//! These map to per-position `null`s in the `_entities` result array; the
//! resolver attaches a `path` of `["_entities", index]` when shaping the
//! GraphQL error entry.

/// Errors raised while resolving `_entities` representations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FederationError {
    /// The subgraph could not be reached within the retry budget.
    #[error("subgraph '{subgraph}' unreachable after {attempts} attempt(s): {cause}")]
    SubgraphUnreachable {
        subgraph: String,
        attempts: u32,
        cause:    String,
    },

    /// No strategy can resolve entities of this type.
    #[error("no resolution strategy for entity type '{type_name}'")]
    EntityNotResolvable { type_name: String },

    /// A `@requires` dependency field was absent from the representation.
    #[error("representation for '{type_name}' is missing @requires field '{field}'")]
    RequiresDependencyMissing { type_name: String, field: String },
}

impl FederationError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SubgraphUnreachable { .. } => "SUBGRAPH_UNREACHABLE",
            Self::EntityNotResolvable { .. } => "ENTITY_NOT_RESOLVABLE",
            Self::RequiresDependencyMissing { .. } => "REQUIRES_DEPENDENCY_MISSING",
        }
    }
}
