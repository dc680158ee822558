//! Schema intermediate representation.
//!
//! The IR is the JSON document authoring layers (Python/TypeScript/Go
//! decorators) emit. The core consumes nothing else from them: the document
//! is plain data, deserialized once and handed to the compiler. There is no
//! reflection and no dynamic registration.
//!
//! # Document Structure
//!
//! ```text
//! SchemaIr
//! ├─ types: Vec<TypeDef>         (fields, view binding, federation, arrow)
//! ├─ queries: Vec<QueryOp>
//! └─ mutations: Vec<MutationOp>
//! ```

use fraiseql_error::{FraiseQLError, Result};
use serde::{Deserialize, Serialize};

use crate::capability::ScalarFamily;

/// Root schema IR document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaIr {
    /// Type definitions.
    pub types: Vec<TypeDef>,

    /// Root query operation descriptors.
    #[serde(default)]
    pub queries: Vec<QueryOp>,

    /// Root mutation operation descriptors.
    #[serde(default)]
    pub mutations: Vec<MutationOp>,
}

impl SchemaIr {
    /// Deserialize an IR document from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FraiseQLError::config(format!("invalid schema IR: {e}")))
    }

    /// Find a type definition by name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// One GraphQL object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type name (e.g. "User").
    pub name: String,

    /// Ordered field definitions.
    pub fields: Vec<FieldDef>,

    /// Local view binding, when this type resolves locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_source: Option<BoundSource>,

    /// Federation declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federation: Option<FederationDef>,

    /// Arrow-plane projections declared on this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrow_projections: Vec<ArrowProjectionDef>,

    /// Row- and field-level authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<AuthorizationDef>,

    /// Type description (from docstrings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One field of a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Storage-side field name (`snake_case`; the response builder re-cases
    /// it to camelCase on the way out).
    pub name: String,

    /// Semantic type.
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,

    /// Is the field nullable?
    #[serde(default)]
    pub nullable: bool,

    /// Default value (JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Bound column when it differs from the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Whether the field appears in the generated `WhereInputType`.
    #[serde(default = "default_true")]
    pub filterable: bool,

    /// Explicitly requested filter operators. Empty means "everything the
    /// target supports for this family"; a non-empty list is validated
    /// against the capability manifest and rejected on any miss.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl FieldDef {
    /// The JSONB key / column this field reads from.
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Semantic field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Built-in scalar.
    Scalar(ScalarType),
    /// Reference to another IR type (nested object in the JSONB payload).
    Object(String),
    /// List of a semantic type.
    List(Box<SemanticType>),
}

impl SemanticType {
    /// Scalar family for capability resolution, when the type is a scalar.
    #[must_use]
    pub fn family(&self) -> Option<ScalarFamily> {
        match self {
            Self::Scalar(s) => Some(s.family()),
            Self::Object(_) | Self::List(_) => None,
        }
    }

    /// Type name for reference resolution, when the type is an object.
    #[must_use]
    pub fn object_name(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            Self::List(inner) => inner.object_name(),
            Self::Scalar(_) => None,
        }
    }
}

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Id,
    String,
    Int,
    Float,
    Boolean,
    Uuid,
    DateTime,
    Date,
    Decimal,
    Json,
    Inet,
    Vector,
    Ltree,
}

impl ScalarType {
    /// Scalar family used for capability-manifest intersection.
    #[must_use]
    pub const fn family(self) -> ScalarFamily {
        match self {
            Self::Id | Self::String => ScalarFamily::String,
            Self::Int | Self::Float | Self::Decimal => ScalarFamily::Numeric,
            Self::Boolean => ScalarFamily::Boolean,
            Self::Uuid => ScalarFamily::Uuid,
            Self::DateTime | Self::Date => ScalarFamily::Temporal,
            Self::Json => ScalarFamily::Jsonb,
            Self::Inet => ScalarFamily::Network,
            Self::Vector => ScalarFamily::Vector,
            Self::Ltree => ScalarFamily::Ltree,
        }
    }
}

/// Local view binding: where rows for this type come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundSource {
    /// View name (`v_*` logical, `tv_*` table-backed).
    pub view: String,

    /// JSONB column holding the composed row payload.
    #[serde(default = "default_jsonb_column")]
    pub jsonb_column: String,

    /// Primary-key column(s) inside the payload; also the default keyset.
    pub primary_key: Vec<String>,
}

fn default_jsonb_column() -> String {
    "data".to_string()
}

/// Federation declarations for one type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FederationDef {
    /// `@key` sets; each inner vec is one ordered composite key.
    #[serde(default)]
    pub keys: Vec<Vec<String>>,

    /// `@extends` — the authoritative definition lives in another subgraph.
    #[serde(default)]
    pub extends: bool,

    /// `@external` fields (owned by the authoritative subgraph).
    #[serde(default)]
    pub external_fields: Vec<String>,

    /// `@shareable` fields.
    #[serde(default)]
    pub shareable_fields: Vec<String>,

    /// `@requires`: field → dependency fields that must be present in the
    /// representation before it can resolve.
    #[serde(default)]
    pub requires: Vec<RequiresDef>,

    /// `@provides`: field → fields this subgraph can produce locally,
    /// short-circuiting a subgraph fetch.
    #[serde(default)]
    pub provides: Vec<ProvidesDef>,

    /// Resolution strategy override. Defaults to `Local` for bound types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyDef>,
}

/// One `@requires` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiresDef {
    /// Field the requirement is attached to.
    pub field: String,
    /// Fields that must be present in the incoming representation.
    pub dependencies: Vec<String>,
}

/// One `@provides` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidesDef {
    /// Field the declaration is attached to.
    pub field: String,
    /// Fields this subgraph produces without fetching.
    pub provided: Vec<String>,
}

/// Per-type resolution strategy in the IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyDef {
    /// Resolve against the local view.
    Local,
    /// Resolve over a pooled connection to a peer database. No HTTP hop.
    PeerDatabase {
        /// Named connection descriptor resolved from runtime configuration.
        connection: String,
    },
    /// Resolve via a batched `_entities` call to a remote subgraph.
    HttpSubgraph {
        /// Subgraph GraphQL endpoint URL.
        url: String,
    },
}

/// One Arrow projection: an ordered set of typed, shallow batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowProjectionDef {
    /// Projection name (selected via the Arrow plane).
    pub name: String,

    /// Ordered batches. Batch order is response order.
    pub batches: Vec<ArrowBatchDef>,
}

/// One declared Arrow batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowBatchDef {
    /// Batch name (e.g. "orders", "items").
    pub name: String,

    /// Arrow-plane view the batch reads from (`va_*` / `ta_*`).
    pub view: String,

    /// Typed columns.
    pub columns: Vec<ArrowColumnDef>,
}

/// One column of an Arrow batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowColumnDef {
    /// Column name.
    pub name: String,

    /// Arrow type.
    #[serde(rename = "type")]
    pub arrow_type: ArrowTypeDef,

    /// Is the column nullable?
    #[serde(default)]
    pub nullable: bool,

    /// Foreign-key target as `"batch.column"`. Joinability metadata only;
    /// nothing is enforced referentially.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    /// Masking strategy applied before the column leaves the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskStrategy>,
}

/// Arrow column types the plane can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowTypeDef {
    Utf8,
    Int32,
    Int64,
    Float64,
    Boolean,
    Decimal128 {
        precision: u8,
        scale: i8,
    },
    TimestampMicros,
    Date32,
}

/// Column masking strategies for the Arrow plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Replace the value with a fixed redaction marker.
    Redact,
    /// Replace the value with its sha256 hex digest.
    Hash,
    /// Null the column out entirely.
    Null,
}

/// Row- and field-level authorization declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDef {
    /// Row-filter SQL template with `{param}` slots, ANDed into every query
    /// against this type (e.g. `data->>'tenant_id' = {param}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_filter: Option<String>,

    /// Request-context keys bound to the row filter's slots, in order.
    #[serde(default)]
    pub row_filter_binders: Vec<String>,

    /// Field-level permission descriptors.
    #[serde(default)]
    pub field_permissions: Vec<FieldPermission>,
}

/// Permission required to read one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPermission {
    /// Field name.
    pub field: String,
    /// Permission the request context must carry.
    pub permission: String,
}

/// Root query operation descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOp {
    /// GraphQL field name (e.g. "users").
    pub name: String,

    /// Return type name.
    pub return_type: String,

    /// Does the query return a list?
    #[serde(default)]
    pub returns_list: bool,

    /// Is a missing single result an error or a null?
    #[serde(default)]
    pub nullable: bool,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Root mutation operation descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationOp {
    /// GraphQL field name (e.g. "createUser").
    pub name: String,

    /// Return type name.
    pub return_type: String,

    /// Database operation backing the mutation.
    pub operation: MutationKind,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Database operation kinds a mutation can bind to.
///
/// Only types whose view is backed by mutable tables may declare
/// table-touching kinds; the validator enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
    /// Call a stored procedure taking the input object as JSONB.
    Function {
        /// Procedure name.
        name: String,
    },
    /// Parameterized INSERT into a base table.
    Insert {
        /// Target `tb_*` table.
        table: String,
        /// Columns bound from the input object, in order.
        columns: Vec<String>,
    },
    /// Parameterized UPDATE of a base table by primary key.
    Update {
        /// Target `tb_*` table.
        table: String,
        /// Columns bound from the input object, in order.
        columns: Vec<String>,
        /// Primary-key column.
        key_column: String,
    },
    /// Soft delete (sets `deleted_at`) by primary key.
    Delete {
        /// Target `tb_*` table.
        table: String,
        /// Primary-key column.
        key_column: String,
    },
}
