//! Compiled schema types.
//!
//! Everything here is emitted by the compiler and deserialized at process
//! start. The artifact is entirely deterministic given (IR, manifest,
//! target): collections are sorted during compilation, so byte-identical
//! inputs produce byte-identical artifacts regardless of IR iteration order.

use fraiseql_error::{FraiseQLError, Result};
use serde::{Deserialize, Serialize};

use crate::capability::{ScalarFamily, ValueShape};
use crate::ir::{ArrowColumnDef, FieldPermission, MutationKind, ProvidesDef, RequiresDef};

/// Complete compiled schema - all information needed to serve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledSchema {
    /// Database target the schema was compiled for.
    pub target: String,

    /// Hex sha256 over the canonical serialization (with this field empty).
    /// Cache key and schema version in one.
    pub schema_hash: String,

    /// Compiled types, sorted by name.
    pub types: Vec<CompiledType>,

    /// Per-type WHERE input types, sorted by type name.
    pub where_inputs: Vec<WhereInputType>,

    /// SQL templates, sorted by operation name.
    pub templates: Vec<SqlTemplate>,

    /// Federation metadata.
    #[serde(default)]
    pub federation: FederationMetadata,

    /// Arrow projection schemas.
    #[serde(default)]
    pub arrow: ArrowSchemaSet,
}

impl CompiledSchema {
    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FraiseQLError::config(format!("invalid compiled schema: {e}")))
    }

    /// Load an artifact from disk, verifying its content hash.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let schema = Self::from_json(&raw)?;
        let expected = super::hash::compute_hash(&schema);
        if schema.schema_hash != expected {
            return Err(FraiseQLError::config(format!(
                "compiled schema hash mismatch: artifact says {}, content hashes to {expected}",
                schema.schema_hash
            )));
        }
        Ok(schema)
    }

    /// Write the artifact to disk as pretty JSON.
    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Find a compiled type by name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&CompiledType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Find the WHERE input type for a type.
    #[must_use]
    pub fn where_input(&self, type_name: &str) -> Option<&WhereInputType> {
        self.where_inputs.iter().find(|w| w.type_name == type_name)
    }

    /// Find a template by root operation name.
    #[must_use]
    pub fn find_template(&self, operation_name: &str) -> Option<&SqlTemplate> {
        self.templates.iter().find(|t| t.operation_name == operation_name)
    }

    /// Find federation metadata for a type.
    #[must_use]
    pub fn federated_type(&self, type_name: &str) -> Option<&FederatedType> {
        self.federation.types.iter().find(|t| t.name == type_name)
    }

    /// Find an Arrow projection by name.
    #[must_use]
    pub fn arrow_projection(&self, name: &str) -> Option<&CompiledArrowProjection> {
        self.arrow.projections.iter().find(|p| p.name == name)
    }
}

/// One compiled object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledType {
    /// GraphQL type name.
    pub name: String,

    /// Local view, when the type resolves locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,

    /// JSONB payload column of the view.
    pub jsonb_column: String,

    /// Primary-key columns inside the payload.
    pub primary_key: Vec<String>,

    /// Field names (storage-side), sorted, with their scalar families where
    /// scalar. Kept for introspection and Arrow/federation validation.
    pub fields: Vec<CompiledField>,

    /// Field-level permission descriptors, enforced by the executor before
    /// a selection touching the field runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_permissions: Vec<FieldPermission>,
}

/// One compiled field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledField {
    /// Storage-side name.
    pub name: String,
    /// Scalar family, absent for object/list fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<ScalarFamily>,
    /// Nullability.
    pub nullable: bool,
}

/// WHERE input type generated for one object type.
///
/// Only operators available for the compile target appear here; the executor
/// can therefore bind any filter in the input without consulting the manifest
/// again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereInputType {
    /// Type this input filters.
    pub type_name: String,

    /// Filterable fields, sorted by GraphQL name.
    pub fields: Vec<WhereFieldInput>,
}

impl WhereInputType {
    /// Find a filterable field by its exposed (camelCase) name.
    #[must_use]
    pub fn field(&self, graphql_name: &str) -> Option<&WhereFieldInput> {
        self.fields.iter().find(|f| f.graphql_name == graphql_name)
    }
}

/// One filterable field of a WHERE input type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereFieldInput {
    /// Storage-side field name.
    pub field: String,

    /// Exposed camelCase name.
    pub graphql_name: String,

    /// Pre-rendered column reference (e.g. `"data"->>'email'`).
    pub column_expr: String,

    /// Scalar family.
    pub family: ScalarFamily,

    /// Operators available on this field for the compile target, in
    /// manifest order.
    pub operators: Vec<CompiledOperator>,
}

impl WhereFieldInput {
    /// Find an operator by GraphQL name.
    #[must_use]
    pub fn operator(&self, name: &str) -> Option<&CompiledOperator> {
        self.operators.iter().find(|op| op.name == name)
    }
}

/// One operator pre-rendered against a column.
///
/// `sql` still carries `{param}` / `{param2}` slots; the executor substitutes
/// dialect placeholders with running indices at bind time. No other runtime
/// string assembly happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledOperator {
    /// GraphQL operator name (e.g. `_eq`).
    pub name: String,

    /// SQL fragment with the column substituted and parameter slots open.
    pub sql: String,

    /// Value shape the operator accepts.
    pub value: ValueShape,
}

/// Template kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateKind {
    /// List query with filters and keyset pagination.
    List,
    /// Single row by primary key.
    Single,
    /// `_entities` batch lookup.
    EntityBatch,
    /// Mutation backed by a database operation.
    Mutation {
        /// The backing operation.
        operation: MutationKind,
    },
}

/// One pre-compiled SQL template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlTemplate {
    /// Root GraphQL field this template serves.
    pub operation_name: String,

    /// Return type name; also the `__typename` the response builder injects.
    pub type_name: String,

    /// Template kind.
    pub kind: TemplateKind,

    /// SQL text. Contains `{where}`, `{keyset}` and `{limit}` slots for the
    /// request-dependent parts; everything else (including authorization
    /// predicates) is fixed at compile time.
    pub sql: String,

    /// Ordered fixed binders. Dynamic filter/keyset/limit parameters follow
    /// these in placeholder numbering.
    pub binders: Vec<Binder>,

    /// Keyset ORDER BY columns for list templates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyset: Vec<KeysetColumn>,

    /// JSONB field paths the template projects (diagnostic metadata).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projections: Vec<String>,

    /// For table-backed mutations: the pre-rendered single-row re-select
    /// that produces the mutated row as JSON text. Function mutations return
    /// their row directly and leave this empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_sql: Option<String>,
}

/// A fixed template parameter, bound in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bind", rename_all = "snake_case")]
pub enum Binder {
    /// Value pulled from the request context (e.g. `tenant_id`).
    Context {
        /// Context key.
        key: String,
    },
    /// Value of a GraphQL argument (e.g. the `id` of a single query).
    Argument {
        /// Argument name.
        name: String,
    },
    /// The whole mutation input object, bound as JSON.
    InputObject,
    /// One column of the mutation input object.
    InputColumn {
        /// Column / input key.
        column: String,
    },
    /// The JSON array of `_entities` representations.
    Representations,
}

/// One keyset ORDER BY column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeysetColumn {
    /// Storage-side field name (also the cursor tuple key).
    pub field: String,

    /// Pre-rendered column expression.
    pub column_expr: String,

    /// Descending order?
    #[serde(default)]
    pub descending: bool,
}

/// Federation metadata embedded in the artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FederationMetadata {
    /// Whether any type declares federation directives.
    pub enabled: bool,

    /// Per-type metadata, sorted by name.
    pub types: Vec<FederatedType>,
}

/// One federated type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedType {
    /// Type name.
    pub name: String,

    /// `@key` sets; ordered composite keys.
    pub keys: Vec<Vec<String>>,

    /// Resolution strategy chosen at compile time.
    pub strategy: ResolutionStrategy,

    /// `@extends` flag.
    #[serde(default)]
    pub extends: bool,

    /// `@external` fields.
    #[serde(default)]
    pub external_fields: Vec<String>,

    /// `@shareable` fields.
    #[serde(default)]
    pub shareable_fields: Vec<String>,

    /// `@requires` declarations (runtime-enforced).
    #[serde(default)]
    pub requires: Vec<RequiresDef>,

    /// `@provides` declarations (runtime short-circuit).
    #[serde(default)]
    pub provides: Vec<ProvidesDef>,

    /// Pre-rendered `_entities` batch SQL for Local / PeerDatabase
    /// strategies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities_sql: Option<String>,
}

impl FederatedType {
    /// The primary `@key` set.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        self.keys.first().map_or(&[], Vec::as_slice)
    }
}

/// Per-type resolution strategy baked into the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Run the `_entities` template against the local view.
    Local {
        /// Local view name.
        view: String,
    },
    /// Same compiled SQL over a pooled connection to a peer database.
    PeerDatabase {
        /// Named connection descriptor from runtime configuration.
        connection: String,
        /// View name on the peer.
        view: String,
    },
    /// Batched `_entities` GraphQL request to a remote subgraph.
    HttpSubgraph {
        /// Subgraph endpoint URL.
        url: String,
    },
}

/// Arrow schemas for every declared projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrowSchemaSet {
    /// Compiled projections, sorted by name.
    pub projections: Vec<CompiledArrowProjection>,
}

/// One compiled Arrow projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArrowProjection {
    /// Projection name.
    pub name: String,

    /// Declaring type.
    pub type_name: String,

    /// Ordered batches; batch order is response order.
    pub batches: Vec<CompiledArrowBatch>,
}

/// One compiled Arrow batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArrowBatch {
    /// Batch name.
    pub name: String,

    /// Source view.
    pub view: String,

    /// Pre-rendered SELECT producing one JSON object per row.
    pub select_sql: String,

    /// Typed columns (IR shape carried through; validated at compile time).
    pub columns: Vec<ArrowColumnDef>,
}
