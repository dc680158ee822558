//! Manifest types and loading.

use fraiseql_error::{CompileError, FraiseQLError, Result};
use serde::{Deserialize, Serialize};

/// Scalar families a field can belong to.
///
/// The family decides which manifest operators apply to a field; it is
/// derived from the field's semantic type during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarFamily {
    String,
    Numeric,
    Boolean,
    Temporal,
    Uuid,
    Jsonb,
    Network,
    Vector,
    Ltree,
}

impl std::fmt::Display for ScalarFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Temporal => "temporal",
            Self::Uuid => "uuid",
            Self::Jsonb => "jsonb",
            Self::Network => "network",
            Self::Vector => "vector",
            Self::Ltree => "ltree",
        };
        f.write_str(s)
    }
}

/// Shape of the filter value an operator accepts.
///
/// Used to validate WHERE inputs before binding; the executor rejects a
/// filter whose value shape does not match before any SQL is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueShape {
    /// A single scalar value (string, number, boolean).
    #[default]
    Scalar,
    /// A list of scalar values.
    List,
    /// A two-element array bound to `{param}` and `{param2}` (e.g. a vector
    /// plus a distance threshold).
    Pair,
    /// A boolean toggle with no bound parameter (e.g. `_is_null`).
    Flag,
}

/// One operator a target supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSpec {
    /// Exposed GraphQL filter name (e.g. `_eq`, `_ilike`).
    pub name: String,

    /// SQL rendering template. `{column}` is the column reference; `{param}`
    /// the positional parameter slot. Templates are fixed strings from the
    /// manifest file; no user input is ever interpolated into them.
    pub sql_template: String,

    /// Value shape the operator accepts.
    #[serde(default)]
    pub value: ValueShape,

    /// Scalar families the operator applies to.
    pub families: Vec<ScalarFamily>,
}

impl OperatorSpec {
    /// Render the SQL fragment for `column_ref` with parameter slots filled
    /// by `placeholders` (e.g. `["$3"]` or `["$3", "$4"]`).
    ///
    /// `Flag` operators have no parameter slot and ignore `placeholders`.
    #[must_use]
    pub fn render(&self, column_ref: &str, placeholders: &[String]) -> String {
        let mut sql = self.sql_template.replace("{column}", column_ref);
        if let Some(p1) = placeholders.first() {
            sql = sql.replace("{param}", p1);
        }
        if let Some(p2) = placeholders.get(1) {
            sql = sql.replace("{param2}", p2);
        }
        sql
    }

    /// Number of parameters the rendered fragment binds.
    #[must_use]
    pub const fn param_count(&self) -> usize {
        match self.value {
            ValueShape::Flag => 0,
            ValueShape::Scalar | ValueShape::List => 1,
            ValueShape::Pair => 2,
        }
    }
}

/// Static per-database declaration of supported operators.
///
/// Immutable once loaded; shared by reference across the compile run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityManifest {
    /// Target identifier (e.g. `postgres`).
    pub target: String,

    /// Ordered operator table. Order is the order operators appear in
    /// generated `WhereInputType`s and in suggestion lists.
    pub operators: Vec<OperatorSpec>,
}

// One manifest file per target, checked into the repository.
const POSTGRES_MANIFEST: &str = include_str!("../../manifests/postgres.json");
const MYSQL_MANIFEST: &str = include_str!("../../manifests/mysql.json");
const SQLITE_MANIFEST: &str = include_str!("../../manifests/sqlite.json");

impl CapabilityManifest {
    /// Load the manifest for a known target.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown targets.
    pub fn load(target: &str) -> Result<Self> {
        let raw = match target {
            "postgres" => POSTGRES_MANIFEST,
            "mysql" => MYSQL_MANIFEST,
            "sqlite" => SQLITE_MANIFEST,
            other => {
                return Err(FraiseQLError::config(format!(
                    "unknown database target '{other}' (known: postgres, mysql, sqlite)"
                )))
            },
        };
        Self::from_json(raw)
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|e| FraiseQLError::config(format!("invalid capability manifest: {e}")))?;
        Ok(manifest)
    }

    /// Ordered operators supported for a scalar family.
    #[must_use]
    pub fn operators_for(&self, family: ScalarFamily) -> Vec<&OperatorSpec> {
        self.operators
            .iter()
            .filter(|op| op.families.contains(&family))
            .collect()
    }

    /// Look up one operator by GraphQL name within a family.
    #[must_use]
    pub fn operator(&self, family: ScalarFamily, name: &str) -> Option<&OperatorSpec> {
        self.operators
            .iter()
            .find(|op| op.name == name && op.families.contains(&family))
    }

    /// Operator names available for a family, for diagnostics.
    #[must_use]
    pub fn suggestions_for(&self, family: ScalarFamily) -> Vec<String> {
        self.operators_for(family)
            .iter()
            .map(|op| op.name.clone())
            .collect()
    }

    /// Resolve an operator or fail with the target's suggestion set.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnsupportedOperator`] carrying the suggestion
    /// list when the operator is absent for the family.
    pub fn require_operator(&self, family: ScalarFamily, name: &str) -> Result<&OperatorSpec> {
        self.operator(family, name).ok_or_else(|| {
            CompileError::UnsupportedOperator {
                target:        self.target.clone(),
                scalar_family: family.to_string(),
                operator:      name.to_string(),
                suggestions:   self.suggestions_for(family),
            }
            .into()
        })
    }
}
