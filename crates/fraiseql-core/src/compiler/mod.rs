//! Schema compiler.
//!
//! Turns a [`SchemaIr`] document plus a [`CapabilityManifest`] into a
//! [`CompiledSchema`] artifact. The pipeline is a fixed sequence of
//! deterministic phases, each testable in isolation:
//!
//! 1. **Validate** - type references resolve, key fields exist, federation
//!    declarations are coherent, Arrow projections are representable.
//! 2. **Capability resolution** - intersect each field's scalar family with
//!    the target manifest; reject unknown operators with suggestions.
//! 3. **SQL template generation** - list / single / mutation templates with
//!    keyset ordering and fixed binder lists.
//! 4. **Federation metadata** - per-type strategies and pre-rendered
//!    `_entities` batch SQL.
//! 5. **Arrow schema emission** - typed batch manifests, depth-checked.
//! 6. **Canonicalization + hashing** - sort every collection, sha256.

mod arrow;
mod federation;
mod operators;
mod sqlgen;
mod validate;

use fraiseql_error::{FraiseQLError, Result};

use crate::capability::CapabilityManifest;
use crate::ir::SchemaIr;
use crate::schema::{self, CompiledField, CompiledSchema, CompiledType};
use crate::sql::dialect_for;

/// Compile a schema IR against a capability manifest for a target.
///
/// Deterministic: byte-identical artifacts for equal (IR, manifest, target)
/// regardless of IR collection order.
///
/// # Errors
///
/// Returns a [`fraiseql_error::CompileError`] for any validation or
/// capability failure; compile errors abort the run.
pub fn compile(
    ir: &SchemaIr,
    manifest: &CapabilityManifest,
    target: &str,
) -> Result<CompiledSchema> {
    if manifest.target != target {
        return Err(FraiseQLError::config(format!(
            "manifest is for target '{}', compile requested '{target}'",
            manifest.target
        )));
    }
    let dialect = dialect_for(target)?;

    // Phase 1: structural validation.
    validate::validate_ir(ir)?;

    // Phase 2: capability resolution.
    let where_inputs = operators::resolve_where_inputs(ir, manifest, dialect)?;

    // Phase 3: SQL template generation.
    let templates = sqlgen::generate_templates(ir, dialect)?;

    // Phase 4: federation metadata.
    let federation = federation::derive_metadata(ir, dialect)?;

    // Phase 5: Arrow schema emission.
    let arrow = arrow::emit_schemas(ir, dialect)?;

    // Compiled type table.
    let mut types: Vec<CompiledType> = ir
        .types
        .iter()
        .map(|t| {
            let mut fields: Vec<CompiledField> = t
                .fields
                .iter()
                .map(|f| CompiledField {
                    name:     f.name.clone(),
                    family:   f.semantic_type.family(),
                    nullable: f.nullable,
                })
                .collect();
            fields.sort_by(|a, b| a.name.cmp(&b.name));

            CompiledType {
                name:         t.name.clone(),
                view:         t.bound_source.as_ref().map(|s| s.view.clone()),
                jsonb_column: t
                    .bound_source
                    .as_ref()
                    .map_or_else(|| "data".to_string(), |s| s.jsonb_column.clone()),
                primary_key:  t
                    .bound_source
                    .as_ref()
                    .map_or_else(Vec::new, |s| s.primary_key.clone()),
                fields,
                field_permissions: t
                    .authorization
                    .as_ref()
                    .map_or_else(Vec::new, |a| a.field_permissions.clone()),
            }
        })
        .collect();

    // Phase 6: canonicalize and hash.
    types.sort_by(|a, b| a.name.cmp(&b.name));

    let mut compiled = CompiledSchema {
        target: target.to_string(),
        schema_hash: String::new(),
        types,
        where_inputs,
        templates,
        federation,
        arrow,
    };
    compiled.where_inputs.sort_by(|a, b| a.type_name.cmp(&b.type_name));
    compiled.templates.sort_by(|a, b| a.operation_name.cmp(&b.operation_name));
    compiled.federation.types.sort_by(|a, b| a.name.cmp(&b.name));
    compiled.arrow.projections.sort_by(|a, b| a.name.cmp(&b.name));

    compiled.schema_hash = schema::compute_hash(&compiled);

    tracing::info!(
        target = %compiled.target,
        hash = %compiled.schema_hash,
        types = compiled.types.len(),
        templates = compiled.templates.len(),
        "schema compiled"
    );

    Ok(compiled)
}
