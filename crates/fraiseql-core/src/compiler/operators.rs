//! Phase 2: capability resolution.
//!
//! For every filterable scalar field, the exposed operator set is the
//! intersection of the field's scalar-family operators with the target
//! manifest. A field that explicitly requests operators is validated against
//! the manifest and rejected with the target's suggestion list on any miss;
//! nothing ever falls back silently.

use fraiseql_error::Result;

use crate::capability::CapabilityManifest;
use crate::ir::SchemaIr;
use crate::schema::{CompiledOperator, WhereFieldInput, WhereInputType};
use crate::sql::Dialect;
use crate::utils::casing::to_camel_case;

/// Build the WHERE input type for every bound type.
pub fn resolve_where_inputs(
    ir: &SchemaIr,
    manifest: &CapabilityManifest,
    dialect: &dyn Dialect,
) -> Result<Vec<WhereInputType>> {
    let mut inputs = Vec::with_capacity(ir.types.len());

    for type_def in &ir.types {
        let Some(source) = &type_def.bound_source else {
            continue;
        };

        let mut fields = Vec::new();
        for field in &type_def.fields {
            if !field.filterable {
                continue;
            }
            let Some(family) = field.semantic_type.family() else {
                // Object / list fields are filtered through nested inputs on
                // their own types, not here.
                continue;
            };

            let column_expr = dialect.json_field_ref(&source.jsonb_column, &[field.column_name()]);

            let operators: Vec<CompiledOperator> = if field.filters.is_empty() {
                // Everything the target supports for this family.
                manifest
                    .operators_for(family)
                    .into_iter()
                    .map(|spec| CompiledOperator {
                        name:  spec.name.clone(),
                        sql:   spec.sql_template.replace("{column}", &column_expr),
                        value: spec.value,
                    })
                    .collect()
            } else {
                // Explicit operator list: every entry must resolve.
                let mut ops = Vec::with_capacity(field.filters.len());
                for requested in &field.filters {
                    let spec = manifest.require_operator(family, requested)?;
                    ops.push(CompiledOperator {
                        name:  spec.name.clone(),
                        sql:   spec.sql_template.replace("{column}", &column_expr),
                        value: spec.value,
                    });
                }
                ops
            };

            fields.push(WhereFieldInput {
                field: field.name.clone(),
                graphql_name: to_camel_case(&field.name),
                column_expr,
                family,
                operators,
            });
        }

        fields.sort_by(|a, b| a.graphql_name.cmp(&b.graphql_name));
        inputs.push(WhereInputType {
            type_name: type_def.name.clone(),
            fields,
        });
    }

    Ok(inputs)
}
