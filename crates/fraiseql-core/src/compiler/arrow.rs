//! Phase 5: Arrow schema emission.
//!
//! Each declared projection compiles into a typed batch manifest. Depth is
//! bounded (a foreign-key chain may be at most two hops), nested arrays are
//! unrepresentable inside a batch, and foreign keys must point at an
//! existing, non-nullable column of another batch.

use std::collections::HashMap;

use fraiseql_error::{CompileError, Result};

use crate::ir::{ArrowBatchDef, ArrowTypeDef, SchemaIr};
use crate::schema::{ArrowSchemaSet, CompiledArrowBatch, CompiledArrowProjection};
use crate::sql::Dialect;

/// Maximum foreign-key hops inside one projection. Arrow batches are
/// shallow relational slices, not nested documents.
const MAX_RELATIONSHIP_HOPS: usize = 2;

/// Compile every Arrow projection declared in the IR.
pub fn emit_schemas(ir: &SchemaIr, dialect: &dyn Dialect) -> Result<ArrowSchemaSet> {
    let mut projections = Vec::new();

    for type_def in &ir.types {
        for projection in &type_def.arrow_projections {
            validate_batches(&projection.name, &projection.batches)?;

            let batches = projection
                .batches
                .iter()
                .map(|batch| {
                    let columns: Vec<String> =
                        batch.columns.iter().map(|c| c.name.clone()).collect();
                    CompiledArrowBatch {
                        name:       batch.name.clone(),
                        view:       batch.view.clone(),
                        select_sql: dialect.row_json_select(&batch.view, &columns),
                        columns:    batch.columns.clone(),
                    }
                })
                .collect();

            projections.push(CompiledArrowProjection {
                name: projection.name.clone(),
                type_name: type_def.name.clone(),
                batches,
            });
        }
    }

    Ok(ArrowSchemaSet { projections })
}

fn validate_batches(projection: &str, batches: &[ArrowBatchDef]) -> Result<()> {
    // Column index: batch -> (column -> nullable).
    let mut columns: HashMap<&str, HashMap<&str, bool>> = HashMap::new();
    for batch in batches {
        let entry = columns.entry(batch.name.as_str()).or_default();
        for col in &batch.columns {
            entry.insert(col.name.as_str(), col.nullable);
        }
    }

    // FK graph: batch -> referenced batch.
    let mut fk_target: HashMap<&str, &str> = HashMap::new();

    for batch in batches {
        for col in &batch.columns {
            validate_type(projection, &batch.name, &col.name, col.arrow_type)?;

            // Redact/Hash rewrite the value as a string; only Utf8 columns
            // can carry that.
            if matches!(
                col.mask,
                Some(crate::ir::MaskStrategy::Redact | crate::ir::MaskStrategy::Hash)
            ) && col.arrow_type != ArrowTypeDef::Utf8
            {
                return Err(CompileError::UnrepresentableArrowType {
                    batch:   batch.name.clone(),
                    field:   col.name.clone(),
                    message: "redact/hash masking requires a utf8 column".to_string(),
                }
                .into());
            }

            let Some(fk) = &col.foreign_key else {
                continue;
            };
            let Some((target_batch, target_column)) = fk.split_once('.') else {
                return Err(CompileError::UnrepresentableArrowType {
                    batch:   batch.name.clone(),
                    field:   col.name.clone(),
                    message: format!("foreign key '{fk}' is not of the form 'batch.column'"),
                }
                .into());
            };

            let Some(target_cols) = columns.get(target_batch) else {
                return Err(CompileError::UnrepresentableArrowType {
                    batch:   batch.name.clone(),
                    field:   col.name.clone(),
                    message: format!("foreign key references unknown batch '{target_batch}'"),
                }
                .into());
            };
            match target_cols.get(target_column) {
                None => {
                    return Err(CompileError::UnrepresentableArrowType {
                        batch:   batch.name.clone(),
                        field:   col.name.clone(),
                        message: format!(
                            "foreign key references unknown column '{target_batch}.{target_column}'"
                        ),
                    }
                    .into());
                },
                Some(true) => {
                    return Err(CompileError::UnrepresentableArrowType {
                        batch:   batch.name.clone(),
                        field:   col.name.clone(),
                        message: format!(
                            "foreign key target '{target_batch}.{target_column}' must be non-nullable"
                        ),
                    }
                    .into());
                },
                Some(false) => {},
            }
            fk_target.insert(batch.name.as_str(), target_batch);
        }
    }

    // Depth check: follow each batch's FK chain.
    for batch in batches {
        let mut hops = 0;
        let mut current = batch.name.as_str();
        while let Some(next) = fk_target.get(current) {
            hops += 1;
            if hops > MAX_RELATIONSHIP_HOPS {
                return Err(CompileError::UnrepresentableArrowType {
                    batch:   batch.name.clone(),
                    field:   String::new(),
                    message: format!(
                        "projection '{projection}' exceeds {MAX_RELATIONSHIP_HOPS} relationship hops"
                    ),
                }
                .into());
            }
            if *next == batch.name {
                return Err(CompileError::UnrepresentableArrowType {
                    batch:   batch.name.clone(),
                    field:   String::new(),
                    message: "cyclic foreign-key chain".to_string(),
                }
                .into());
            }
            current = next;
        }
    }

    Ok(())
}

fn validate_type(
    projection: &str,
    batch: &str,
    column: &str,
    arrow_type: ArrowTypeDef,
) -> Result<()> {
    if let ArrowTypeDef::Decimal128 { precision, .. } = arrow_type {
        if precision == 0 || precision > 38 {
            return Err(CompileError::UnrepresentableArrowType {
                batch:   batch.to_string(),
                field:   column.to_string(),
                message: format!(
                    "decimal128 precision {precision} out of range 1..=38 in projection '{projection}'"
                ),
            }
            .into());
        }
    }
    Ok(())
}
