//! Phase 3: SQL template generation.
//!
//! Templates are fully rendered except for three request-dependent slots:
//! `{where}` (bound filters), `{keyset}` (cursor predicate) and `{limit}`
//! plus its optional `{offset}` tail. Fixed parameters (authorization
//! context values, primary-key arguments, mutation inputs) are numbered at
//! compile time and listed in binder order; dynamic parameters continue the
//! numbering at bind time.

use fraiseql_error::{CompileError, Result};
use itertools::Itertools;

use crate::ir::{MutationKind, SchemaIr, TypeDef};
use crate::schema::{Binder, KeysetColumn, SqlTemplate, TemplateKind};
use crate::sql::Dialect;
use crate::utils::casing::to_camel_case;

/// Generate templates for every root query and mutation.
pub fn generate_templates(ir: &SchemaIr, dialect: &dyn Dialect) -> Result<Vec<SqlTemplate>> {
    let mut templates = Vec::with_capacity(ir.queries.len() + ir.mutations.len());

    for query in &ir.queries {
        let type_def = ir
            .find_type(&query.return_type)
            .ok_or_else(|| CompileError::UnknownType {
                type_name: query.return_type.clone(),
            })?;
        let Some(source) = &type_def.bound_source else {
            return Err(CompileError::ViewBindingMissing {
                type_name: type_def.name.clone(),
            }
            .into());
        };

        let template = if query.returns_list {
            generate_list(dialect, &query.name, type_def, source)
        } else {
            generate_single(dialect, &query.name, type_def, source)
        };
        templates.push(template);
    }

    for mutation in &ir.mutations {
        let type_def = ir
            .find_type(&mutation.return_type)
            .ok_or_else(|| CompileError::UnknownType {
                type_name: mutation.return_type.clone(),
            })?;
        templates.push(generate_mutation(dialect, mutation.name.as_str(), type_def, &mutation.operation));
    }

    Ok(templates)
}

/// Render the authorization predicate and its binders, or `TRUE`.
fn auth_predicate(dialect: &dyn Dialect, type_def: &TypeDef, next_param: &mut usize) -> (String, Vec<Binder>) {
    let Some(auth) = &type_def.authorization else {
        return ("TRUE".to_string(), Vec::new());
    };
    let Some(filter) = &auth.row_filter else {
        return ("TRUE".to_string(), Vec::new());
    };

    // The template's {column}-free {param} slots are filled left to right
    // with numbered placeholders; binders record which context key feeds
    // each one.
    let mut sql = filter.clone();
    let mut binders = Vec::with_capacity(auth.row_filter_binders.len());
    for key in &auth.row_filter_binders {
        *next_param += 1;
        sql = sql.replacen("{param}", &dialect.placeholder(*next_param), 1);
        binders.push(Binder::Context { key: key.clone() });
    }
    (format!("({sql})"), binders)
}

fn keyset_columns(dialect: &dyn Dialect, source: &crate::ir::BoundSource) -> Vec<KeysetColumn> {
    source
        .primary_key
        .iter()
        .map(|col| KeysetColumn {
            field:       col.clone(),
            column_expr: dialect.json_field_ref(&source.jsonb_column, &[col]),
            descending:  false,
        })
        .collect()
}

fn projections(type_def: &TypeDef) -> Vec<String> {
    type_def
        .fields
        .iter()
        .map(|f| f.column_name().to_string())
        .sorted()
        .collect()
}

fn generate_list(
    dialect: &dyn Dialect,
    operation_name: &str,
    type_def: &TypeDef,
    source: &crate::ir::BoundSource,
) -> SqlTemplate {
    let mut next_param = 0;
    let (auth, binders) = auth_predicate(dialect, type_def, &mut next_param);
    let keyset = keyset_columns(dialect, source);
    let order_by = keyset
        .iter()
        .map(|k| {
            format!(
                "{} {}",
                k.column_expr,
                if k.descending { "DESC" } else { "ASC" }
            )
        })
        .join(", ");

    let sql = format!(
        "SELECT {projection} FROM {view} WHERE {auth} AND {{where}} AND {{keyset}} \
         ORDER BY {order_by} LIMIT {{limit}}{{offset}}",
        projection = dialect.json_text_projection(&source.jsonb_column),
        view = dialect.quote_ident(&source.view),
    );

    SqlTemplate {
        operation_name: operation_name.to_string(),
        type_name: type_def.name.clone(),
        kind: TemplateKind::List,
        sql,
        binders,
        keyset,
        projections: projections(type_def),
        followup_sql: None,
    }
}

fn generate_single(
    dialect: &dyn Dialect,
    operation_name: &str,
    type_def: &TypeDef,
    source: &crate::ir::BoundSource,
) -> SqlTemplate {
    let mut next_param = 0;
    let (auth, mut binders) = auth_predicate(dialect, type_def, &mut next_param);

    let pk_predicate = source
        .primary_key
        .iter()
        .map(|col| {
            next_param += 1;
            binders.push(Binder::Argument {
                name: to_camel_case(col),
            });
            format!(
                "{} = {}",
                dialect.json_field_ref(&source.jsonb_column, &[col]),
                dialect.placeholder(next_param)
            )
        })
        .join(" AND ");

    let sql = format!(
        "SELECT {projection} FROM {view} WHERE {auth} AND {pk_predicate} LIMIT 1",
        projection = dialect.json_text_projection(&source.jsonb_column),
        view = dialect.quote_ident(&source.view),
    );

    SqlTemplate {
        operation_name: operation_name.to_string(),
        type_name: type_def.name.clone(),
        kind: TemplateKind::Single,
        sql,
        binders,
        keyset: Vec::new(),
        projections: projections(type_def),
        followup_sql: None,
    }
}

/// The single-row re-select used after table-backed mutations.
fn reselect_sql(dialect: &dyn Dialect, source: &crate::ir::BoundSource) -> String {
    let predicate = source
        .primary_key
        .iter()
        .enumerate()
        .map(|(i, col)| {
            format!(
                "{} = {}",
                dialect.json_field_ref(&source.jsonb_column, &[col]),
                dialect.placeholder(i + 1)
            )
        })
        .join(" AND ");
    format!(
        "SELECT {projection} FROM {view} WHERE {predicate} LIMIT 1",
        projection = dialect.json_text_projection(&source.jsonb_column),
        view = dialect.quote_ident(&source.view),
    )
}

fn generate_mutation(
    dialect: &dyn Dialect,
    operation_name: &str,
    type_def: &TypeDef,
    operation: &MutationKind,
) -> SqlTemplate {
    let (sql, binders, followup_sql) = match operation {
        MutationKind::Function { name } => {
            (dialect.mutation_function_sql(name), vec![Binder::InputObject], None)
        },
        MutationKind::Insert { table, columns } => {
            let column_list = columns.iter().map(|c| dialect.quote_ident(c)).join(", ");
            let values = (1..=columns.len()).map(|i| dialect.placeholder(i)).join(", ");
            let sql = format!(
                "INSERT INTO {table} ({column_list}) VALUES ({values})",
                table = dialect.quote_ident(table),
            );
            let binders = columns
                .iter()
                .map(|c| Binder::InputColumn { column: c.clone() })
                .collect();
            let followup = type_def.bound_source.as_ref().map(|s| reselect_sql(dialect, s));
            (sql, binders, followup)
        },
        MutationKind::Update {
            table,
            columns,
            key_column,
        } => {
            let assignments = columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} = {}", dialect.quote_ident(c), dialect.placeholder(i + 1)))
                .join(", ");
            let sql = format!(
                "UPDATE {table} SET {assignments} WHERE {key} = {key_ph}",
                table = dialect.quote_ident(table),
                key = dialect.quote_ident(key_column),
                key_ph = dialect.placeholder(columns.len() + 1),
            );
            let mut binders: Vec<Binder> = columns
                .iter()
                .map(|c| Binder::InputColumn { column: c.clone() })
                .collect();
            binders.push(Binder::InputColumn {
                column: key_column.clone(),
            });
            let followup = type_def.bound_source.as_ref().map(|s| reselect_sql(dialect, s));
            (sql, binders, followup)
        },
        MutationKind::Delete { table, key_column } => {
            // Soft delete only; base tables carry `deleted_at`.
            let sql = format!(
                "UPDATE {table} SET {deleted} = CURRENT_TIMESTAMP WHERE {key} = {ph}",
                table = dialect.quote_ident(table),
                deleted = dialect.quote_ident("deleted_at"),
                key = dialect.quote_ident(key_column),
                ph = dialect.placeholder(1),
            );
            let binders = vec![Binder::Argument {
                name: to_camel_case(key_column),
            }];
            (sql, binders, None)
        },
    };

    SqlTemplate {
        operation_name: operation_name.to_string(),
        type_name: type_def.name.clone(),
        kind: TemplateKind::Mutation {
            operation: operation.clone(),
        },
        sql,
        binders,
        keyset: Vec::new(),
        projections: projections(type_def),
        followup_sql,
    }
}
