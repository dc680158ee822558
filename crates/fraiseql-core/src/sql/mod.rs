//! SQL dialect renderers.
//!
//! A dialect knows how to quote identifiers, number parameter placeholders,
//! project a JSON payload column as text, and render the ordered `_entities`
//! batch template. Everything else (operator fragments) comes from the
//! capability manifest, so adding a database target is a manifest file plus
//! one implementation of [`Dialect`].

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use fraiseql_error::{FraiseQLError, Result};

/// Database dialect: identifier quoting, placeholders, JSON projection.
pub trait Dialect: Send + Sync {
    /// Target identifier this dialect renders for.
    fn name(&self) -> &'static str;

    /// Quote an identifier (view, table, column). Identifiers come from the
    /// IR and the manifest, never from request input, but they are quoted
    /// unconditionally anyway.
    fn quote_ident(&self, ident: &str) -> String;

    /// Positional placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Project the JSON payload column as text (one row string per row).
    fn json_text_projection(&self, jsonb_column: &str) -> String;

    /// Reference one field inside the JSON payload as text, for WHERE and
    /// ORDER BY clauses (e.g. `data->>'email'`).
    fn json_field_ref(&self, jsonb_column: &str, path: &[&str]) -> String;

    /// Render the ordered `_entities` batch template.
    ///
    /// The single parameter is a JSON array of representations. The template
    /// must return exactly one row per input element, in input order, with
    /// the literal string `null` for keys that matched no row.
    fn entities_batch_sql(&self, view: &str, jsonb_column: &str, key_columns: &[String]) -> String;

    /// Select the named columns of a relational view as one JSON object per
    /// row. Used by the Arrow plane, whose `va_*`/`ta_*` views are columnar
    /// rather than JSONB-composed.
    fn row_json_select(&self, view: &str, columns: &[String]) -> String;

    /// Call a stored procedure taking the mutation input object as JSON and
    /// returning the result row as JSON text.
    fn mutation_function_sql(&self, name: &str) -> String;
}

/// Resolve the dialect for a target identifier.
pub fn dialect_for(target: &str) -> Result<&'static dyn Dialect> {
    static POSTGRES: PostgresDialect = PostgresDialect;
    static MYSQL: MySqlDialect = MySqlDialect;
    static SQLITE: SqliteDialect = SqliteDialect;

    match target {
        "postgres" => Ok(&POSTGRES),
        "mysql" => Ok(&MYSQL),
        "sqlite" => Ok(&SQLITE),
        other => Err(FraiseQLError::config(format!(
            "no dialect renderer for target '{other}'"
        ))),
    }
}
