//! PostgreSQL dialect.

use super::Dialect;

/// PostgreSQL renderer. JSON payloads are JSONB columns projected with
/// `::text`; `_entities` batches unnest a JSONB array with ordinality.
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn json_text_projection(&self, jsonb_column: &str) -> String {
        format!("{}::text", self.quote_ident(jsonb_column))
    }

    fn json_field_ref(&self, jsonb_column: &str, path: &[&str]) -> String {
        let col = self.quote_ident(jsonb_column);
        match path {
            [] => col,
            [single] => format!("{col}->>'{}'", escape_json_key(single)),
            _ => {
                let mut out = col;
                for segment in &path[..path.len() - 1] {
                    out.push_str(&format!("->'{}'", escape_json_key(segment)));
                }
                out.push_str(&format!("->>'{}'", escape_json_key(path[path.len() - 1])));
                out
            },
        }
    }

    fn entities_batch_sql(&self, view: &str, jsonb_column: &str, key_columns: &[String]) -> String {
        let data = self.quote_ident(jsonb_column);
        let join = key_columns
            .iter()
            .map(|col| {
                let key = escape_json_key(col);
                format!("t.{data}->>'{key}' = k.rep->>'{key}'")
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(
            "SELECT COALESCE(t.{data}::text, 'null') \
             FROM jsonb_array_elements($1::jsonb) WITH ORDINALITY AS k(rep, ord) \
             LEFT JOIN {view} t ON {join} \
             ORDER BY k.ord",
            view = self.quote_ident(view),
        )
    }

    fn row_json_select(&self, view: &str, columns: &[String]) -> String {
        let pairs = columns
            .iter()
            .map(|col| format!("'{}', t.{}", escape_json_key(col), self.quote_ident(col)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT json_build_object({pairs})::text FROM {view} t",
            view = self.quote_ident(view),
        )
    }

    fn mutation_function_sql(&self, name: &str) -> String {
        format!("SELECT {}(($1)::jsonb)::text", self.quote_ident(name))
    }
}

/// JSON keys come from the IR, not from requests, but single quotes would
/// still break the literal.
fn escape_json_key(key: &str) -> String {
    key.replace('\'', "''")
}
