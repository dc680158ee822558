//! MySQL dialect.

use super::Dialect;

/// MySQL renderer. JSON payloads are JSON columns projected with
/// `JSON_UNQUOTE`-free `CAST`; `_entities` batches go through `JSON_TABLE`.
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn json_text_projection(&self, jsonb_column: &str) -> String {
        format!("CAST({} AS CHAR)", self.quote_ident(jsonb_column))
    }

    fn json_field_ref(&self, jsonb_column: &str, path: &[&str]) -> String {
        let col = self.quote_ident(jsonb_column);
        if path.is_empty() {
            return col;
        }
        let json_path: String = path
            .iter()
            .map(|segment| format!(".{}", escape_json_key(segment)))
            .collect();
        format!("JSON_UNQUOTE(JSON_EXTRACT({col}, '${json_path}'))")
    }

    fn entities_batch_sql(&self, view: &str, jsonb_column: &str, key_columns: &[String]) -> String {
        let data = self.quote_ident(jsonb_column);
        let columns = key_columns
            .iter()
            .map(|col| format!("{} VARCHAR(255) PATH '$.{}'", self.quote_ident(col), escape_json_key(col)))
            .collect::<Vec<_>>()
            .join(", ");
        let join = key_columns
            .iter()
            .map(|col| {
                format!(
                    "JSON_UNQUOTE(JSON_EXTRACT(t.{data}, '$.{key}')) = k.{quoted}",
                    key = escape_json_key(col),
                    quoted = self.quote_ident(col),
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(
            "SELECT COALESCE(CAST(t.{data} AS CHAR), 'null') \
             FROM JSON_TABLE(?, '$[*]' COLUMNS (ord FOR ORDINALITY, {columns})) k \
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
            "SELECT JSON_OBJECT({pairs}) FROM {view} t",
            view = self.quote_ident(view),
        )
    }

    fn mutation_function_sql(&self, name: &str) -> String {
        format!("SELECT {}(?)", self.quote_ident(name))
    }
}

fn escape_json_key(key: &str) -> String {
    key.replace('\'', "''")
}
