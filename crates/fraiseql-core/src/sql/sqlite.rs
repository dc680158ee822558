//! SQLite dialect.

use super::Dialect;

/// SQLite renderer. JSON payloads are TEXT columns already holding JSON;
/// `_entities` batches iterate the representation array with `json_each`.
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn json_text_projection(&self, jsonb_column: &str) -> String {
        self.quote_ident(jsonb_column)
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
        format!("json_extract({col}, '${json_path}')")
    }

    fn entities_batch_sql(&self, view: &str, jsonb_column: &str, key_columns: &[String]) -> String {
        let data = self.quote_ident(jsonb_column);
        let join = key_columns
            .iter()
            .map(|col| {
                let key = escape_json_key(col);
                format!("json_extract(t.{data}, '$.{key}') = json_extract(k.value, '$.{key}')")
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(
            "SELECT COALESCE(t.{data}, 'null') \
             FROM json_each(?) k \
             LEFT JOIN {view} t ON {join} \
             ORDER BY k.key",
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
            "SELECT json_object({pairs}) FROM {view} t",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_ref() {
        let d = SqliteDialect;
        assert_eq!(
            d.json_field_ref("data", &["email"]),
            "json_extract(\"data\", '$.email')"
        );
    }

    #[test]
    fn test_entities_uses_json_each() {
        let d = SqliteDialect;
        let sql = d.entities_batch_sql("v_user", "data", &["id".to_string()]);
        assert!(sql.contains("json_each"));
        assert!(sql.contains("ORDER BY k.key"));
    }
}
