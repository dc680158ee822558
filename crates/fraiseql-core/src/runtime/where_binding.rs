//! Runtime WHERE binding.
//!
//! Turns a GraphQL `where` argument into a SQL fragment plus parameter
//! values, using only the pre-rendered operator fragments baked into the
//! compiled `WhereInputType`. The operator set was intersected with the
//! capability manifest at compile time, so every filter that type-checks
//! here is renderable; user input only ever flows into bound parameters.

use fraiseql_error::{ProtocolError, Result};

use crate::capability::ValueShape;
use crate::schema::WhereInputType;
use crate::sql::Dialect;

/// Render a filter object into `(sql, params)`, numbering placeholders from
/// `next_param + 1` onward. Returns `TRUE` for absent/empty filters.
pub fn render_where(
    input_type: &WhereInputType,
    dialect: &dyn Dialect,
    filter: Option<&serde_json::Value>,
    next_param: &mut usize,
) -> Result<(String, Vec<serde_json::Value>)> {
    let mut params = Vec::new();
    let sql = match filter {
        None | Some(serde_json::Value::Null) => "TRUE".to_string(),
        Some(value) => render_node(input_type, dialect, value, next_param, &mut params)?,
    };
    Ok((sql, params))
}

fn render_node(
    input_type: &WhereInputType,
    dialect: &dyn Dialect,
    node: &serde_json::Value,
    next_param: &mut usize,
    params: &mut Vec<serde_json::Value>,
) -> Result<String> {
    let Some(object) = node.as_object() else {
        return Err(malformed("filter must be an object"));
    };
    if object.is_empty() {
        return Ok("TRUE".to_string());
    }

    let mut clauses = Vec::with_capacity(object.len());
    for (key, value) in object {
        match key.as_str() {
            "_and" | "_or" => {
                let Some(items) = value.as_array() else {
                    return Err(malformed(&format!("{key} expects a list of filters")));
                };
                if items.is_empty() {
                    clauses.push(if key == "_and" { "TRUE" } else { "FALSE" }.to_string());
                    continue;
                }
                let joiner = if key == "_and" { " AND " } else { " OR " };
                let parts: Result<Vec<String>> = items
                    .iter()
                    .map(|item| render_node(input_type, dialect, item, next_param, params))
                    .collect();
                clauses.push(format!("({})", parts?.join(joiner)));
            },
            "_not" => {
                let inner = render_node(input_type, dialect, value, next_param, params)?;
                clauses.push(format!("NOT ({inner})"));
            },
            field_name => {
                let Some(field) = input_type.field(field_name) else {
                    return Err(malformed(&format!(
                        "no filterable field '{field_name}' on {}",
                        input_type.type_name
                    )));
                };
                let Some(operators) = value.as_object() else {
                    return Err(malformed(&format!(
                        "filter for '{field_name}' must be an operator object"
                    )));
                };
                for (op_name, op_value) in operators {
                    let Some(op) = field.operator(op_name) else {
                        return Err(malformed(&format!(
                            "operator '{op_name}' is not available for '{field_name}'"
                        )));
                    };
                    clauses.push(render_operator(
                        dialect, &op.sql, op.value, op_name, op_value, next_param, params,
                    )?);
                }
            },
        }
    }

    Ok(format!("({})", clauses.join(" AND ")))
}

fn render_operator(
    dialect: &dyn Dialect,
    fragment: &str,
    shape: ValueShape,
    op_name: &str,
    value: &serde_json::Value,
    next_param: &mut usize,
    params: &mut Vec<serde_json::Value>,
) -> Result<String> {
    match shape {
        ValueShape::Flag => {
            // `_is_null: false` negates the rendered predicate.
            let Some(enabled) = value.as_bool() else {
                return Err(malformed(&format!("{op_name} expects a boolean")));
            };
            if enabled {
                Ok(fragment.to_string())
            } else {
                Ok(format!("NOT ({fragment})"))
            }
        },
        ValueShape::Scalar => {
            if value.is_array() || value.is_object() {
                return Err(malformed(&format!("{op_name} expects a scalar value")));
            }
            *next_param += 1;
            params.push(value.clone());
            Ok(fragment.replace("{param}", &dialect.placeholder(*next_param)))
        },
        ValueShape::List => {
            if !value.is_array() {
                return Err(malformed(&format!("{op_name} expects a list value")));
            }
            *next_param += 1;
            params.push(value.clone());
            Ok(fragment.replace("{param}", &dialect.placeholder(*next_param)))
        },
        ValueShape::Pair => {
            let valid = value.as_array().is_some_and(|items| items.len() == 2);
            if !valid {
                return Err(malformed(&format!("{op_name} expects a two-element list")));
            }
            let items = value.as_array().expect("checked above");
            *next_param += 1;
            let p1 = dialect.placeholder(*next_param);
            params.push(items[0].clone());
            *next_param += 1;
            let p2 = dialect.placeholder(*next_param);
            params.push(items[1].clone());
            Ok(fragment.replace("{param}", &p1).replace("{param2}", &p2))
        },
    }
}

fn malformed(message: &str) -> fraiseql_error::FraiseQLError {
    ProtocolError::MalformedQuery {
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityManifest;
    use crate::compiler;
    use crate::ir::SchemaIr;
    use crate::sql::dialect_for;
    use serde_json::json;

    fn where_input() -> WhereInputType {
        let ir = SchemaIr::from_json(
            r#"{
                "types": [{
                    "name": "User",
                    "fields": [
                        {"name": "id", "type": {"scalar": "id"}},
                        {"name": "email", "type": {"scalar": "string"}},
                        {"name": "age", "type": {"scalar": "int"}}
                    ],
                    "bound_source": {"view": "v_user", "primary_key": ["id"]}
                }]
            }"#,
        )
        .expect("IR parses");
        let manifest = CapabilityManifest::load("postgres").expect("manifest");
        let compiled = compiler::compile(&ir, &manifest, "postgres").expect("compiles");
        compiled.where_input("User").expect("where input").clone()
    }

    #[test]
    fn test_simple_equality() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let (sql, params) = render_where(
            &input,
            dialect,
            Some(&json!({"email": {"_eq": "a@b.c"}})),
            &mut next,
        )
        .expect("renders");

        assert_eq!(sql, "(\"data\"->>'email' = $1)");
        assert_eq!(params, vec![json!("a@b.c")]);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_param_numbering_continues_from_offset() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 2; // two fixed binders already allocated
        let (sql, _) = render_where(
            &input,
            dialect,
            Some(&json!({"age": {"_gte": 18, "_lt": 65}})),
            &mut next,
        )
        .expect("renders");

        assert!(sql.contains("$3"));
        assert!(sql.contains("$4"));
        assert_eq!(next, 4);
    }

    #[test]
    fn test_boolean_composition() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let (sql, params) = render_where(
            &input,
            dialect,
            Some(&json!({
                "_or": [
                    {"email": {"_ilike": "%@corp.com"}},
                    {"_not": {"age": {"_is_null": true}}}
                ]
            })),
            &mut next,
        )
        .expect("renders");

        assert!(sql.contains(" OR "));
        assert!(sql.contains("NOT ("));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_is_null_false_negates() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let (sql, params) = render_where(
            &input,
            dialect,
            Some(&json!({"email": {"_is_null": false}})),
            &mut next,
        )
        .expect("renders");

        assert_eq!(sql, "(NOT (\"data\"->>'email' IS NULL))");
        assert!(params.is_empty());
    }

    #[test]
    fn test_in_operator_binds_list() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let (sql, params) = render_where(
            &input,
            dialect,
            Some(&json!({"id": {"_in": ["u1", "u2"]}})),
            &mut next,
        )
        .expect("renders");

        assert!(sql.contains("= ANY($1)"));
        assert_eq!(params, vec![json!(["u1", "u2"])]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let err = render_where(
            &input,
            dialect,
            Some(&json!({"password": {"_eq": "x"}})),
            &mut next,
        )
        .expect_err("rejects");
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let err = render_where(
            &input,
            dialect,
            Some(&json!({"age": {"_regex": "^1"}})),
            &mut next,
        )
        .expect_err("rejects");
        assert!(err.to_string().contains("_regex"));
    }

    #[test]
    fn test_absent_filter_is_true() {
        let input = where_input();
        let dialect = dialect_for("postgres").expect("dialect");
        let mut next = 0;
        let (sql, params) = render_where(&input, dialect, None, &mut next).expect("renders");
        assert_eq!(sql, "TRUE");
        assert!(params.is_empty());
    }
}
