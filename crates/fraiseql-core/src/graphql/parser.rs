//! Lowering from the `graphql-parser` AST.

use std::collections::HashMap;

use fraiseql_error::{ProtocolError, Result};
use graphql_parser::query as ast;
use serde_json::{json, Value};

use super::types::{
    FieldSelection, OperationType, ParsedDocument, ParsedOperation, SelectionNode,
};

/// Parse a GraphQL request document, expanding fragment spreads.
pub fn parse_query(text: &str) -> Result<ParsedDocument> {
    let document = graphql_parser::parse_query::<String>(text).map_err(|e| {
        ProtocolError::MalformedQuery {
            message: e.to_string(),
        }
    })?;

    // Index fragments for spread expansion.
    let mut fragments: HashMap<String, &ast::FragmentDefinition<'_, String>> = HashMap::new();
    for definition in &document.definitions {
        if let ast::Definition::Fragment(fragment) = definition {
            fragments.insert(fragment.name.clone(), fragment);
        }
    }

    let mut operations = Vec::new();
    for definition in &document.definitions {
        let ast::Definition::Operation(operation) = definition else {
            continue;
        };
        operations.push(lower_operation(operation, &fragments)?);
    }

    if operations.is_empty() {
        return Err(ProtocolError::MalformedQuery {
            message: "document contains no executable operation".to_string(),
        }
        .into());
    }

    Ok(ParsedDocument { operations })
}

fn lower_operation(
    operation: &ast::OperationDefinition<'_, String>,
    fragments: &HashMap<String, &ast::FragmentDefinition<'_, String>>,
) -> Result<ParsedOperation> {
    let (operation_type, name, selection_set) = match operation {
        ast::OperationDefinition::SelectionSet(set) => (OperationType::Query, None, set),
        ast::OperationDefinition::Query(query) => {
            (OperationType::Query, query.name.clone(), &query.selection_set)
        },
        ast::OperationDefinition::Mutation(mutation) => {
            (OperationType::Mutation, mutation.name.clone(), &mutation.selection_set)
        },
        ast::OperationDefinition::Subscription(subscription) => (
            OperationType::Subscription,
            subscription.name.clone(),
            &subscription.selection_set,
        ),
    };

    let mut expanding = Vec::new();
    let nodes = lower_selection_set(selection_set, fragments, &mut expanding)?;

    // Root selections must be fields.
    let mut selections = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            SelectionNode::Field(field) => selections.push(field),
            SelectionNode::InlineFragment { selections: inner, .. } => {
                for nested in inner {
                    if let SelectionNode::Field(field) = nested {
                        selections.push(field);
                    }
                }
            },
        }
    }

    Ok(ParsedOperation {
        operation_type,
        name,
        selections,
    })
}

fn lower_selection_set(
    selection_set: &ast::SelectionSet<'_, String>,
    fragments: &HashMap<String, &ast::FragmentDefinition<'_, String>>,
    expanding: &mut Vec<String>,
) -> Result<Vec<SelectionNode>> {
    let mut nodes = Vec::with_capacity(selection_set.items.len());

    for item in &selection_set.items {
        match item {
            ast::Selection::Field(field) => {
                let arguments = field
                    .arguments
                    .iter()
                    .map(|(name, value)| (name.clone(), lower_value(value)))
                    .collect();
                nodes.push(SelectionNode::Field(FieldSelection {
                    name: field.name.clone(),
                    alias: field.alias.clone(),
                    arguments,
                    selections: lower_selection_set(&field.selection_set, fragments, expanding)?,
                }));
            },
            ast::Selection::InlineFragment(fragment) => {
                let on = fragment.type_condition.as_ref().map(|tc| {
                    let ast::TypeCondition::On(name) = tc;
                    name.clone()
                });
                nodes.push(SelectionNode::InlineFragment {
                    on,
                    selections: lower_selection_set(&fragment.selection_set, fragments, expanding)?,
                });
            },
            ast::Selection::FragmentSpread(spread) => {
                if expanding.contains(&spread.fragment_name) {
                    return Err(ProtocolError::MalformedQuery {
                        message: format!("fragment cycle through '{}'", spread.fragment_name),
                    }
                    .into());
                }
                let Some(fragment) = fragments.get(&spread.fragment_name) else {
                    return Err(ProtocolError::MalformedQuery {
                        message: format!("unknown fragment '{}'", spread.fragment_name),
                    }
                    .into());
                };
                expanding.push(spread.fragment_name.clone());
                let inner = lower_selection_set(&fragment.selection_set, fragments, expanding)?;
                expanding.pop();

                let ast::TypeCondition::On(on) = &fragment.type_condition;
                nodes.push(SelectionNode::InlineFragment {
                    on: Some(on.clone()),
                    selections: inner,
                });
            },
        }
    }

    Ok(nodes)
}

fn lower_value(value: &ast::Value<'_, String>) -> Value {
    match value {
        ast::Value::Variable(name) => json!({ "__variable": name }),
        ast::Value::Int(n) => n.as_i64().map_or(Value::Null, Value::from),
        ast::Value::Float(f) => json!(f),
        ast::Value::String(s) => Value::String(s.clone()),
        ast::Value::Boolean(b) => Value::Bool(*b),
        ast::Value::Null => Value::Null,
        ast::Value::Enum(name) => Value::String(name.clone()),
        ast::Value::List(items) => Value::Array(items.iter().map(lower_value).collect()),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), lower_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_query() {
        let doc = parse_query("{ users(first: 2) { id firstName } }").expect("parses");
        assert_eq!(doc.operations.len(), 1);

        let op = &doc.operations[0];
        assert_eq!(op.operation_type, OperationType::Query);
        assert_eq!(op.selections.len(), 1);

        let users = &op.selections[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.arguments, vec![("first".to_string(), json!(2))]);
        assert_eq!(users.selected_field_names(), vec!["id", "firstName"]);
    }

    #[test]
    fn test_variables_become_markers() {
        let doc =
            parse_query("query($id: ID!) { user(id: $id) { id } }").expect("parses");
        let user = &doc.operations[0].selections[0];
        assert_eq!(
            user.arguments,
            vec![("id".to_string(), json!({"__variable": "id"}))]
        );
    }

    #[test]
    fn test_fragment_spread_expansion() {
        let doc = parse_query(
            "fragment Core on User { id email } query { users { ...Core } }",
        )
        .expect("parses");
        let users = &doc.operations[0].selections[0];
        assert_eq!(users.selected_field_names(), vec!["id", "email"]);
    }

    #[test]
    fn test_fragment_cycle_rejected() {
        let err = parse_query(
            "fragment A on User { ...B } fragment B on User { ...A } query { users { ...A } }",
        )
        .expect_err("rejects");
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_mutation_and_named_operation() {
        let doc = parse_query(
            "mutation CreateUser($input: CreateUserInput!) { createUser(input: $input) { id } }",
        )
        .expect("parses");
        let op = doc.operations[0].clone();
        assert_eq!(op.operation_type, OperationType::Mutation);
        assert_eq!(op.name.as_deref(), Some("CreateUser"));
    }

    #[test]
    fn test_syntax_error_is_protocol_error() {
        let err = parse_query("{ users(").expect_err("rejects");
        assert_eq!(err.error_code(), "GRAPHQL_PARSE_FAILED");
    }

    #[test]
    fn test_operation_selection_by_name() {
        let doc = parse_query("query A { users { id } } query B { user(id: \"u1\") { id } }")
            .expect("parses");
        assert!(doc.operation(Some("B")).is_ok());
        assert!(doc.operation(None).is_err());
        assert!(doc.operation(Some("C")).is_err());
    }
}
