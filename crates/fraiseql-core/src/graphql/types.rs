//! Native operation AST.

use fraiseql_error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed request document: one or more executable operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Operations in document order.
    pub operations: Vec<ParsedOperation>,
}

impl ParsedDocument {
    /// Select the operation to execute, per the GraphQL over HTTP rules:
    /// a name must match when given; an unnamed request requires exactly
    /// one operation.
    pub fn operation(&self, name: Option<&str>) -> Result<&ParsedOperation> {
        match name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| {
                    ProtocolError::MalformedQuery {
                        message: format!("no operation named '{name}'"),
                    }
                    .into()
                }),
            None => {
                if self.operations.len() == 1 {
                    Ok(&self.operations[0])
                } else {
                    Err(ProtocolError::MalformedQuery {
                        message: "operationName is required for multi-operation documents"
                            .to_string(),
                    }
                    .into())
                }
            },
        }
    }
}

/// Operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

/// One executable operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOperation {
    /// Operation kind.
    pub operation_type: OperationType,

    /// Operation name, if any.
    pub name: Option<String>,

    /// Root selections (fragments already expanded).
    pub selections: Vec<FieldSelection>,
}

/// One node of a selection set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionNode {
    /// A field selection.
    Field(FieldSelection),
    /// An inline fragment (type condition preserved for subgraph
    /// passthrough).
    InlineFragment {
        /// `on Type` condition, if present.
        on: Option<String>,
        /// Nested selections.
        selections: Vec<SelectionNode>,
    },
}

/// One selected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSelection {
    /// Field name.
    pub name: String,

    /// Alias, if given.
    pub alias: Option<String>,

    /// Arguments as JSON values. Variables appear as
    /// `{"__variable": name}` markers.
    pub arguments: Vec<(String, Value)>,

    /// Nested selection set.
    pub selections: Vec<SelectionNode>,
}

impl FieldSelection {
    /// Response key: alias if present, field name otherwise.
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Argument value by name, with variables resolved.
    pub fn argument(
        &self,
        name: &str,
        variables: &serde_json::Map<String, Value>,
    ) -> Result<Option<Value>> {
        match self.arguments.iter().find(|(n, _)| n == name) {
            None => Ok(None),
            Some((_, value)) => Ok(Some(resolve_value(value, variables)?)),
        }
    }

    /// Field names selected directly under this field (through inline
    /// fragments), for permission checks.
    #[must_use]
    pub fn selected_field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.selections, &mut names);
        names
    }

    /// Render the nested selection set back to GraphQL text (for subgraph
    /// passthrough). Variables are substituted from `variables`.
    #[must_use]
    pub fn selection_text(&self, variables: &serde_json::Map<String, Value>) -> String {
        render_selection_set(&self.selections, variables)
    }
}

fn collect_names<'a>(nodes: &'a [SelectionNode], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            SelectionNode::Field(field) => out.push(&field.name),
            SelectionNode::InlineFragment { selections, .. } => collect_names(selections, out),
        }
    }
}

/// Resolve `{"__variable": name}` markers against the request variables.
pub fn resolve_value(value: &Value, variables: &serde_json::Map<String, Value>) -> Result<Value> {
    match value {
        Value::Object(object) => {
            if let Some(Value::String(name)) = object.get("__variable") {
                if object.len() == 1 {
                    return variables.get(name).cloned().ok_or_else(|| {
                        ProtocolError::MalformedQuery {
                            message: format!("variable '${name}' is not provided"),
                        }
                        .into()
                    });
                }
            }
            let mut resolved = serde_json::Map::with_capacity(object.len());
            for (k, v) in object {
                resolved.insert(k.clone(), resolve_value(v, variables)?);
            }
            Ok(Value::Object(resolved))
        },
        Value::Array(items) => {
            let resolved: Result<Vec<Value>> =
                items.iter().map(|v| resolve_value(v, variables)).collect();
            Ok(Value::Array(resolved?))
        },
        other => Ok(other.clone()),
    }
}

// ============================================================================
// Selection rendering (subgraph passthrough)
// ============================================================================

fn render_selection_set(nodes: &[SelectionNode], variables: &serde_json::Map<String, Value>) -> String {
    if nodes.is_empty() {
        return String::new();
    }
    let mut out = String::from("{");
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        render_node(node, variables, &mut out);
    }
    out.push('}');
    out
}

fn render_node(node: &SelectionNode, variables: &serde_json::Map<String, Value>, out: &mut String) {
    match node {
        SelectionNode::Field(field) => {
            if let Some(alias) = &field.alias {
                out.push_str(alias);
                out.push_str(": ");
            }
            out.push_str(&field.name);
            if !field.arguments.is_empty() {
                out.push('(');
                for (i, (name, value)) in field.arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(name);
                    out.push_str(": ");
                    let resolved = resolve_value(value, variables).unwrap_or(Value::Null);
                    render_graphql_value(&resolved, out);
                }
                out.push(')');
            }
            if !field.selections.is_empty() {
                out.push(' ');
                out.push_str(&render_selection_set(&field.selections, variables));
            }
        },
        SelectionNode::InlineFragment { on, selections } => {
            out.push_str("...");
            if let Some(on) = on {
                out.push_str(" on ");
                out.push_str(on);
            }
            out.push(' ');
            out.push_str(&render_selection_set(selections, variables));
        },
    }
}

fn render_graphql_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    other => out.push(other),
                }
            }
            out.push('"');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_graphql_value(item, out);
            }
            out.push(']');
        },
        Value::Object(object) => {
            out.push('{');
            for (i, (k, v)) in object.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(k);
                out.push_str(": ");
                render_graphql_value(v, out);
            }
            out.push('}');
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_variable_marker() {
        let mut variables = serde_json::Map::new();
        variables.insert("id".to_string(), json!("u1"));

        let resolved =
            resolve_value(&json!({"__variable": "id"}), &variables).expect("resolves");
        assert_eq!(resolved, json!("u1"));
    }

    #[test]
    fn test_missing_variable_rejected() {
        let variables = serde_json::Map::new();
        assert!(resolve_value(&json!({"__variable": "ghost"}), &variables).is_err());
    }

    #[test]
    fn test_nested_variables_resolve() {
        let mut variables = serde_json::Map::new();
        variables.insert("name".to_string(), json!("Alice"));
        let value = json!({"where": {"firstName": {"_eq": {"__variable": "name"}}}});
        let resolved = resolve_value(&value, &variables).expect("resolves");
        assert_eq!(resolved, json!({"where": {"firstName": {"_eq": "Alice"}}}));
    }

    #[test]
    fn test_selection_text_rendering() {
        let field = FieldSelection {
            name:       "_entities".to_string(),
            alias:      None,
            arguments:  Vec::new(),
            selections: vec![
                SelectionNode::Field(FieldSelection {
                    name:       "__typename".to_string(),
                    alias:      None,
                    arguments:  Vec::new(),
                    selections: Vec::new(),
                }),
                SelectionNode::InlineFragment {
                    on:         Some("User".to_string()),
                    selections: vec![SelectionNode::Field(FieldSelection {
                        name:       "name".to_string(),
                        alias:      None,
                        arguments:  Vec::new(),
                        selections: Vec::new(),
                    })],
                },
            ],
        };
        let text = field.selection_text(&serde_json::Map::new());
        assert_eq!(text, "{__typename ... on User {name}}");
    }
}
