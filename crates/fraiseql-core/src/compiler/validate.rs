//! Phase 1: structural IR validation.

use std::collections::{HashMap, HashSet};

use fraiseql_error::{CompileError, Result};

use crate::ir::{MutationKind, SchemaIr, TypeDef};

/// Validate the IR document before any generation runs.
///
/// Checks, in order:
/// - object field references resolve to defined types;
/// - query/mutation return types resolve;
/// - every bound type's key fields exist;
/// - every type is either view-bound or carries a federation strategy;
/// - `@extends` is combined with `@key`; `@external` only on extended types;
/// - `@requires` / `@provides` dependencies exist on the type;
/// - no cyclic `@requires` chains across extended types;
/// - mutations only target bound types.
pub fn validate_ir(ir: &SchemaIr) -> Result<()> {
    let type_names: HashSet<&str> = ir.types.iter().map(|t| t.name.as_str()).collect();

    for type_def in &ir.types {
        validate_field_references(type_def, &type_names)?;
        validate_binding(type_def)?;
        validate_federation(type_def)?;
    }

    validate_requires_cycles(ir)?;

    for query in &ir.queries {
        if !type_names.contains(query.return_type.as_str()) {
            return Err(CompileError::UnknownType {
                type_name: query.return_type.clone(),
            }
            .into());
        }
    }

    for mutation in &ir.mutations {
        let Some(target) = ir.find_type(&mutation.return_type) else {
            return Err(CompileError::UnknownType {
                type_name: mutation.return_type.clone(),
            }
            .into());
        };
        // Table-touching mutations need a mutable backing table, which only
        // bound types have.
        if target.bound_source.is_none() && !matches!(mutation.operation, MutationKind::Function { .. })
        {
            return Err(CompileError::ViewBindingMissing {
                type_name: mutation.return_type.clone(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_field_references(type_def: &TypeDef, type_names: &HashSet<&str>) -> Result<()> {
    for field in &type_def.fields {
        if let Some(referenced) = field.semantic_type.object_name() {
            if !type_names.contains(referenced) {
                return Err(CompileError::UnknownType {
                    type_name: referenced.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn validate_binding(type_def: &TypeDef) -> Result<()> {
    if let Some(source) = &type_def.bound_source {
        // Key fields must exist on the type.
        for key in &source.primary_key {
            if !type_def.fields.iter().any(|f| f.column_name() == key) {
                return Err(CompileError::InvalidFederation {
                    type_name: type_def.name.clone(),
                    message:   format!("primary key column '{key}' is not a field"),
                }
                .into());
            }
        }
        return Ok(());
    }

    // Unbound types must resolve through federation.
    let has_strategy = type_def
        .federation
        .as_ref()
        .is_some_and(|f| f.strategy.is_some() || f.extends);
    if !has_strategy {
        return Err(CompileError::ViewBindingMissing {
            type_name: type_def.name.clone(),
        }
        .into());
    }
    Ok(())
}

fn validate_federation(type_def: &TypeDef) -> Result<()> {
    let Some(federation) = &type_def.federation else {
        return Ok(());
    };

    let field_exists =
        |name: &str| type_def.fields.iter().any(|f| f.name == name || f.column_name() == name);

    if federation.extends && federation.keys.is_empty() {
        return Err(CompileError::InvalidFederation {
            type_name: type_def.name.clone(),
            message:   "@extends requires at least one @key".to_string(),
        }
        .into());
    }

    if !federation.external_fields.is_empty() && !federation.extends {
        return Err(CompileError::InvalidFederation {
            type_name: type_def.name.clone(),
            message:   "@external fields are only valid on @extends types".to_string(),
        }
        .into());
    }

    for key_set in &federation.keys {
        for key in key_set {
            if !field_exists(key) && !federation.external_fields.contains(key) {
                return Err(CompileError::InvalidFederation {
                    type_name: type_def.name.clone(),
                    message:   format!("@key field '{key}' does not exist"),
                }
                .into());
            }
        }
    }

    for requires in &federation.requires {
        if !field_exists(&requires.field) {
            return Err(CompileError::InvalidFederation {
                type_name: type_def.name.clone(),
                message:   format!("@requires target field '{}' does not exist", requires.field),
            }
            .into());
        }
        for dep in &requires.dependencies {
            if !field_exists(dep) && !federation.external_fields.contains(dep) {
                return Err(CompileError::InvalidFederation {
                    type_name: type_def.name.clone(),
                    message:   format!(
                        "@requires dependency '{dep}' does not exist on the authoritative type"
                    ),
                }
                .into());
            }
        }
    }

    for provides in &federation.provides {
        for provided in &provides.provided {
            if !field_exists(provided) {
                return Err(CompileError::InvalidFederation {
                    type_name: type_def.name.clone(),
                    message:   format!("@provides field '{provided}' does not exist"),
                }
                .into());
            }
        }
    }

    Ok(())
}

/// Reject `@requires` dependency cycles across extended types.
///
/// A cycle means two extended types each need the other resolved first; no
/// dependency ordering exists and query planning would not terminate.
fn validate_requires_cycles(ir: &SchemaIr) -> Result<()> {
    // Edges: extended type -> types owning its @requires dependency fields.
    let mut edges: HashMap<&str, HashSet<&str>> = HashMap::new();
    for type_def in &ir.types {
        let Some(federation) = &type_def.federation else {
            continue;
        };
        if !federation.extends {
            continue;
        }
        for requires in &federation.requires {
            for dep in &requires.dependencies {
                for other in &ir.types {
                    if other.name != type_def.name
                        && other.federation.as_ref().is_some_and(|f| f.extends)
                        && other.fields.iter().any(|f| f.name == *dep)
                    {
                        edges
                            .entry(type_def.name.as_str())
                            .or_default()
                            .insert(other.name.as_str());
                    }
                }
            }
        }
    }

    // DFS cycle detection over the small extends graph.
    let mut visiting: HashSet<&str> = HashSet::new();
    let mut done: HashSet<&str> = HashSet::new();
    for node in edges.keys().copied().collect::<Vec<_>>() {
        visit(node, &edges, &mut visiting, &mut done)?;
    }
    Ok(())
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, HashSet<&'a str>>,
    visiting: &mut HashSet<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Result<()> {
    if done.contains(node) {
        return Ok(());
    }
    if !visiting.insert(node) {
        return Err(CompileError::InvalidFederation {
            type_name: node.to_string(),
            message:   "cyclic @extends dependency chain".to_string(),
        }
        .into());
    }
    if let Some(next) = edges.get(node) {
        for n in next {
            visit(n, edges, visiting, done)?;
        }
    }
    visiting.remove(node);
    done.insert(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraiseql_error::FraiseQLError;

    fn ir(json: &str) -> SchemaIr {
        SchemaIr::from_json(json).expect("fixture parses")
    }

    #[test]
    fn test_unknown_return_type_rejected() {
        let doc = ir(r#"{
            "types": [],
            "queries": [{"name": "ghosts", "return_type": "Ghost", "returns_list": true}]
        }"#);
        let err = validate_ir(&doc).expect_err("rejects");
        assert!(matches!(
            err,
            FraiseQLError::Compile(CompileError::UnknownType { type_name }) if type_name == "Ghost"
        ));
    }

    #[test]
    fn test_unbound_type_without_strategy_rejected() {
        let doc = ir(r#"{
            "types": [{"name": "Orphan", "fields": [
                {"name": "id", "type": {"scalar": "id"}}
            ]}]
        }"#);
        let err = validate_ir(&doc).expect_err("rejects");
        assert!(matches!(
            err,
            FraiseQLError::Compile(CompileError::ViewBindingMissing { .. })
        ));
    }

    #[test]
    fn test_external_requires_extends() {
        let doc = ir(r#"{
            "types": [{
                "name": "User",
                "fields": [{"name": "id", "type": {"scalar": "id"}}],
                "bound_source": {"view": "v_user", "primary_key": ["id"]},
                "federation": {"keys": [["id"]], "external_fields": ["email"]}
            }]
        }"#);
        let err = validate_ir(&doc).expect_err("rejects");
        assert!(matches!(
            err,
            FraiseQLError::Compile(CompileError::InvalidFederation { .. })
        ));
    }

    #[test]
    fn test_extends_without_key_rejected() {
        let doc = ir(r#"{
            "types": [{
                "name": "Review",
                "fields": [{"name": "id", "type": {"scalar": "id"}}],
                "federation": {"extends": true}
            }]
        }"#);
        assert!(validate_ir(&doc).is_err());
    }

    #[test]
    fn test_requires_dependency_must_exist() {
        let doc = ir(r#"{
            "types": [{
                "name": "User",
                "fields": [{"name": "id", "type": {"scalar": "id"}}],
                "bound_source": {"view": "v_user", "primary_key": ["id"]},
                "federation": {
                    "keys": [["id"]],
                    "requires": [{"field": "id", "dependencies": ["shipping_weight"]}]
                }
            }]
        }"#);
        let err = validate_ir(&doc).expect_err("rejects");
        assert!(err.to_string().contains("shipping_weight"));
    }

    #[test]
    fn test_valid_federated_schema_passes() {
        let doc = ir(r#"{
            "types": [{
                "name": "User",
                "fields": [
                    {"name": "id", "type": {"scalar": "id"}},
                    {"name": "email", "type": {"scalar": "string"}}
                ],
                "bound_source": {"view": "v_user", "primary_key": ["id"]},
                "federation": {"keys": [["id"]], "shareable_fields": ["email"]}
            }],
            "queries": [{"name": "users", "return_type": "User", "returns_list": true}]
        }"#);
        assert!(validate_ir(&doc).is_ok());
    }
}
