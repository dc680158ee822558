//! Compile determinism and capability soundness.

use fraiseql_core::capability::CapabilityManifest;
use fraiseql_core::compiler;
use fraiseql_error::{CompileError, FraiseQLError};
use fraiseql_test_utils::{order_projection_ir, user_schema_ir};

#[test]
fn compiles_are_byte_identical() {
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let ir = user_schema_ir();

    let first = compiler::compile(&ir, &manifest, "postgres").expect("compiles");
    let second = compiler::compile(&ir, &manifest, "postgres").expect("compiles");

    assert_eq!(first.schema_hash, second.schema_hash);
    assert_eq!(
        serde_json::to_vec(&first).expect("serializes"),
        serde_json::to_vec(&second).expect("serializes"),
        "artifacts must be byte-identical"
    );
}

#[test]
fn hash_is_stable_under_ir_reordering() {
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let ir = user_schema_ir();

    let mut reordered = ir.clone();
    reordered.queries.reverse();
    reordered.mutations.reverse();
    for type_def in &mut reordered.types {
        type_def.fields.reverse();
    }

    let original = compiler::compile(&ir, &manifest, "postgres").expect("compiles");
    let shuffled = compiler::compile(&reordered, &manifest, "postgres").expect("compiles");
    assert_eq!(original.schema_hash, shuffled.schema_hash);
}

#[test]
fn hash_differs_across_targets() {
    let ir = user_schema_ir();
    let pg = compiler::compile(&ir, &CapabilityManifest::load("postgres").expect("pg"), "postgres")
        .expect("compiles");
    let lite = compiler::compile(&ir, &CapabilityManifest::load("sqlite").expect("lite"), "sqlite")
        .expect("compiles");
    assert_ne!(pg.schema_hash, lite.schema_hash);
}

/// Capability soundness, both directions: every exposed operator exists in
/// the manifest for its family, and every manifest operator for a bound
/// field's family is exposed.
#[test]
fn where_inputs_match_manifest_exactly() {
    for target in ["postgres", "mysql", "sqlite"] {
        let manifest = CapabilityManifest::load(target).expect("manifest");
        let compiled =
            compiler::compile(&user_schema_ir(), &manifest, target).expect("compiles");

        for where_input in &compiled.where_inputs {
            for field in &where_input.fields {
                let manifest_ops: Vec<&str> = manifest
                    .operators_for(field.family)
                    .iter()
                    .map(|op| op.name.as_str())
                    .collect();
                let exposed: Vec<&str> =
                    field.operators.iter().map(|op| op.name.as_str()).collect();
                assert_eq!(
                    exposed, manifest_ops,
                    "{target}: field '{}' must expose exactly the manifest set",
                    field.graphql_name
                );
            }
        }
    }
}

/// Scenario S2: a filter requiring `_regex` cannot compile for mysql.
#[test]
fn regex_filter_rejected_for_mysql_with_suggestions() {
    let mut ir = user_schema_ir();
    let user = &mut ir.types[0];
    let email = user
        .fields
        .iter_mut()
        .find(|f| f.name == "email")
        .expect("email field");
    email.filters = vec!["_regex".to_string()];

    let manifest = CapabilityManifest::load("mysql").expect("manifest");
    let err = compiler::compile(&ir, &manifest, "mysql").expect_err("rejects");

    match err {
        FraiseQLError::Compile(CompileError::UnsupportedOperator {
            target,
            scalar_family,
            operator,
            suggestions,
        }) => {
            assert_eq!(target, "mysql");
            assert_eq!(scalar_family, "string");
            assert_eq!(operator, "_regex");
            assert_eq!(suggestions, vec!["_eq", "_neq", "_like"]);
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn arrow_projection_survives_compilation() {
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let compiled =
        compiler::compile(&order_projection_ir(), &manifest, "postgres").expect("compiles");

    let projection = compiled
        .arrow_projection("order_with_items")
        .expect("projection compiled");
    assert_eq!(projection.batches.len(), 2);
    assert_eq!(projection.batches[0].name, "orders");
    assert_eq!(projection.batches[1].name, "items");
    assert!(projection.batches[0].select_sql.contains("va_order"));
}

#[test]
fn artifact_roundtrips_through_disk() {
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let compiled = compiler::compile(&user_schema_ir(), &manifest, "postgres").expect("compiles");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("schema.compiled.json");
    compiled.to_file(&path).expect("writes");

    let loaded = fraiseql_core::schema::CompiledSchema::from_file(&path).expect("loads");
    assert_eq!(loaded, compiled);
}

#[test]
fn tampered_artifact_rejected_on_load() {
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let compiled = compiler::compile(&user_schema_ir(), &manifest, "postgres").expect("compiles");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("schema.compiled.json");
    compiled.to_file(&path).expect("writes");

    let tampered = std::fs::read_to_string(&path)
        .expect("reads")
        .replace("v_user", "v_evil");
    std::fs::write(&path, tampered).expect("writes");

    assert!(fraiseql_core::schema::CompiledSchema::from_file(&path).is_err());
}
