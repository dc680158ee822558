//! HTTP subgraph resolution: retries, idempotent replay, `@requires` and
//! `@provides` semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fraiseql_core::capability::CapabilityManifest;
use fraiseql_core::compiler;
use fraiseql_core::db::DatabaseAdapter;
use fraiseql_core::federation::{EntityResolver, SubgraphClientConfig};
use fraiseql_core::ir::SchemaIr;
use fraiseql_core::runtime::RequestContext;
use fraiseql_core::schema::CompiledSchema;
use fraiseql_error::SanitizationLevel;
use fraiseql_test_utils::MockAdapter;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn review_schema(subgraph_url: &str) -> CompiledSchema {
    let ir = SchemaIr::from_json(&format!(
        r#"{{
            "types": [{{
                "name": "Review",
                "fields": [
                    {{"name": "id", "type": {{"scalar": "id"}}}},
                    {{"name": "rating", "type": {{"scalar": "int"}}, "nullable": true}}
                ],
                "federation": {{
                    "keys": [["id"]],
                    "extends": true,
                    "strategy": {{"kind": "http_subgraph", "url": "{subgraph_url}"}}
                }}
            }}]
        }}"#
    ))
    .expect("IR parses");
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    compiler::compile(&ir, &manifest, "postgres").expect("compiles")
}

fn fast_retries() -> SubgraphClientConfig {
    SubgraphClientConfig {
        request_timeout: Duration::from_secs(2),
        max_attempts: 3,
        base_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        breaker_threshold: 10,
        breaker_cooldown: Duration::from_secs(30),
    }
}

fn resolver(schema: CompiledSchema, config: SubgraphClientConfig) -> EntityResolver {
    let local: Arc<dyn DatabaseAdapter> = Arc::new(MockAdapter::new());
    EntityResolver::new(
        Arc::new(schema),
        local,
        HashMap::new(),
        config,
        SanitizationLevel::Internal,
    )
}

#[tokio::test]
async fn subgraph_batch_resolves_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_entities": [
                {"__typename": "Review", "id": "r1", "rating": 5},
                null
            ]}
        })))
        .mount(&server)
        .await;

    let resolver = resolver(review_schema(&server.uri()), fast_retries());
    let ctx = RequestContext::new();
    let reps = vec![
        json!({"__typename": "Review", "id": "r1"}),
        json!({"__typename": "Review", "id": "r404"}),
    ];

    let resolved = resolver.resolve(&reps, "{__typename id rating}", &ctx).await;

    assert!(resolved.entities[0].0.is_some());
    assert!(resolved.entities[1].0.is_none());
    assert_eq!(resolved.errors.len(), 1);

    // One batched request carries both representations.
    let requests = server.received_requests().await.expect("recorded");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().expect("json body");
    assert_eq!(
        body["variables"]["representations"].as_array().expect("array").len(),
        2
    );
    assert!(body["query"].as_str().expect("query").contains("_entities"));
}

/// Property: retries replay the identical read-only request.
#[tokio::test]
async fn retries_replay_identical_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_entities": [{"__typename": "Review", "id": "r1"}]}
        })))
        .mount(&server)
        .await;

    let resolver = resolver(review_schema(&server.uri()), fast_retries());
    let ctx = RequestContext::new();
    let reps = vec![json!({"__typename": "Review", "id": "r1"})];

    let resolved = resolver.resolve(&reps, "{__typename id}", &ctx).await;
    assert!(resolved.entities[0].0.is_some(), "third attempt succeeds");

    let requests = server.received_requests().await.expect("recorded");
    assert_eq!(requests.len(), 3, "two failures plus the success");
    let first = &requests[0].body;
    assert!(
        requests.iter().all(|r| &r.body == first),
        "every retry must send the identical body"
    );
}

#[tokio::test]
async fn exhausted_budget_nulls_all_positions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let resolver = resolver(review_schema(&server.uri()), fast_retries());
    let ctx = RequestContext::new();
    let reps = vec![
        json!({"__typename": "Review", "id": "r1"}),
        json!({"__typename": "Review", "id": "r2"}),
    ];

    let resolved = resolver.resolve(&reps, "{__typename id}", &ctx).await;
    assert!(resolved.entities.iter().all(|(row, _)| row.is_none()));
    assert_eq!(resolved.errors.len(), 2);
    assert_eq!(resolved.errors[0].extensions.code, "SUBGRAPH_UNREACHABLE");
}

/// `@provides` short-circuit: representations already carrying the provided
/// fields never hit the subgraph.
#[tokio::test]
async fn provides_short_circuits_fetch() {
    let server = MockServer::start().await;

    let ir = SchemaIr::from_json(&format!(
        r#"{{
            "types": [{{
                "name": "Review",
                "fields": [
                    {{"name": "id", "type": {{"scalar": "id"}}}},
                    {{"name": "rating", "type": {{"scalar": "int"}}, "nullable": true}}
                ],
                "federation": {{
                    "keys": [["id"]],
                    "extends": true,
                    "provides": [{{"field": "id", "provided": ["rating"]}}],
                    "strategy": {{"kind": "http_subgraph", "url": "{}"}}
                }}
            }}]
        }}"#,
        server.uri()
    ))
    .expect("IR parses");
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let schema = compiler::compile(&ir, &manifest, "postgres").expect("compiles");

    let resolver = resolver(schema, fast_retries());
    let ctx = RequestContext::new();
    let reps = vec![json!({"__typename": "Review", "id": "r1", "rating": 4})];

    let resolved = resolver.resolve(&reps, "{__typename rating}", &ctx).await;
    let row = resolved.entities[0].0.as_ref().expect("resolved locally");
    let value: serde_json::Value =
        serde_json::from_str(std::str::from_utf8(row.as_bytes()).expect("utf8")).expect("json");
    assert_eq!(value["rating"], 4);

    let requests = server.received_requests().await.expect("recorded");
    assert!(requests.is_empty(), "no subgraph fetch when @provides covers the fields");
}

/// `@requires` enforcement: missing dependencies fail only their position.
#[tokio::test]
async fn requires_dependency_missing_is_positional() {
    let ir = SchemaIr::from_json(
        r#"{
            "types": [{
                "name": "Shipment",
                "fields": [
                    {"name": "id", "type": {"scalar": "id"}},
                    {"name": "cost", "type": {"scalar": "float"}, "nullable": true},
                    {"name": "weight", "type": {"scalar": "float"}, "nullable": true}
                ],
                "bound_source": {"view": "v_shipment", "primary_key": ["id"]},
                "federation": {
                    "keys": [["id"]],
                    "requires": [{"field": "cost", "dependencies": ["weight"]}]
                }
            }]
        }"#,
    )
    .expect("IR parses");
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    let schema = compiler::compile(&ir, &manifest, "postgres").expect("compiles");

    let adapter = Arc::new(MockAdapter::new());
    adapter.respond("jsonb_array_elements", vec![r#"{"id": "s1", "cost": 10.0}"#]);

    let resolver = EntityResolver::new(
        Arc::new(schema),
        Arc::clone(&adapter) as Arc<dyn DatabaseAdapter>,
        HashMap::new(),
        fast_retries(),
        SanitizationLevel::Internal,
    );
    let ctx = RequestContext::new();
    let reps = vec![
        json!({"__typename": "Shipment", "id": "s1", "weight": 12.5}),
        json!({"__typename": "Shipment", "id": "s2"}),
    ];

    let resolved = resolver.resolve(&reps, "{__typename cost}", &ctx).await;

    assert!(resolved.entities[0].0.is_some(), "complete representation resolves");
    assert!(resolved.entities[1].0.is_none(), "missing @requires dependency fails");
    assert_eq!(resolved.errors.len(), 1);
    assert_eq!(resolved.errors[0].extensions.code, "REQUIRES_DEPENDENCY_MISSING");
}
