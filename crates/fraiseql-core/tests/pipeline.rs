//! End-to-end pipeline scenarios over the mock adapter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fraiseql_core::apq::{sha256_hex, ApqCache};
use fraiseql_core::federation::EntityResolver;
use fraiseql_core::runtime::{Executor, GraphQLRequest, RequestContext};
use fraiseql_core::FraiseQLConfig;
use fraiseql_error::SanitizationLevel;
use fraiseql_test_utils::{compiled_user_schema, MockAdapter};
use serde_json::{json, Value};

fn test_config() -> FraiseQLConfig {
    FraiseQLConfig::from_toml(
        r#"
        target = "postgres"
        database_url = "postgres://unused/test"
        schema_path = "unused.compiled.json"
    "#,
    )
    .expect("test config parses")
}

struct Pipeline {
    executor: Executor,
    adapter:  Arc<MockAdapter>,
}

fn pipeline() -> Pipeline {
    let schema = Arc::new(compiled_user_schema());
    let adapter = Arc::new(MockAdapter::new());
    let apq = Arc::new(ApqCache::new(Duration::from_secs(60), schema.schema_hash.clone()));
    let config = test_config();

    let resolver = Arc::new(EntityResolver::new(
        Arc::clone(&schema),
        Arc::clone(&adapter) as Arc<dyn fraiseql_core::db::DatabaseAdapter>,
        HashMap::new(),
        config.subgraph_client_config(),
        SanitizationLevel::Internal,
    ));

    let executor = Executor::new(
        schema,
        Arc::clone(&adapter) as Arc<dyn fraiseql_core::db::DatabaseAdapter>,
        apq,
        Some(resolver),
        &config,
    )
    .expect("executor builds");

    Pipeline { executor, adapter }
}

fn query_request(query: &str) -> GraphQLRequest {
    GraphQLRequest {
        query: Some(query.to_string()),
        ..Default::default()
    }
}

async fn run(pipeline: &Pipeline, request: &GraphQLRequest) -> Value {
    let ctx = RequestContext::new();
    let bytes = pipeline
        .executor
        .execute(request, &ctx)
        .await
        .expect("request executes");
    serde_json::from_slice(bytes.as_slice()).expect("response is valid JSON")
}

/// Scenario S1: list query over fixture rows.
#[tokio::test]
async fn json_list_with_typename_and_camel_case() {
    let pipeline = pipeline();
    pipeline.adapter.respond(
        "FROM \"v_user\"",
        vec![
            r#"{"id": "u1", "first_name": "Alice"}"#,
            r#"{"id": "u2", "first_name": "Bob"}"#,
        ],
    );

    let response = run(&pipeline, &query_request("{ users(first: 2) { id firstName } }")).await;

    assert_eq!(
        response["data"]["users"],
        json!([
            {"__typename": "User", "id": "u1", "firstName": "Alice"},
            {"__typename": "User", "id": "u2", "firstName": "Bob"}
        ])
    );
    assert!(response.get("errors").is_none());
}

#[tokio::test]
async fn empty_list_is_framed() {
    let pipeline = pipeline();
    let response = run(&pipeline, &query_request("{ users { id } }")).await;
    assert_eq!(response["data"]["users"], json!([]));
}

#[tokio::test]
async fn missing_single_is_framed_null() {
    let pipeline = pipeline();
    let response = run(&pipeline, &query_request(r#"{ user(id: "u404") { id } }"#)).await;
    assert_eq!(response["data"]["user"], Value::Null);
}

/// Scenario S4: keyset pagination over fixture u1..u5, no overlap, no gap.
#[tokio::test]
async fn keyset_pagination_roundtrip() {
    let pipeline = pipeline();
    let rows = [
        r#"{"id": "u1", "first_name": "A"}"#,
        r#"{"id": "u2", "first_name": "B"}"#,
        r#"{"id": "u3", "first_name": "C"}"#,
        r#"{"id": "u4", "first_name": "D"}"#,
        r#"{"id": "u5", "first_name": "E"}"#,
    ];

    // Page queries are distinguished by the keyset predicate: the first
    // page renders it as TRUE, later pages compare against the cursor.
    pipeline
        .adapter
        .respond_once("'id' > $", vec![rows[2], rows[3], rows[4]]);
    pipeline.adapter.respond_once("'id' > $", vec![rows[4]]);
    pipeline
        .adapter
        .respond("FROM \"v_user\"", vec![rows[0], rows[1], rows[2]]);

    // Page 1.
    let response = run(&pipeline, &query_request("{ users(first: 2) { id } }")).await;
    let ids: Vec<&str> = response["data"]["users"]
        .as_array()
        .expect("array")
        .iter()
        .map(|u| u["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["u1", "u2"]);
    assert_eq!(response["extensions"]["pageInfo"]["hasNextPage"], true);
    let cursor1 = response["extensions"]["pageInfo"]["endCursor"]
        .as_str()
        .expect("cursor present")
        .to_string();

    // Page 2 resumes strictly after u2.
    let request = query_request(&format!("{{ users(first: 2, after: \"{cursor1}\") {{ id }} }}"));
    let response = run(&pipeline, &request).await;
    let ids: Vec<&str> = response["data"]["users"]
        .as_array()
        .expect("array")
        .iter()
        .map(|u| u["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["u3", "u4"], "no overlap, no gap");
    assert_eq!(response["extensions"]["pageInfo"]["hasNextPage"], true);
    let cursor2 = response["extensions"]["pageInfo"]["endCursor"]
        .as_str()
        .expect("cursor present")
        .to_string();

    // The keyset value of the previous page's last row is bound.
    let executed = pipeline.adapter.executed();
    let (_, page2_params) = &executed[1];
    assert!(page2_params.contains(&json!("u2")));

    // Page 3 drains the fixture.
    let request = query_request(&format!("{{ users(first: 2, after: \"{cursor2}\") {{ id }} }}"));
    let response = run(&pipeline, &request).await;
    let ids: Vec<&str> = response["data"]["users"]
        .as_array()
        .expect("array")
        .iter()
        .map(|u| u["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["u5"]);
    assert_eq!(response["extensions"]["pageInfo"]["hasNextPage"], false);
}

/// Scenario S3: `_entities` batch with one unresolvable position.
#[tokio::test]
async fn entities_preserve_order_with_null_on_failure() {
    let pipeline = pipeline();
    // The ordered batch template returns the literal 'null' for u404.
    pipeline.adapter.respond(
        "jsonb_array_elements",
        vec![r#"{"id": "u1", "first_name": "Alice"}"#, "null"],
    );

    let request = GraphQLRequest {
        query: Some(
            "query($representations: [_Any!]!) { _entities(representations: $representations) { __typename id } }"
                .to_string(),
        ),
        variables: Some(
            json!({
                "representations": [
                    {"__typename": "User", "id": "u1"},
                    {"__typename": "User", "id": "u404"}
                ]
            })
            .as_object()
            .expect("object")
            .clone(),
        ),
        ..Default::default()
    };
    let response = run(&pipeline, &request).await;

    let entities = response["data"]["_entities"].as_array().expect("array");
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["id"], "u1");
    assert_eq!(entities[0]["__typename"], "User");
    assert_eq!(entities[1], Value::Null);

    let errors = response["errors"].as_array().expect("errors present");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], json!(["_entities", 1]));
}

/// APQ protocol: miss, register, hit.
#[tokio::test]
async fn apq_miss_register_hit() {
    let pipeline = pipeline();
    pipeline
        .adapter
        .respond("FROM \"v_user\"", vec![r#"{"id": "u1", "first_name": "A"}"#]);

    let query = "{ users { id } }";
    let hash = sha256_hex(query);
    let hash_only = GraphQLRequest {
        extensions: Some(serde_json::from_value(json!({
            "persistedQuery": {"version": 1, "sha256Hash": hash}
        })).expect("extensions parse")),
        ..Default::default()
    };

    // Miss: the client must retry with the full text.
    let ctx = RequestContext::new();
    let err = pipeline
        .executor
        .execute(&hash_only, &ctx)
        .await
        .expect_err("unknown hash");
    assert_eq!(err.error_code(), "PERSISTED_QUERY_NOT_FOUND");

    // Register: query + hash.
    let register = GraphQLRequest {
        query: Some(query.to_string()),
        ..hash_only.clone()
    };
    let response = run(&pipeline, &register).await;
    assert!(response["data"]["users"].is_array());

    // Hit: hash alone now resolves.
    let response = run(&pipeline, &hash_only).await;
    assert!(response["data"]["users"].is_array());
}

#[tokio::test]
async fn apq_rejects_hash_mismatch() {
    let pipeline = pipeline();
    let request = GraphQLRequest {
        query: Some("{ users { id } }".to_string()),
        extensions: Some(serde_json::from_value(json!({
            "persistedQuery": {"version": 1, "sha256Hash": "0badc0de"}
        })).expect("extensions parse")),
        ..Default::default()
    };
    let ctx = RequestContext::new();
    let err = pipeline
        .executor
        .execute(&request, &ctx)
        .await
        .expect_err("mismatch rejected");
    assert_eq!(err.error_code(), "GRAPHQL_PARSE_FAILED");
}

/// Scenario S6: cancellation mid-query leaks nothing.
#[tokio::test]
async fn cancellation_releases_connections() {
    let pipeline = pipeline();
    pipeline.adapter.set_delay(Duration::from_secs(5));
    pipeline
        .adapter
        .respond("FROM \"v_user\"", vec![r#"{"id": "u1", "first_name": "A"}"#]);

    let ctx = RequestContext::new();
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let request = query_request("{ users { id } }");
    let bytes = pipeline
        .executor
        .execute(&request, &ctx)
        .await
        .expect("partial response with field error");
    let response: Value = serde_json::from_slice(bytes.as_slice()).expect("valid JSON");

    assert_eq!(response["data"]["users"], Value::Null);
    assert_eq!(response["errors"][0]["extensions"]["code"], "CANCELLED");
    assert_eq!(
        pipeline.adapter.open_connections(),
        0,
        "no in-flight queries may remain after cancellation"
    );
}

/// Mutations call their stored procedure and return the function's row.
#[tokio::test]
async fn function_mutation_returns_row() {
    let pipeline = pipeline();
    pipeline.adapter.respond(
        "fn_create_user",
        vec![r#"{"id": "u9", "first_name": "New"}"#],
    );

    let request = GraphQLRequest {
        query: Some(
            r#"mutation { createUser(input: {firstName: "New"}) { id firstName } }"#.to_string(),
        ),
        ..Default::default()
    };
    let response = run(&pipeline, &request).await;
    assert_eq!(response["data"]["createUser"]["id"], "u9");
    assert_eq!(response["data"]["createUser"]["__typename"], "User");

    // The stored procedure receives storage-side (snake_case) keys.
    let executed = pipeline.adapter.executed();
    let (_, params) = &executed[0];
    assert_eq!(params[0]["first_name"], "New");
    assert!(params[0].get("firstName").is_none());
}

/// Calling a mutation template as a query is a protocol error at the field.
#[tokio::test]
async fn mutation_called_as_query_rejected() {
    let pipeline = pipeline();
    let response = run(
        &pipeline,
        &query_request(r#"{ createUser(input: {firstName: "x"}) { id } }"#),
    )
    .await;
    assert_eq!(response["data"]["createUser"], Value::Null);
    assert_eq!(response["errors"][0]["extensions"]["code"], "GRAPHQL_PARSE_FAILED");
}

/// Filters render through the compiled operator fragments only.
#[tokio::test]
async fn where_filter_binds_parameters() {
    let pipeline = pipeline();
    pipeline
        .adapter
        .respond("ILIKE", vec![r#"{"id": "u1", "first_name": "Alice"}"#]);

    let response = run(
        &pipeline,
        &query_request(r#"{ users(where: {email: {_ilike: "%corp%"}}) { id } }"#),
    )
    .await;
    assert_eq!(response["data"]["users"][0]["id"], "u1");

    let executed = pipeline.adapter.executed();
    let (sql, params) = &executed[0];
    assert!(sql.contains("\"data\"->>'email' ILIKE"));
    assert!(params.contains(&json!("%corp%")));
}

/// Unknown filter operators fail the field without touching the database.
#[tokio::test]
async fn unknown_operator_never_reaches_database() {
    let pipeline = pipeline();
    let response = run(
        &pipeline,
        &query_request(r#"{ users(where: {email: {_evil: "x"}}) { id } }"#),
    )
    .await;
    assert_eq!(response["data"]["users"], Value::Null);
    assert!(pipeline.adapter.executed().is_empty());
}
