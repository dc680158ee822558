//! Multi-batch Arrow projection serving (order + items).

use std::sync::Arc;

use arrow::datatypes::{DataType, TimeUnit};
use fraiseql_arrow::ArrowPlaneExecutor;
use fraiseql_core::capability::CapabilityManifest;
use fraiseql_core::compiler;
use fraiseql_core::db::DatabaseAdapter;
use fraiseql_core::runtime::RequestContext;
use fraiseql_core::schema::CompiledSchema;
use fraiseql_test_utils::{order_projection_ir, MockAdapter};

fn compiled() -> CompiledSchema {
    let manifest = CapabilityManifest::load("postgres").expect("manifest");
    compiler::compile(&order_projection_ir(), &manifest, "postgres").expect("compiles")
}

fn seeded_adapter() -> Arc<MockAdapter> {
    let adapter = Arc::new(MockAdapter::new());
    adapter.respond(
        "va_order\"",
        vec![
            r#"{"id": "o1", "customer_id": "c1", "total": "149.50", "created_at": "2026-02-01T09:30:00Z"}"#,
        ],
    );
    adapter.respond(
        "va_order_item",
        vec![
            r#"{"id": "i1", "order_id": "o1", "product": "widget", "quantity": 2}"#,
            r#"{"id": "i2", "order_id": "o1", "product": "gadget", "quantity": 1}"#,
            r#"{"id": "i3", "order_id": "o1", "product": "sprocket", "quantity": 5}"#,
        ],
    );
    adapter
}

#[tokio::test]
async fn projection_yields_two_typed_batches() {
    let schema = compiled();
    let projection = schema
        .arrow_projection("order_with_items")
        .expect("projection compiled");
    let adapter = seeded_adapter();
    let executor = ArrowPlaneExecutor::new(Arc::clone(&adapter) as Arc<dyn DatabaseAdapter>);

    let ctx = RequestContext::new();
    let batches = executor.execute(projection, &ctx).await.expect("executes");

    assert_eq!(batches.len(), 2, "one record batch per declared batch");

    // Batch 0: orders.
    let orders = &batches[0];
    assert_eq!(orders.num_rows(), 1);
    let schema0 = orders.schema();
    assert_eq!(schema0.field(0).name(), "id");
    assert_eq!(schema0.field(0).data_type(), &DataType::Utf8);
    assert_eq!(schema0.field(1).name(), "customer_id");
    assert_eq!(schema0.field(2).data_type(), &DataType::Decimal128(18, 2));
    assert_eq!(
        schema0.field(3).data_type(),
        &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
    );

    // Batch 1: items with the FK column.
    let items = &batches[1];
    assert_eq!(items.num_rows(), 3);
    let schema1 = items.schema();
    assert!(schema1.field_with_name("order_id").is_ok(), "FK column present");
}

#[tokio::test]
async fn stream_encoding_roundtrips() {
    let schema = compiled();
    let projection = schema
        .arrow_projection("order_with_items")
        .expect("projection compiled");
    let adapter = seeded_adapter();
    let executor = ArrowPlaneExecutor::new(Arc::clone(&adapter) as Arc<dyn DatabaseAdapter>);

    let ctx = RequestContext::new();
    let bytes = executor
        .execute_stream(projection, &ctx)
        .await
        .expect("encodes");
    assert!(!bytes.is_empty());

    // Two EOS-terminated segments, declaration order.
    let mut cursor = std::io::Cursor::new(bytes);
    let mut row_counts = Vec::new();
    for _ in 0..2 {
        let reader = arrow::ipc::reader::StreamReader::try_new(&mut cursor, None)
            .expect("segment readable");
        for batch in reader {
            row_counts.push(batch.expect("batch decodes").num_rows());
        }
    }
    assert_eq!(row_counts, vec![1, 3]);
}

#[tokio::test]
async fn malformed_batch_row_fails_cleanly() {
    let schema = compiled();
    let projection = schema
        .arrow_projection("order_with_items")
        .expect("projection compiled");

    let adapter = Arc::new(MockAdapter::new());
    adapter.respond(
        "va_order\"",
        vec![r#"{"id": "o1", "customer_id": "c1", "total": "not-a-number", "created_at": "2026-02-01T09:30:00Z"}"#],
    );
    let executor = ArrowPlaneExecutor::new(Arc::clone(&adapter) as Arc<dyn DatabaseAdapter>);

    let ctx = RequestContext::new();
    let err = executor
        .execute(projection, &ctx)
        .await
        .expect_err("rejects non-decimal total");
    assert!(err.to_string().contains("total"));
}
