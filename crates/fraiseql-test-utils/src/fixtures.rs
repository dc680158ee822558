//! Shared schema fixtures.

use fraiseql_core::capability::CapabilityManifest;
use fraiseql_core::compiler;
use fraiseql_core::ir::SchemaIr;
use fraiseql_core::schema::CompiledSchema;

/// A `User` schema bound to `v_user` with federation keys and list/single
/// queries. The shape every pipeline test starts from.
#[must_use]
pub fn user_schema_ir() -> SchemaIr {
    SchemaIr::from_json(
        r#"{
            "types": [{
                "name": "User",
                "fields": [
                    {"name": "id", "type": {"scalar": "id"}},
                    {"name": "first_name", "type": {"scalar": "string"}},
                    {"name": "last_name", "type": {"scalar": "string"}, "nullable": true},
                    {"name": "email", "type": {"scalar": "string"}},
                    {"name": "age", "type": {"scalar": "int"}, "nullable": true}
                ],
                "bound_source": {"view": "v_user", "primary_key": ["id"]},
                "federation": {"keys": [["id"]]}
            }],
            "queries": [
                {"name": "users", "return_type": "User", "returns_list": true},
                {"name": "user", "return_type": "User", "nullable": true}
            ],
            "mutations": [
                {"name": "createUser", "return_type": "User",
                 "operation": {"kind": "function", "name": "fn_create_user"}}
            ]
        }"#,
    )
    .expect("user fixture IR parses")
}

/// An `Order` schema declaring the `order_with_items` Arrow projection
/// (one orders batch, one items batch with an `order_id` foreign key).
#[must_use]
pub fn order_projection_ir() -> SchemaIr {
    SchemaIr::from_json(
        r#"{
            "types": [{
                "name": "Order",
                "fields": [
                    {"name": "id", "type": {"scalar": "id"}},
                    {"name": "customer_id", "type": {"scalar": "id"}},
                    {"name": "total", "type": {"scalar": "decimal"}},
                    {"name": "created_at", "type": {"scalar": "date_time"}}
                ],
                "bound_source": {"view": "v_order", "primary_key": ["id"]},
                "arrow_projections": [{
                    "name": "order_with_items",
                    "batches": [
                        {
                            "name": "orders",
                            "view": "va_order",
                            "columns": [
                                {"name": "id", "type": "utf8"},
                                {"name": "customer_id", "type": "utf8"},
                                {"name": "total", "type": {"decimal128": {"precision": 18, "scale": 2}}},
                                {"name": "created_at", "type": "timestamp_micros"}
                            ]
                        },
                        {
                            "name": "items",
                            "view": "va_order_item",
                            "columns": [
                                {"name": "id", "type": "utf8"},
                                {"name": "order_id", "type": "utf8", "foreign_key": "orders.id"},
                                {"name": "product", "type": "utf8"},
                                {"name": "quantity", "type": "int32"}
                            ]
                        }
                    ]
                }]
            }],
            "queries": [
                {"name": "orders", "return_type": "Order", "returns_list": true}
            ]
        }"#,
    )
    .expect("order fixture IR parses")
}

/// The user fixture compiled for postgres.
#[must_use]
pub fn compiled_user_schema() -> CompiledSchema {
    let manifest = CapabilityManifest::load("postgres").expect("postgres manifest loads");
    compiler::compile(&user_schema_ir(), &manifest, "postgres").expect("user fixture compiles")
}
