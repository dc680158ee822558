//! Compiled batch manifest → Arrow schema.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use fraiseql_core::ir::{ArrowTypeDef, MaskStrategy};
use fraiseql_core::schema::CompiledArrowBatch;

/// Arrow schema of one compiled batch.
///
/// A `null`-masked column is forced nullable regardless of its declaration;
/// every slot it emits is null.
#[must_use]
pub fn batch_schema(batch: &CompiledArrowBatch) -> Arc<Schema> {
    let fields: Vec<Field> = batch
        .columns
        .iter()
        .map(|col| {
            let nullable = col.nullable || col.mask == Some(MaskStrategy::Null);
            Field::new(&col.name, arrow_type(col.arrow_type), nullable)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

fn arrow_type(def: ArrowTypeDef) -> DataType {
    match def {
        ArrowTypeDef::Utf8 => DataType::Utf8,
        ArrowTypeDef::Int32 => DataType::Int32,
        ArrowTypeDef::Int64 => DataType::Int64,
        ArrowTypeDef::Float64 => DataType::Float64,
        ArrowTypeDef::Boolean => DataType::Boolean,
        ArrowTypeDef::Decimal128 { precision, scale } => DataType::Decimal128(precision, scale),
        ArrowTypeDef::TimestampMicros => {
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        },
        ArrowTypeDef::Date32 => DataType::Date32,
    }
}
