//! JSON rows → `RecordBatch`.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Decimal128Builder, Float64Builder, Int32Builder,
    Int64Builder, StringBuilder, TimestampMicrosecondBuilder,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate};
use fraiseql_core::ir::{ArrowColumnDef, ArrowTypeDef, MaskStrategy};
use fraiseql_core::schema::CompiledArrowBatch;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ArrowPlaneError;
use crate::schema_gen::batch_schema;

/// Marker written for redacted values.
const REDACTED: &str = "[REDACTED]";

/// Convert a batch's JSON rows into one `RecordBatch`, applying declared
/// masking per column.
pub fn rows_to_record_batch(
    batch: &CompiledArrowBatch,
    rows: &[Value],
) -> Result<RecordBatch, ArrowPlaneError> {
    let schema = batch_schema(batch);

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.columns.len());
    for column in &batch.columns {
        columns.push(build_column(column, rows)?);
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn build_column(column: &ArrowColumnDef, rows: &[Value]) -> Result<ArrayRef, ArrowPlaneError> {
    let values = rows.iter().enumerate().map(|(i, row)| (i, row.get(&column.name)));

    let mismatch = |row: usize, message: &str| ArrowPlaneError::ValueMismatch {
        row,
        column: column.name.clone(),
        message: message.to_string(),
    };

    // `Null` masking wins before any typed conversion.
    if column.mask == Some(MaskStrategy::Null) {
        return build_all_null(column, rows.len());
    }

    match column.arrow_type {
        ArrowTypeDef::Utf8 => {
            let mut builder = StringBuilder::new();
            for (i, value) in values {
                match value {
                    None | Some(Value::Null) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    Some(value) => {
                        let text = value
                            .as_str()
                            .map_or_else(|| value.to_string(), ToString::to_string);
                        builder.append_value(mask_text(&text, column.mask));
                    },
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::Int32 => {
            let mut builder = Int32Builder::new();
            for (i, value) in values {
                match value.and_then(Value::as_i64) {
                    None if is_missing(value) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    None => return Err(mismatch(i, "expected an integer")),
                    Some(n) => builder.append_value(
                        i32::try_from(n).map_err(|_| mismatch(i, "integer out of i32 range"))?,
                    ),
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::Int64 => {
            let mut builder = Int64Builder::new();
            for (i, value) in values {
                match value.and_then(Value::as_i64) {
                    None if is_missing(value) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    None => return Err(mismatch(i, "expected an integer")),
                    Some(n) => builder.append_value(n),
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::Float64 => {
            let mut builder = Float64Builder::new();
            for (i, value) in values {
                match value.and_then(Value::as_f64) {
                    None if is_missing(value) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    None => return Err(mismatch(i, "expected a number")),
                    Some(f) => builder.append_value(f),
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::Boolean => {
            let mut builder = BooleanBuilder::new();
            for (i, value) in values {
                match value.and_then(Value::as_bool) {
                    None if is_missing(value) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    None => return Err(mismatch(i, "expected a boolean")),
                    Some(b) => builder.append_value(b),
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::Decimal128 { precision, scale } => {
            let mut builder = Decimal128Builder::new().with_precision_and_scale(precision, scale)?;
            for (i, value) in values {
                match value {
                    None | Some(Value::Null) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    Some(value) => {
                        let text = value
                            .as_str()
                            .map_or_else(|| value.to_string(), ToString::to_string);
                        let scaled = parse_decimal(&text, scale)
                            .ok_or_else(|| mismatch(i, "expected a decimal value"))?;
                        builder.append_value(scaled);
                    },
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::TimestampMicros => {
            let mut builder = TimestampMicrosecondBuilder::new().with_timezone("UTC");
            for (i, value) in values {
                match value {
                    None | Some(Value::Null) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    Some(Value::Number(n)) => {
                        let micros = n
                            .as_i64()
                            .ok_or_else(|| mismatch(i, "epoch micros out of range"))?;
                        builder.append_value(micros);
                    },
                    Some(Value::String(s)) => {
                        let parsed = DateTime::parse_from_rfc3339(s)
                            .map_err(|_| mismatch(i, "expected an RFC 3339 timestamp"))?;
                        builder.append_value(parsed.timestamp_micros());
                    },
                    Some(_) => return Err(mismatch(i, "expected a timestamp")),
                }
            }
            Ok(Arc::new(builder.finish()))
        },
        ArrowTypeDef::Date32 => {
            let mut builder = Date32Builder::new();
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date is valid");
            for (i, value) in values {
                match value {
                    None | Some(Value::Null) => {
                        require_nullable(column, i)?;
                        builder.append_null();
                    },
                    Some(Value::String(s)) => {
                        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                            .map_err(|_| mismatch(i, "expected a YYYY-MM-DD date"))?;
                        let days = i32::try_from((date - epoch).num_days())
                            .map_err(|_| mismatch(i, "date out of range"))?;
                        builder.append_value(days);
                    },
                    Some(_) => return Err(mismatch(i, "expected a date string")),
                }
            }
            Ok(Arc::new(builder.finish()))
        },
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn require_nullable(column: &ArrowColumnDef, row: usize) -> Result<(), ArrowPlaneError> {
    if column.nullable {
        Ok(())
    } else {
        Err(ArrowPlaneError::ValueMismatch {
            row,
            column: column.name.clone(),
            message: "null in non-nullable column".to_string(),
        })
    }
}

fn mask_text(text: &str, mask: Option<MaskStrategy>) -> String {
    match mask {
        None | Some(MaskStrategy::Null) => text.to_string(),
        Some(MaskStrategy::Redact) => REDACTED.to_string(),
        Some(MaskStrategy::Hash) => {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hex::encode(hasher.finalize())
        },
    }
}

fn build_all_null(column: &ArrowColumnDef, len: usize) -> Result<ArrayRef, ArrowPlaneError> {
    // The declared type is kept; every slot is null.
    let rows: Vec<Value> = vec![Value::Null; len];
    let unmasked = ArrowColumnDef {
        mask: None,
        nullable: true,
        ..column.clone()
    };
    build_column(&unmasked, &rows)
}

/// Parse a decimal string into a scaled i128 (e.g. `"12.5"` at scale 2 →
/// `1250`). Truncates extra fractional digits.
fn parse_decimal(text: &str, scale: i8) -> Option<i128> {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1_i128, rest),
        None => (1_i128, text),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let scale = usize::try_from(scale.max(0)).ok()?;
    let mut scaled_fraction: String = fraction.chars().take(scale).collect();
    while scaled_fraction.len() < scale {
        scaled_fraction.push('0');
    }

    let combined = format!(
        "{}{}",
        if integer.is_empty() { "0" } else { integer },
        scaled_fraction
    );
    combined.parse::<i128>().ok().map(|v| sign * v)
}
