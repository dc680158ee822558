//! # FraiseQL Arrow
//!
//! Arrow-plane serving: compiled projections become typed record batches
//! streamed as Arrow IPC.
//!
//! A projection is a set of declared, shallow batches (at most two
//! relationship hops, enforced at compile time). At request time each
//! batch's pre-rendered SELECT returns one JSON object per row; this crate
//! converts those rows into an Arrow `RecordBatch` per declared batch and
//! encodes them in declaration order. Foreign-key columns guarantee
//! semantic joinability only; nothing is enforced referentially.
//!
//! Because sibling batches have different schemas, a multi-batch response
//! is a concatenation of EOS-terminated IPC stream segments, one per
//! declared batch, in declaration order.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

mod batch;
mod error;
mod ipc;
mod plane;
mod schema_gen;

pub use batch::rows_to_record_batch;
pub use error::ArrowPlaneError;
pub use ipc::{encode_file, encode_stream};
pub use plane::ArrowPlaneExecutor;
pub use schema_gen::batch_schema;
