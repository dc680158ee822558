//! Content hashing for compiled schemas.
//!
//! The hash is sha256 over the canonical serialization of the artifact with
//! its `schema_hash` field emptied. The compiler sorts every collection
//! before hashing, so the hash is stable under any reordering of the input
//! IR. Struct field order is fixed by the type definitions.

use sha2::{Digest, Sha256};

use super::CompiledSchema;

/// Compute the content hash of a compiled schema.
///
/// The `schema_hash` field itself is excluded: hashing a schema whose hash
/// field is already set yields the same digest as hashing it empty.
#[must_use]
pub fn compute_hash(schema: &CompiledSchema) -> String {
    let mut unhashed = schema.clone();
    unhashed.schema_hash = String::new();

    // Canonical form: compact JSON with struct-declaration field order.
    let canonical = serde_json::to_vec(&unhashed)
        .expect("compiled schema serialization is infallible for owned data");

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}
