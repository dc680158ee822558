//! Query hashing.

use sha2::{Digest, Sha256};

/// Hex sha256 of a query string, the APQ cache key.
#[must_use]
pub fn sha256_hex(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}
