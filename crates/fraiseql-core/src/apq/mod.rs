//! Automatic persisted queries.
//!
//! A query string is cached under its sha256 and subsequently referenced by
//! hash alone. The cache is a process-wide sharded map with TTL eviction;
//! inserts are idempotent, and the whole cache clears when the schema hash
//! changes (a recompiled schema may bind the same query differently).

mod hasher;

pub use hasher::sha256_hex;

use std::time::{Duration, Instant};

use dashmap::DashMap;
use fraiseql_error::{ProtocolError, Result};
use crate::graphql::ParsedDocument;

/// One cached persisted query.
#[derive(Debug, Clone)]
struct ApqEntry {
    /// Original query text (kept for diagnostics and re-parsing needs).
    query:     String,
    /// Parsed operation document.
    ast:       ParsedDocument,
    /// Last hit, for TTL eviction.
    last_used: Instant,
}

/// Sharded APQ cache keyed by hex sha256 of the query text.
pub struct ApqCache {
    entries:     DashMap<String, ApqEntry>,
    ttl:         Duration,
    schema_hash: parking_lot::RwLock<String>,
}

impl ApqCache {
    /// Create a cache bound to a schema hash.
    #[must_use]
    pub fn new(ttl: Duration, schema_hash: impl Into<String>) -> Self {
        Self {
            entries:     DashMap::new(),
            ttl,
            schema_hash: parking_lot::RwLock::new(schema_hash.into()),
        }
    }

    /// Look up a persisted query by hash, refreshing its TTL.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownPersistedHash`] on a miss, which
    /// clients answer by retrying with the full query text.
    pub fn get(&self, hash: &str) -> Result<ParsedDocument> {
        match self.entries.get_mut(hash) {
            Some(mut entry) => {
                entry.last_used = Instant::now();
                tracing::debug!(target: "fraiseql::apq", hash, "apq hit");
                Ok(entry.ast.clone())
            },
            None => {
                tracing::debug!(target: "fraiseql::apq", hash, "apq miss");
                Err(ProtocolError::UnknownPersistedHash {
                    hash: hash.to_string(),
                }
                .into())
            },
        }
    }

    /// Insert a parsed query under its hash. Idempotent: re-inserting an
    /// existing hash only refreshes the TTL.
    pub fn insert(&self, hash: String, query: String, ast: ParsedDocument) {
        self.entries
            .entry(hash)
            .and_modify(|e| e.last_used = Instant::now())
            .or_insert_with(|| ApqEntry {
                query,
                ast,
                last_used: Instant::now(),
            });
    }

    /// Evict entries idle past the TTL. Returns the evicted count.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.last_used.elapsed() < ttl);
        before - self.entries.len()
    }

    /// Clear everything if the schema hash changed (compiled plans are no
    /// longer valid). Returns whether a clear happened.
    pub fn reset_for_schema(&self, schema_hash: &str) -> bool {
        let mut current = self.schema_hash.write();
        if *current == schema_hash {
            return false;
        }
        *current = schema_hash.to_string();
        self.entries.clear();
        tracing::info!(target: "fraiseql::apq", schema_hash, "apq cache cleared for new schema");
        true
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Original query text for a hash, if cached.
    #[must_use]
    pub fn query_text(&self, hash: &str) -> Option<String> {
        self.entries.get(hash).map(|e| e.query.clone())
    }
}
