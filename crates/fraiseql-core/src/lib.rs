//! # FraiseQL Core
//!
//! Core engine for FraiseQL - a compiled GraphQL execution engine.
//!
//! ## Architecture
//!
//! FraiseQL compiles a schema IR document against a per-database capability
//! manifest into a deterministic [`schema::CompiledSchema`], then executes
//! GraphQL operations by binding pre-compiled SQL templates and concatenating
//! the JSON text rows the database returns directly into response bytes.
//!
//! ### Key Components
//!
//! - **Capability**: per-target declaration of supported filter operators
//! - **IR**: the schema document authoring layers emit
//! - **Compiler**: IR + manifest + target → `CompiledSchema` (content-hashed)
//! - **SQL**: dialect renderers (identifier quoting, placeholders, templates)
//! - **Response**: single-pass JSON response builder (the hot path)
//! - **Runtime**: query executor, plane selection, keyset cursors
//! - **Federation**: `_entities` resolution across local/peer/HTTP strategies
//! - **APQ**: automatic persisted queries
//! - **Delta**: CDC event-stream projection
//!
//! ## Compilation Flow
//!
//! ```text
//! Schema IR (JSON)
//!       ↓
//!   Compiler ── CapabilityManifest(target)
//!  ↙    ↓    ↘
//! Validate  Resolve operators  Generate SQL
//!       ↓
//! CompiledSchema (sha256-addressed)
//!       ↓
//!    Executor
//!  ↙    ↓    ↘
//! Bind  Execute  Concatenate rows
//!       ↓
//!  ResponseBytes
//! ```

#![forbid(unsafe_code)]
// Missing docs allowed for internal items - public API is fully documented
#![allow(missing_docs)]

// Core modules
pub mod capability;
pub mod config;
pub mod ir;
pub mod schema;

// Compilation layer
pub mod compiler;
pub mod sql;

// GraphQL parsing
pub mod graphql;

// Execution layer
pub mod response;
pub mod runtime;

// Infrastructure
pub mod apq;
pub mod audit;
pub mod db;
pub mod delta;
pub mod federation;
pub mod observability;
pub mod utils;

// Re-exports for convenience
pub use config::FraiseQLConfig;
pub use fraiseql_error::{FraiseQLError, Result};
pub use schema::CompiledSchema;

/// Version of the FraiseQL core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
