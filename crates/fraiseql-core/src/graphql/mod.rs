//! GraphQL operation parsing.
//!
//! Thin wrapper over the `graphql-parser` crate that lowers its AST into a
//! Rust-native, owned representation the executor binds against:
//!
//! ```text
//! Incoming GraphQL Query
//!         │
//!         ▼
//!   ┌─────────────┐
//!   │   Parser    │  ← graphql-parser crate
//!   └──────┬──────┘
//!          │ ParsedDocument (fragments expanded)
//!          ▼
//!   ┌─────────────┐
//!   │  Executor   │  ← template binding
//!   └─────────────┘
//! ```
//!
//! Fragment spreads are expanded during lowering (with cycle detection);
//! variables are preserved as `{"__variable": name}` markers and resolved
//! at argument-access time.

mod parser;
mod types;

pub use parser::parse_query;
pub use types::{
    resolve_value, FieldSelection, OperationType, ParsedDocument, ParsedOperation, SelectionNode,
};
