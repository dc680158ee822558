//! Compiled schema artifact.
//!
//! # Schema Freeze Invariant
//!
//! After compilation the schema is frozen: all data is owned, content-hashed,
//! and safe to share by reference across every worker task. Nothing mutates a
//! `CompiledSchema` after [`crate::compiler::compile`] returns.

mod compiled;
mod hash;

pub use compiled::{
    ArrowSchemaSet, Binder, CompiledArrowBatch, CompiledArrowProjection, CompiledField,
    CompiledOperator, CompiledSchema, CompiledType, FederatedType, FederationMetadata,
    KeysetColumn, ResolutionStrategy, SqlTemplate, TemplateKind, WhereFieldInput, WhereInputType,
};
pub use hash::compute_hash;
