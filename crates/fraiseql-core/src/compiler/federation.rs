//! Phase 4: federation metadata derivation.
//!
//! The per-type resolution strategy is fixed here, at compile time. Local
//! and peer-database strategies get their `_entities` batch SQL pre-rendered
//! so the runtime resolver never assembles SQL.

use fraiseql_error::{CompileError, Result};

use crate::ir::{SchemaIr, StrategyDef};
use crate::schema::{FederatedType, FederationMetadata, ResolutionStrategy};
use crate::sql::Dialect;

/// Derive federation metadata for every type declaring federation
/// directives. Types without a federation block do not participate in
/// `_entities` resolution.
pub fn derive_metadata(ir: &SchemaIr, dialect: &dyn Dialect) -> Result<FederationMetadata> {
    let mut types = Vec::new();

    for type_def in &ir.types {
        let Some(federation) = &type_def.federation else {
            continue;
        };
        if federation.keys.is_empty() {
            // No @key means the type is not an entity.
            continue;
        }

        let strategy = match (&federation.strategy, &type_def.bound_source) {
            (Some(StrategyDef::Local) | None, Some(source)) => ResolutionStrategy::Local {
                view: source.view.clone(),
            },
            (Some(StrategyDef::PeerDatabase { connection }), source) => {
                let Some(source) = source else {
                    return Err(CompileError::InvalidFederation {
                        type_name: type_def.name.clone(),
                        message:   "peer_database strategy requires a view binding".to_string(),
                    }
                    .into());
                };
                ResolutionStrategy::PeerDatabase {
                    connection: connection.clone(),
                    view:       source.view.clone(),
                }
            },
            (Some(StrategyDef::HttpSubgraph { url }), _) => ResolutionStrategy::HttpSubgraph {
                url: url.clone(),
            },
            (Some(StrategyDef::Local) | None, None) => {
                return Err(CompileError::ViewBindingMissing {
                    type_name: type_def.name.clone(),
                }
                .into());
            },
        };

        // Pre-render the ordered batch template for strategies that execute
        // SQL. The primary @key set drives the join.
        let entities_sql = match &strategy {
            ResolutionStrategy::Local { view } | ResolutionStrategy::PeerDatabase { view, .. } => {
                let jsonb_column = type_def
                    .bound_source
                    .as_ref()
                    .map_or("data", |s| s.jsonb_column.as_str());
                let key_columns = federation.keys[0].clone();
                Some(dialect.entities_batch_sql(view, jsonb_column, &key_columns))
            },
            ResolutionStrategy::HttpSubgraph { .. } => None,
        };

        types.push(FederatedType {
            name: type_def.name.clone(),
            keys: federation.keys.clone(),
            strategy,
            extends: federation.extends,
            external_fields: federation.external_fields.clone(),
            shareable_fields: federation.shareable_fields.clone(),
            requires: federation.requires.clone(),
            provides: federation.provides.clone(),
            entities_sql,
        });
    }

    Ok(FederationMetadata {
        enabled: !types.is_empty(),
        types,
    })
}
