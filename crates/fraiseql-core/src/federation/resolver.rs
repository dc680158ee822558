//! `_entities` resolution with order preservation and partial success.

use std::collections::HashMap;
use std::sync::Arc;

use fraiseql_error::graphql::GraphQLError;
use fraiseql_error::{FederationError, FraiseQLError, SanitizationLevel};
use serde_json::Value;

use super::representation::EntityRepresentation;
use super::{HttpSubgraphClient, SubgraphClientConfig};
use crate::db::{DatabaseAdapter, RowBytes};
use crate::runtime::RequestContext;
use crate::schema::{CompiledSchema, FederatedType, ResolutionStrategy};

/// Resolution output: one slot per representation, in input order, plus the
/// field-level errors accumulated along the way.
pub struct ResolvedEntities {
    /// `(row, typename)` per position; `None` rows render as `null`.
    pub entities: Vec<(Option<RowBytes>, String)>,

    /// Errors with paths of the form `["_entities", index]`.
    pub errors: Vec<GraphQLError>,
}

/// Entity resolver dispatching on compile-time strategies.
pub struct EntityResolver {
    schema:       Arc<CompiledSchema>,
    local:        Arc<dyn DatabaseAdapter>,
    peers:        HashMap<String, Arc<dyn DatabaseAdapter>>,
    http:         HttpSubgraphClient,
    sanitization: SanitizationLevel,
}

impl EntityResolver {
    /// Build a resolver over the local adapter and configured peers.
    #[must_use]
    pub fn new(
        schema: Arc<CompiledSchema>,
        local: Arc<dyn DatabaseAdapter>,
        peers: HashMap<String, Arc<dyn DatabaseAdapter>>,
        http_config: SubgraphClientConfig,
        sanitization: SanitizationLevel,
    ) -> Self {
        Self {
            schema,
            local,
            peers,
            http: HttpSubgraphClient::new(http_config),
            sanitization,
        }
    }

    /// Resolve a `_entities(representations)` batch.
    ///
    /// Position `i` of the result corresponds to representation `i`; no
    /// reordering is observable. Failures surface as `null` at their
    /// position plus an error entry; other positions still succeed.
    pub async fn resolve(
        &self,
        representations: &[Value],
        selection: &str,
        ctx: &RequestContext,
    ) -> ResolvedEntities {
        let mut entities: Vec<(Option<RowBytes>, String)> =
            vec![(None, String::new()); representations.len()];
        let mut errors = Vec::new();

        // Parse and group by typename, keeping original indices.
        let mut groups: HashMap<String, Vec<(usize, EntityRepresentation)>> = HashMap::new();
        for (index, raw) in representations.iter().enumerate() {
            match EntityRepresentation::from_any(raw) {
                Ok(rep) => {
                    entities[index].1 = rep.typename.clone();
                    groups.entry(rep.typename.clone()).or_default().push((index, rep));
                },
                Err(err) => {
                    errors.push(self.positional_error(&err, index));
                },
            }
        }

        for (typename, group) in groups {
            self.resolve_group(&typename, group, selection, ctx, &mut entities, &mut errors)
                .await;
        }

        ResolvedEntities { entities, errors }
    }

    async fn resolve_group(
        &self,
        typename: &str,
        group: Vec<(usize, EntityRepresentation)>,
        selection: &str,
        ctx: &RequestContext,
        entities: &mut [(Option<RowBytes>, String)],
        errors: &mut Vec<GraphQLError>,
    ) {
        let Some(fed_type) = self.schema.federated_type(typename) else {
            let err: FraiseQLError = FederationError::EntityNotResolvable {
                type_name: typename.to_string(),
            }
            .into();
            for (index, _) in &group {
                errors.push(self.positional_error(&err, *index));
            }
            return;
        };

        // @requires enforcement: representations missing a declared
        // dependency fail their position and drop out of the batch.
        let mut ready: Vec<(usize, EntityRepresentation)> = Vec::with_capacity(group.len());
        'reps: for (index, rep) in group {
            for requires in &fed_type.requires {
                for dependency in &requires.dependencies {
                    if !rep.has_field(dependency) {
                        let err: FraiseQLError = FederationError::RequiresDependencyMissing {
                            type_name: typename.to_string(),
                            field:     dependency.clone(),
                        }
                        .into();
                        errors.push(self.positional_error(&err, index));
                        continue 'reps;
                    }
                }
            }
            ready.push((index, rep));
        }
        if ready.is_empty() {
            return;
        }

        match &fed_type.strategy {
            ResolutionStrategy::Local { .. } => {
                self.resolve_sql(&*self.local, fed_type, &ready, ctx, entities, errors)
                    .await;
            },
            ResolutionStrategy::PeerDatabase { connection, .. } => {
                let Some(peer) = self.peers.get(connection) else {
                    let err: FraiseQLError = FederationError::SubgraphUnreachable {
                        subgraph: connection.clone(),
                        attempts: 0,
                        cause:    "no peer connection configured".to_string(),
                    }
                    .into();
                    for (index, _) in &ready {
                        errors.push(self.positional_error(&err, *index));
                    }
                    return;
                };
                self.resolve_sql(&**peer, fed_type, &ready, ctx, entities, errors)
                    .await;
            },
            ResolutionStrategy::HttpSubgraph { url } => {
                self.resolve_http(url, fed_type, ready, selection, ctx, entities, errors)
                    .await;
            },
        }
    }

    /// Local / peer resolution through the pre-rendered ordered batch
    /// template: one row per representation, in batch order.
    async fn resolve_sql(
        &self,
        adapter: &dyn DatabaseAdapter,
        fed_type: &FederatedType,
        ready: &[(usize, EntityRepresentation)],
        ctx: &RequestContext,
        entities: &mut [(Option<RowBytes>, String)],
        errors: &mut Vec<GraphQLError>,
    ) {
        let Some(sql) = fed_type.entities_sql.as_deref() else {
            let err: FraiseQLError = FederationError::EntityNotResolvable {
                type_name: fed_type.name.clone(),
            }
            .into();
            for (index, _) in ready {
                errors.push(self.positional_error(&err, *index));
            }
            return;
        };

        let batch = Value::Array(ready.iter().map(|(_, rep)| rep.to_value()).collect());
        match adapter.query_json_rows(sql, &[batch], &ctx.cancel).await {
            Ok(rows) if rows.len() == ready.len() => {
                for ((index, _), row) in ready.iter().zip(rows) {
                    if row.is_null() {
                        let err: FraiseQLError = FederationError::EntityNotResolvable {
                            type_name: fed_type.name.clone(),
                        }
                        .into();
                        errors.push(self.positional_error(&err, *index));
                    } else {
                        entities[*index].0 = Some(row);
                    }
                }
            },
            Ok(rows) => {
                let err: FraiseQLError = FraiseQLError::internal(format!(
                    "entity batch returned {} rows for {} representations",
                    rows.len(),
                    ready.len()
                ));
                for (index, _) in ready {
                    errors.push(self.positional_error(&err, *index));
                }
            },
            Err(err) => {
                for (index, _) in ready {
                    errors.push(self.positional_error(&err, *index));
                }
            },
        }
    }

    /// Remote resolution. `@provides` short-circuits the fetch when the
    /// representation already carries everything this subgraph declares it
    /// can produce.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_http(
        &self,
        url: &str,
        fed_type: &FederatedType,
        ready: Vec<(usize, EntityRepresentation)>,
        selection: &str,
        ctx: &RequestContext,
        entities: &mut [(Option<RowBytes>, String)],
        errors: &mut Vec<GraphQLError>,
    ) {
        let mut fetch: Vec<(usize, EntityRepresentation)> = Vec::with_capacity(ready.len());
        for (index, rep) in ready {
            let provided: Vec<&String> =
                fed_type.provides.iter().flat_map(|p| p.provided.iter()).collect();
            if !provided.is_empty() && provided.iter().all(|f| rep.has_field(f)) {
                // Everything requested of the subgraph is already in hand.
                let row = RowBytes::new(rep.to_value().to_string());
                entities[index].0 = Some(row);
            } else {
                fetch.push((index, rep));
            }
        }
        if fetch.is_empty() {
            return;
        }

        let batch: Vec<Value> = fetch.iter().map(|(_, rep)| rep.to_value()).collect();
        match self
            .http
            .resolve_entities(url, &batch, selection, &ctx.trace, &ctx.cancel)
            .await
        {
            Ok(resolved) => {
                for ((index, _), entity) in fetch.iter().zip(resolved) {
                    match entity {
                        Some(value) => entities[*index].0 = Some(RowBytes::new(value.to_string())),
                        None => {
                            let err: FraiseQLError = FederationError::EntityNotResolvable {
                                type_name: fed_type.name.clone(),
                            }
                            .into();
                            errors.push(self.positional_error(&err, *index));
                        },
                    }
                }
            },
            Err(err) => {
                for (index, _) in &fetch {
                    errors.push(self.positional_error(&err, *index));
                }
            },
        }
    }

    fn positional_error(&self, err: &FraiseQLError, index: usize) -> GraphQLError {
        GraphQLError::from_error(err, self.sanitization)
            .at_path(vec!["_entities".into(), index.into()])
    }
}
