//! Compiled query executor.
//!
//! Binds a parsed operation against the compiled templates and streams the
//! database's JSON rows straight into the response builder. Per-field
//! failures degrade to `null` data plus an error entry (partial success);
//! protocol-level failures abort the request before any body is produced.

use std::sync::Arc;

use fraiseql_error::graphql::GraphQLError;
use fraiseql_error::{
    AuthorizationError, ExecutionError, FraiseQLError, ProtocolError, Result, SanitizationLevel,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::Instrument;

use crate::apq::{sha256_hex, ApqCache};
use crate::config::{FraiseQLConfig, PaginationConfig};
use crate::db::{DatabaseAdapter, RowBytes};
use crate::federation::EntityResolver;
use crate::graphql::{parse_query, FieldSelection, OperationType, ParsedDocument};
use crate::response::{ResponseBytes, ResponseWriter};
use crate::runtime::{render_where, KeysetCursor, RequestContext};
use crate::schema::{Binder, CompiledSchema, KeysetColumn, SqlTemplate, TemplateKind};
use crate::sql::{dialect_for, Dialect};
use crate::utils::casing::{to_camel_case, to_snake_case};

/// `POST /graphql` request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    /// Query text; optional when a persisted hash is supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Operation to run in multi-operation documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    /// Variable values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,

    /// Protocol extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<RequestExtensions>,
}

/// `extensions` object of a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestExtensions {
    /// APQ extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_query: Option<PersistedQueryExtension>,
}

/// `extensions.persistedQuery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueryExtension {
    /// Protocol version (always 1).
    #[serde(default)]
    pub version: u32,

    /// Hex sha256 of the query text.
    pub sha256_hash: String,
}

impl GraphQLRequest {
    fn persisted_hash(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|e| e.persisted_query.as_ref())
            .map(|p| p.sha256_hash.as_str())
    }
}

/// Page metadata for a paginated list field.
struct PageInfo {
    end_cursor:    Option<String>,
    has_next_page: bool,
}

/// What a field fetch produced, before anything is written.
enum FieldData {
    List {
        rows:      Vec<RowBytes>,
        typename:  String,
        page_info: Option<PageInfo>,
    },
    Single {
        row:      Option<RowBytes>,
        typename: String,
    },
    Entities {
        entities: Vec<(Option<RowBytes>, String)>,
        errors:   Vec<GraphQLError>,
    },
    Value(Value),
}

/// The query executor. Shares the read-only compiled schema and manifest by
/// reference; one instance serves all tasks.
pub struct Executor {
    schema:       Arc<CompiledSchema>,
    adapter:      Arc<dyn DatabaseAdapter>,
    apq:          Arc<ApqCache>,
    resolver:     Option<Arc<EntityResolver>>,
    dialect:      &'static dyn Dialect,
    pagination:   PaginationConfig,
    sanitization: SanitizationLevel,
}

impl Executor {
    /// Build an executor for a compiled schema.
    pub fn new(
        schema: Arc<CompiledSchema>,
        adapter: Arc<dyn DatabaseAdapter>,
        apq: Arc<ApqCache>,
        resolver: Option<Arc<EntityResolver>>,
        config: &FraiseQLConfig,
    ) -> Result<Self> {
        let dialect = dialect_for(&schema.target)?;
        Ok(Self {
            schema,
            adapter,
            apq,
            resolver,
            dialect,
            pagination: config.pagination.clone(),
            sanitization: config.error_sanitization,
        })
    }

    /// Execute one request on the JSON plane.
    ///
    /// # Errors
    ///
    /// Returns an error only for whole-request failures (malformed query,
    /// unknown persisted hash, row decode on the write path). Field-level
    /// failures are reported inside the response body.
    pub async fn execute(
        &self,
        request: &GraphQLRequest,
        ctx: &RequestContext,
    ) -> Result<ResponseBytes> {
        let span = tracing::info_span!("graphql.execute", trace_id = %ctx.trace.trace_id);
        self.execute_inner(request, ctx).instrument(span).await
    }

    async fn execute_inner(
        &self,
        request: &GraphQLRequest,
        ctx: &RequestContext,
    ) -> Result<ResponseBytes> {
        let document = self.resolve_document(request)?;
        let operation = document.operation(request.operation_name.as_deref())?;

        if operation.operation_type == OperationType::Subscription {
            return Err(ProtocolError::MalformedQuery {
                message: "subscriptions are served on the delta plane".to_string(),
            }
            .into());
        }

        let empty = Map::new();
        let variables = request.variables.as_ref().unwrap_or(&empty);

        tracing::debug!(
            target: "fraiseql::executor",
            operation = operation.name.as_deref().unwrap_or("<anonymous>"),
            fields = operation.selections.len(),
            "executing operation"
        );

        let mut writer = ResponseWriter::with_capacity(1024);
        let mut page_infos: Vec<(String, PageInfo)> = Vec::new();

        for field in &operation.selections {
            let out_name = field.response_key().to_string();
            match self
                .fetch_field(operation.operation_type, field, variables, ctx)
                .await
            {
                Ok(FieldData::List {
                    rows,
                    typename,
                    page_info,
                }) => {
                    writer.write_list_field(&out_name, Some(&typename), rows)?;
                    if let Some(info) = page_info {
                        page_infos.push((out_name, info));
                    }
                },
                Ok(FieldData::Single { row, typename }) => {
                    writer.write_single_field(&out_name, Some(&typename), row)?;
                },
                Ok(FieldData::Entities { entities, errors }) => {
                    writer.write_entities_field(entities)?;
                    for error in errors {
                        writer.push_error(error);
                    }
                },
                Ok(FieldData::Value(value)) => {
                    writer.write_value_field(&out_name, &value);
                },
                Err(err) => {
                    // Partial success: null data at the field, error entry
                    // with the field's path.
                    tracing::warn!(
                        target: "fraiseql::executor",
                        field = %out_name,
                        error = %err,
                        "field execution failed"
                    );
                    writer.write_value_field(&out_name, &Value::Null);
                    writer.push_error(
                        GraphQLError::from_error(&err, self.sanitization)
                            .at_path(vec![out_name.as_str().into()]),
                    );
                },
            }
        }

        Ok(writer.finish(page_extensions(page_infos)))
    }

    /// Resolve the operation document through APQ.
    fn resolve_document(&self, request: &GraphQLRequest) -> Result<ParsedDocument> {
        match (&request.query, request.persisted_hash()) {
            (Some(query), Some(hash)) => {
                if sha256_hex(query) != hash {
                    return Err(ProtocolError::MalformedQuery {
                        message: "persistedQuery hash does not match query text".to_string(),
                    }
                    .into());
                }
                let document = parse_query(query)?;
                self.apq
                    .insert(hash.to_string(), query.clone(), document.clone());
                Ok(document)
            },
            (Some(query), None) => {
                // First sight: hash and cache opportunistically.
                let document = parse_query(query)?;
                self.apq
                    .insert(sha256_hex(query), query.clone(), document.clone());
                Ok(document)
            },
            (None, Some(hash)) => self.apq.get(hash),
            (None, None) => Err(ProtocolError::MalformedQuery {
                message: "request carries neither query nor persisted hash".to_string(),
            }
            .into()),
        }
    }

    async fn fetch_field(
        &self,
        operation_type: OperationType,
        field: &FieldSelection,
        variables: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> Result<FieldData> {
        if field.name == "__typename" {
            let typename = match operation_type {
                OperationType::Query => "Query",
                OperationType::Mutation => "Mutation",
                OperationType::Subscription => "Subscription",
            };
            return Ok(FieldData::Value(json!(typename)));
        }

        if field.name == "_entities" {
            return self.fetch_entities(field, variables, ctx).await;
        }

        let Some(template) = self.schema.find_template(&field.name) else {
            return Err(ProtocolError::MalformedQuery {
                message: format!("unknown operation field '{}'", field.name),
            }
            .into());
        };

        self.check_field_permissions(template, field, ctx)?;

        match &template.kind {
            TemplateKind::List => self.fetch_list(template, field, variables, ctx).await,
            TemplateKind::Single => self.fetch_single(template, field, variables, ctx).await,
            TemplateKind::Mutation { .. } => {
                if operation_type != OperationType::Mutation {
                    return Err(ProtocolError::MalformedQuery {
                        message: format!("'{}' must be called as a mutation", field.name),
                    }
                    .into());
                }
                self.fetch_mutation(template, field, variables, ctx).await
            },
            TemplateKind::EntityBatch => Err(ProtocolError::MalformedQuery {
                message: "entity batches are not directly queryable".to_string(),
            }
            .into()),
        }
    }

    /// Field-level permission descriptors: reject a selection touching a
    /// protected field when the context lacks the permission.
    fn check_field_permissions(
        &self,
        template: &SqlTemplate,
        field: &FieldSelection,
        ctx: &RequestContext,
    ) -> Result<()> {
        let Some(compiled_type) = self.schema.find_type(&template.type_name) else {
            return Ok(());
        };
        if compiled_type.field_permissions.is_empty() {
            return Ok(());
        }

        let selected = field.selected_field_names();
        for descriptor in &compiled_type.field_permissions {
            let exposed = to_camel_case(&descriptor.field);
            let requested = selected
                .iter()
                .any(|name| *name == exposed || *name == descriptor.field);
            if requested && !ctx.has_permission(&descriptor.permission) {
                return Err(AuthorizationError::PermissionDenied {
                    field: Some(exposed),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Supply the fixed binder values for a template, in binder order.
    fn fixed_params(
        &self,
        template: &SqlTemplate,
        field: &FieldSelection,
        variables: &Map<String, Value>,
        ctx: &RequestContext,
        input: Option<&Map<String, Value>>,
    ) -> Result<Vec<Value>> {
        let mut params = Vec::with_capacity(template.binders.len());
        for binder in &template.binders {
            let value = match binder {
                Binder::Context { key } => {
                    ctx.claim(key).cloned().ok_or_else(|| -> FraiseQLError {
                        // A missing auth binder means the row filter cannot
                        // apply; refusing is the only safe answer.
                        AuthorizationError::PermissionDenied { field: None }.into()
                    })?
                },
                Binder::Argument { name } => {
                    field.argument(name, variables)?.ok_or_else(|| -> FraiseQLError {
                        ProtocolError::MalformedQuery {
                            message: format!("missing required argument '{name}'"),
                        }
                        .into()
                    })?
                },
                Binder::InputObject => {
                    let input = input.ok_or_else(missing_input)?;
                    Value::Object(input.clone())
                },
                Binder::InputColumn { column } => {
                    let input = input.ok_or_else(missing_input)?;
                    input.get(column).cloned().unwrap_or(Value::Null)
                },
                Binder::Representations => {
                    return Err(FraiseQLError::internal(
                        "representations binder outside entity batch",
                    ))
                },
            };
            params.push(value);
        }
        Ok(params)
    }

    async fn fetch_list(
        &self,
        template: &SqlTemplate,
        field: &FieldSelection,
        variables: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> Result<FieldData> {
        let mut params = self.fixed_params(template, field, variables, ctx, None)?;
        let mut next_param = template.binders.len();

        // {where}
        let filter = field.argument("where", variables)?;
        let where_sql = if let Some(filter) = &filter {
            let Some(where_input) = self.schema.where_input(&template.type_name) else {
                return Err(ProtocolError::MalformedQuery {
                    message: format!("type '{}' is not filterable", template.type_name),
                }
                .into());
            };
            let (sql, mut where_params) =
                render_where(where_input, self.dialect, Some(filter), &mut next_param)?;
            params.append(&mut where_params);
            sql
        } else {
            "TRUE".to_string()
        };

        // {keyset}
        let after = field.argument("after", variables)?;
        let keyset_sql = if let Some(after) = &after {
            let Some(cursor) = after.as_str() else {
                return Err(ProtocolError::MalformedQuery {
                    message: "'after' must be a cursor string".to_string(),
                }
                .into());
            };
            let cursor = KeysetCursor::decode(cursor)?;
            if cursor.values.len() != template.keyset.len() {
                return Err(ProtocolError::MalformedQuery {
                    message: "cursor does not match this query's keyset".to_string(),
                }
                .into());
            }
            keyset_predicate(&template.keyset, &cursor, self.dialect, &mut next_param, &mut params)
        } else {
            "TRUE".to_string()
        };

        // {limit}: fetch one extra row to learn whether a next page exists.
        let first = match field.argument("first", variables)? {
            None => self.pagination.default_page_size,
            Some(value) => {
                let Some(first) = value.as_u64() else {
                    return Err(ProtocolError::MalformedQuery {
                        message: "'first' must be a positive integer".to_string(),
                    }
                    .into());
                };
                usize::try_from(first)
                    .unwrap_or(usize::MAX)
                    .clamp(1, self.pagination.max_page_size)
            },
        };
        next_param += 1;
        let limit_placeholder = self.dialect.placeholder(next_param);
        params.push(json!(first + 1));

        // {offset}: tolerated below the warn threshold, rejected above it.
        let offset_sql = match field.argument("offset", variables)? {
            None => String::new(),
            Some(value) => {
                if after.is_some() {
                    return Err(ProtocolError::MalformedQuery {
                        message: "'offset' cannot be combined with 'after'".to_string(),
                    }
                    .into());
                }
                let Some(offset) = value.as_u64() else {
                    return Err(ProtocolError::MalformedQuery {
                        message: "'offset' must be a non-negative integer".to_string(),
                    }
                    .into());
                };
                if offset > self.pagination.offset_warn_threshold {
                    return Err(ProtocolError::MalformedQuery {
                        message: format!(
                            "offset {offset} exceeds the threshold {}; use keyset cursors",
                            self.pagination.offset_warn_threshold
                        ),
                    }
                    .into());
                }
                tracing::warn!(
                    target: "fraiseql::executor",
                    offset,
                    "OFFSET pagination in use; keyset cursors are canonical"
                );
                next_param += 1;
                let placeholder = self.dialect.placeholder(next_param);
                params.push(json!(offset));
                format!(" OFFSET {placeholder}")
            },
        };

        let sql = template
            .sql
            .replace("{where}", &where_sql)
            .replace("{keyset}", &keyset_sql)
            .replace("{limit}", &limit_placeholder)
            .replace("{offset}", &offset_sql);

        let mut rows = self.query_with_deadline(&sql, &params, ctx).await?;
        let has_next_page = rows.len() > first;
        rows.truncate(first);

        // Cursor emission: keyset tuple of the last row, when the caller
        // paginates explicitly.
        let paginating = after.is_some() || field.argument("first", variables)?.is_some();
        let page_info = if paginating {
            let end_cursor = rows.last().and_then(|row| {
                let parsed: Value = serde_json::from_str(std::str::from_utf8(row.as_bytes()).ok()?).ok()?;
                let fields: Vec<String> =
                    template.keyset.iter().map(|k| k.field.clone()).collect();
                KeysetCursor::from_row(&parsed, &fields).map(|c| c.encode())
            });
            Some(PageInfo {
                end_cursor,
                has_next_page,
            })
        } else {
            None
        };

        Ok(FieldData::List {
            rows,
            typename: template.type_name.clone(),
            page_info,
        })
    }

    async fn fetch_single(
        &self,
        template: &SqlTemplate,
        field: &FieldSelection,
        variables: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> Result<FieldData> {
        let params = self.fixed_params(template, field, variables, ctx, None)?;
        let rows = self.query_with_deadline(&template.sql, &params, ctx).await?;
        Ok(FieldData::Single {
            row:      rows.into_iter().next(),
            typename: template.type_name.clone(),
        })
    }

    async fn fetch_mutation(
        &self,
        template: &SqlTemplate,
        field: &FieldSelection,
        variables: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> Result<FieldData> {
        let input_value = field.argument("input", variables)?;
        let input = match &input_value {
            Some(Value::Object(map)) => Some(snake_case_input(map)),
            Some(_) => {
                return Err(ProtocolError::MalformedQuery {
                    message: "'input' must be an object".to_string(),
                }
                .into())
            },
            None => None,
        };

        let params = self.fixed_params(template, field, variables, ctx, input.as_ref())?;

        match &template.followup_sql {
            None if template.sql.trim_start().to_uppercase().starts_with("SELECT") => {
                // Function mutation: the call itself returns the row.
                let rows = self.query_with_deadline(&template.sql, &params, ctx).await?;
                Ok(FieldData::Single {
                    row:      rows.into_iter().next().filter(|r| !r.is_null()),
                    typename: template.type_name.clone(),
                })
            },
            None => {
                // Statement with nothing to re-select (soft delete).
                self.adapter.execute(&template.sql, &params, &ctx.cancel).await?;
                Ok(FieldData::Single {
                    row:      None,
                    typename: template.type_name.clone(),
                })
            },
            Some(followup) => {
                self.adapter.execute(&template.sql, &params, &ctx.cancel).await?;

                // Re-select the mutated row by primary key from the input.
                let compiled_type = self.schema.find_type(&template.type_name);
                let key_params: Vec<Value> = compiled_type
                    .map(|t| {
                        t.primary_key
                            .iter()
                            .map(|col| {
                                input
                                    .as_ref()
                                    .and_then(|i| i.get(col))
                                    .cloned()
                                    .unwrap_or(Value::Null)
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let rows = self.query_with_deadline(followup, &key_params, ctx).await?;
                Ok(FieldData::Single {
                    row:      rows.into_iter().next(),
                    typename: template.type_name.clone(),
                })
            },
        }
    }

    async fn fetch_entities(
        &self,
        field: &FieldSelection,
        variables: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> Result<FieldData> {
        let Some(resolver) = &self.resolver else {
            return Err(ProtocolError::MalformedQuery {
                message: "federation is not enabled for this schema".to_string(),
            }
            .into());
        };
        let representations = field
            .argument("representations", variables)?
            .and_then(|v| v.as_array().cloned())
            .ok_or_else(|| -> FraiseQLError {
                ProtocolError::MalformedQuery {
                    message: "_entities requires a 'representations' list".to_string(),
                }
                .into()
            })?;

        let selection = field.selection_text(variables);
        let resolved = resolver.resolve(&representations, &selection, ctx).await;
        Ok(FieldData::Entities {
            entities: resolved.entities,
            errors:   resolved.errors,
        })
    }

    async fn query_with_deadline(
        &self,
        sql: &str,
        params: &[Value],
        ctx: &RequestContext,
    ) -> Result<Vec<RowBytes>> {
        tracing::debug!(target: "fraiseql::executor", sql, "executing template");
        let query = self.adapter.query_json_rows(sql, params, &ctx.cancel);
        match ctx.remaining() {
            None => query.await,
            Some(remaining) => match tokio::time::timeout(remaining, query).await {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::timeout(
                    "request",
                    u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                )
                .into()),
            },
        }
    }
}

fn missing_input() -> FraiseQLError {
    ProtocolError::MalformedQuery {
        message: "missing required argument 'input'".to_string(),
    }
    .into()
}

/// Mutation inputs arrive with camelCase GraphQL keys; columns and
/// stored-procedure payloads speak `snake_case`. Re-case the top-level keys
/// on the way in — the response builder re-cases on the way out. Nested
/// values are payload data and pass through untouched.
fn snake_case_input(input: &Map<String, Value>) -> Map<String, Value> {
    input
        .iter()
        .map(|(key, value)| (to_snake_case(key), value.clone()))
        .collect()
}

/// Lexicographic keyset predicate: strictly after the cursor row in the
/// template's ORDER BY.
fn keyset_predicate(
    keyset: &[KeysetColumn],
    cursor: &KeysetCursor,
    dialect: &dyn Dialect,
    next_param: &mut usize,
    params: &mut Vec<Value>,
) -> String {
    build_keyset_level(keyset, &cursor.values, 0, dialect, next_param, params)
}

fn build_keyset_level(
    keyset: &[KeysetColumn],
    values: &[Value],
    level: usize,
    dialect: &dyn Dialect,
    next_param: &mut usize,
    params: &mut Vec<Value>,
) -> String {
    let column = &keyset[level];
    let comparator = if column.descending { "<" } else { ">" };

    *next_param += 1;
    let strict_placeholder = dialect.placeholder(*next_param);
    params.push(values[level].clone());
    let strict = format!("{} {comparator} {strict_placeholder}", column.column_expr);

    if level + 1 == keyset.len() {
        return format!("({strict})");
    }

    *next_param += 1;
    let equal_placeholder = dialect.placeholder(*next_param);
    params.push(values[level].clone());
    let rest = build_keyset_level(keyset, values, level + 1, dialect, next_param, params);
    format!(
        "({strict} OR ({} = {equal_placeholder} AND {rest}))",
        column.column_expr
    )
}

/// Fold page metadata into the `extensions` object.
fn page_extensions(page_infos: Vec<(String, PageInfo)>) -> Option<Value> {
    if page_infos.is_empty() {
        return None;
    }
    let to_value = |info: &PageInfo| {
        json!({
            "endCursor": info.end_cursor,
            "hasNextPage": info.has_next_page,
        })
    };
    let value = if page_infos.len() == 1 {
        json!({ "pageInfo": to_value(&page_infos[0].1) })
    } else {
        let map: Map<String, Value> = page_infos
            .iter()
            .map(|(field, info)| (field.clone(), to_value(info)))
            .collect();
        json!({ "pageInfo": map })
    };
    Some(value)
}
